// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{ffi::OsStr, io, path::{Path, PathBuf}, process::Command};

use thiserror::Error;

use crate::{OperatingSystem, Platform};

use super::CommandExt;

#[derive(Debug, Error)]
pub enum LinkerError {
    #[error("could not start `gcc`: {0}")]
    Spawn(#[from] io::Error),

    #[error("`gcc` failed:\n{0}")]
    Failed(String),
}

/// Something handed to the linker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkerPath {
    Object(PathBuf),

    /// A static library given by path, such as `vendor/libfoo.a`.
    StaticLibrary(PathBuf),

    /// A library looked up on the search paths, such as `m`.
    Library(String),
}

impl LinkerPath {
    /// Interprets the operand of a `link` declaration.
    #[must_use]
    pub fn from_link(value: &str) -> Self {
        let path = Path::new(value);

        match path.extension().and_then(OsStr::to_str) {
            Some("a" | "lib") => Self::StaticLibrary(path.to_path_buf()),
            _ => Self::Library(value.to_string()),
        }
    }
}

/// Links executables through the `gcc` driver, which brings in the C runtime
/// the generated code relies on.
pub struct GccLinker {
    platform: Platform,
    output_path: PathBuf,
    paths: Vec<LinkerPath>,
    search_paths: Vec<PathBuf>,
}

impl GccLinker {
    #[must_use]
    pub fn new(platform: Platform, output_path: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            output_path: output_path.into(),
            paths: Vec::new(),
            search_paths: Vec::new(),
        }
    }

    pub fn add_path(&mut self, path: LinkerPath) {
        self.paths.push(path);
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    #[must_use]
    pub fn command(&self) -> Command {
        let mut command = Command::new("gcc");

        if self.platform.operating_system() == OperatingSystem::Linux {
            command.arg("-no-pie");
        }

        for path in &self.paths {
            if let LinkerPath::Object(object_path) = path {
                command.arg(object_path);
            }
        }

        for path in &self.search_paths {
            command.args([OsStr::new("-L"), path.as_os_str()]);
        }

        // Libraries come after the objects referring to them.
        for path in &self.paths {
            match path {
                LinkerPath::Object(..) => (),

                LinkerPath::Library(name) => {
                    command.arg(format!("-l{name}"));
                }

                LinkerPath::StaticLibrary(lib_path) => {
                    let Some(name) = lib_path.file_stem().and_then(OsStr::to_str) else { continue };
                    let name = name.strip_prefix("lib").unwrap_or(name);

                    if let Some(parent) = lib_path.parent().filter(|x| !x.as_os_str().is_empty()) {
                        command.args([OsStr::new("-L"), parent.as_os_str()]);
                    }
                    command.arg(format!("-l{name}"));
                }
            }
        }

        if self.platform.is_windows() {
            command.arg("-lkernel32");
        }

        command.arg("-o");
        command.arg(&self.output_path);
        command
    }

    pub fn run(self) -> Result<(), LinkerError> {
        self.command().run_capturing_stderr()?.map_err(LinkerError::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn arguments(linker: &GccLinker) -> Vec<String> {
        linker.command().get_args().map(|x| x.to_string_lossy().into_owned()).collect()
    }

    #[rstest]
    #[case("m", LinkerPath::Library("m".into()))]
    #[case("vendor/libfoo.a", LinkerPath::StaticLibrary("vendor/libfoo.a".into()))]
    #[case("foo.lib", LinkerPath::StaticLibrary("foo.lib".into()))]
    fn link_operands(#[case] input: &str, #[case] expected: LinkerPath) {
        assert_eq!(LinkerPath::from_link(input), expected);
    }

    #[test]
    fn linux_arguments() {
        let mut linker = GccLinker::new(Platform::linux(), "out/app");
        linker.add_path(LinkerPath::Library("m".into()));
        linker.add_path(LinkerPath::Object("out/app.o".into()));
        linker.add_path(LinkerPath::StaticLibrary("vendor/libfoo.a".into()));
        linker.add_search_path("/opt/lib");

        assert_eq!(arguments(&linker), [
            "-no-pie", "out/app.o", "-L", "/opt/lib", "-lm", "-L", "vendor", "-lfoo", "-o", "out/app",
        ]);
    }

    #[test]
    fn windows_arguments() {
        let mut linker = GccLinker::new(Platform::windows(), "app.exe");
        linker.add_path(LinkerPath::Object("app.obj".into()));

        assert_eq!(arguments(&linker), ["app.obj", "-lkernel32", "-o", "app.exe"]);
    }
}
