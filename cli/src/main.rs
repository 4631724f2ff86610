// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

#![deny(elided_lifetimes_in_paths)]

mod error;
mod logger;

use std::{
    fs,
    path::{Path, PathBuf},
    process::exit,
};

use anyhow::{bail, Context};
use borzoi::SourceCode;
use borzoi_compiler::{compile, link_executable, run_executable, Compilation, CompileOptions, Platform};
use clap::Subcommand;
use colored::Colorize;
use log::debug;
use temp_dir::TempDir;

use self::{error::DiagnosticPrinter, logger::Logger};

/// Directories that are searched for libraries when they exist.
const DEFAULT_LIBRARY_SEARCH_PATHS: [&str; 4] = ["lib", "libs", "module", "modules"];

#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        use clap::Parser;
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a program into an executable.
    Build {
        #[command(flatten)]
        build: BuildArgs,
    },

    /// Build a program and run it.
    Run {
        #[command(flatten)]
        build: BuildArgs,

        /// Display the exit code after the program finished.
        #[arg(long)]
        exit_code: bool,
    },

    /// Display the version of the compiler.
    Version,
}

#[derive(clap::Args, Debug)]
struct BuildArgs {
    /// The file to compile.
    #[arg(default_value = "main.bz")]
    file: PathBuf,

    /// Executable output path.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Object file output path.
    #[arg(long)]
    output_obj: Option<PathBuf>,

    /// NASM file output path.
    #[arg(long)]
    output_nasm: Option<PathBuf>,

    /// Target platform: `win` or `linux`.
    #[arg(short, long)]
    platform: Option<Platform>,

    /// Folders to search for libraries.
    #[arg(long = "lib-search-path")]
    lib_search_paths: Vec<PathBuf>,

    /// Display compilation statistics.
    #[arg(short, long)]
    stats: bool,

    /// Display the tokens of the source file.
    #[arg(long)]
    display_lexer: bool,

    /// Display the parse tree of the source file.
    #[arg(long)]
    display_parser: bool,

    /// Keep the assembly and object files.
    #[arg(long)]
    keep_files: bool,
}

impl BuildArgs {
    /// The options for this build. Without an explicit output, the
    /// executable goes into `default_directory` when one is given.
    fn compile_options(&self, default_directory: Option<&Path>) -> CompileOptions {
        let platform = self.platform.clone().unwrap_or_else(Platform::host_platform);
        let mut options = CompileOptions::new(&self.file, platform);

        if let Some(output) = &self.output {
            options.output = output.clone();
        } else if let (Some(directory), Some(name)) = (default_directory, options.output.file_name()) {
            options.output = directory.join(name);
        }

        options.output_obj = self.output_obj.clone();
        options.output_nasm = self.output_nasm.clone();
        options.keep_files = self.keep_files;
        options.library_search_paths = self.lib_search_paths.clone();

        for path in DEFAULT_LIBRARY_SEARCH_PATHS {
            let path = PathBuf::from(path);
            if path.is_dir() && !options.library_search_paths.contains(&path) {
                options.library_search_paths.push(path);
            }
        }

        options
    }
}

fn main() {
    let args = Args::parse_args();
    Logger::initialize(args.verbose);

    let result = match args.command {
        Commands::Build { build } => build_command(&build).map(|_| 0),
        Commands::Run { build, exit_code } => run_command(&build, exit_code),
        Commands::Version => {
            println!("borzoi {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    };

    match result {
        Ok(code) => exit(code),
        Err(e) => {
            eprintln!("{}: {e:#}", "error".red().bold());
            exit(1);
        }
    }
}

fn build_command(args: &BuildArgs) -> anyhow::Result<PathBuf> {
    let options = args.compile_options(None);
    build(args, &options)
}

fn run_command(args: &BuildArgs, display_exit_code: bool) -> anyhow::Result<i32> {
    let directory = TempDir::new().context("could not create a build directory")?;
    let options = args.compile_options(Some(directory.path()));

    let executable = build(args, &options)?;
    let outcome = run_executable(&executable)?;

    if let Some(description) = &outcome.abnormal_exit {
        eprintln!("\n{}: program stopped abnormally: {description}", "error".red().bold());
    }

    let code = outcome.exit_code.unwrap_or(1);
    if display_exit_code {
        println!("\nProgram finished with exit code {code}");
    }

    Ok(code)
}

fn build(args: &BuildArgs, options: &CompileOptions) -> anyhow::Result<PathBuf> {
    if !args.file.exists() {
        bail!("file `{}` does not exist", args.file.display());
    }

    let contents = fs::read_to_string(&args.file)
        .with_context(|| format!("could not read `{}`", args.file.display()))?;
    let source_code = SourceCode::new(&args.file, contents);

    debug!("Compiling {} for {:?}", args.file.display(), options.platform);
    let mut compilation = compile(&source_code, &options.platform);
    display(args, &compilation);

    if !compilation.is_success() {
        for diagnostic in &compilation.diagnostics {
            DiagnosticPrinter::new(&source_code, diagnostic).print();
        }

        bail!("could not compile `{}` due to {} diagnostic(s)", args.file.display(), compilation.diagnostics.len());
    }

    let executable = link_executable(&mut compilation, options)?;
    println!("{}", "Build was successful!".green().bold());

    if args.stats {
        println!("{}", compilation.statistics);
    }

    Ok(executable)
}

fn display(args: &BuildArgs, compilation: &Compilation) {
    if args.display_lexer {
        for token in &compilation.tokens {
            println!("{token}");
        }
    }

    if args.display_parser {
        println!("{:#?}", compilation.tree);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn build_args(arguments: &[&str]) -> BuildArgs {
        let args = Args::try_parse_from(arguments).unwrap();
        match args.command {
            Commands::Build { build } | Commands::Run { build, .. } => build,
            Commands::Version => panic!("expected a build command"),
        }
    }

    #[test]
    fn file_defaults_to_main() {
        let build = build_args(&["borzoi", "build"]);
        assert_eq!(build.file, PathBuf::from("main.bz"));
        assert!(build.output.is_none());
    }

    #[rstest]
    #[case(&["borzoi", "build", "app.bz", "--platform", "win"], "app.exe")]
    #[case(&["borzoi", "build", "app.bz", "--platform", "linux"], "app")]
    #[case(&["borzoi", "build", "app.bz", "-o", "out/prog"], "out/prog")]
    fn output_path(#[case] arguments: &[&str], #[case] expected: &str) {
        let options = build_args(arguments).compile_options(None);
        assert_eq!(options.output, PathBuf::from(expected));
    }

    #[test]
    fn run_builds_into_the_given_directory() {
        let build = build_args(&["borzoi", "run", "dir/app.bz", "--platform", "linux", "--exit-code"]);
        let options = build.compile_options(Some(Path::new("/tmp/build")));

        assert_eq!(options.output, PathBuf::from("/tmp/build/app"));
        assert_eq!(options.nasm_path(), PathBuf::from("/tmp/build/app.S"));
    }

    #[test]
    fn search_paths_and_flags() {
        let build = build_args(&[
            "borzoi", "build", "app.bz",
            "--lib-search-path", "first",
            "--lib-search-path", "second",
            "--keep-files",
            "--output-nasm", "app.asm",
        ]);
        let options = build.compile_options(None);

        assert_eq!(options.library_search_paths[..2], [PathBuf::from("first"), PathBuf::from("second")]);
        assert!(options.keep_files);
        assert_eq!(options.nasm_path(), PathBuf::from("app.asm"));
    }

    #[test]
    fn unknown_platform_is_rejected() {
        assert!(Args::try_parse_from(["borzoi", "build", "--platform", "mac"]).is_err());
    }

    #[test]
    fn verbose_is_global() {
        let args = Args::try_parse_from(["borzoi", "run", "-v"]).unwrap();
        assert!(args.verbose);
    }
}
