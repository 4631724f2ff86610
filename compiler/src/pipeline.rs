// Copyright (C) 2024 - 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{
    fmt::Display,
    fs,
    io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
    time::{Duration, Instant},
};

use borzoi::{parse_source_code, ParseTree, SemanticAnalyzer, SourceCode, Token};
use log::{debug, info, warn};
use strum::AsRefStr;
use thiserror::Error;

use crate::{
    backend::{Assembly, CodeGenerator},
    os::{describe_abnormal_exit, AssemblerError, GccLinker, LinkerError, LinkerPath, NasmAssembler},
    Diagnostic,
    Platform,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("compilation stopped after {} diagnostic(s)", .0.len())]
    Diagnostics(Vec<Diagnostic>),

    #[error("could not read `{path}`: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("could not write `{path}`: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Assembler(#[from] AssemblerError),

    #[error(transparent)]
    Linker(#[from] LinkerError),

    #[error("could not start `{path}`: {source}")]
    Run { path: PathBuf, source: io::Error },
}

/// Where the build writes its files, and how it links.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub platform: Platform,
    pub output: PathBuf,
    pub output_obj: Option<PathBuf>,
    pub output_nasm: Option<PathBuf>,
    pub library_search_paths: Vec<PathBuf>,

    /// Keep the assembly and object files even when they were not asked for.
    pub keep_files: bool,
}

impl CompileOptions {
    /// Options building `source_path` into an executable next to it.
    #[must_use]
    pub fn new(source_path: &Path, platform: Platform) -> Self {
        let output = source_path.with_extension(platform.operating_system().executable_extension().trim_start_matches('.'));

        Self {
            platform,
            output,
            output_obj: None,
            output_nasm: None,
            library_search_paths: Vec::new(),
            keep_files: false,
        }
    }

    #[must_use]
    pub fn object_path(&self) -> PathBuf {
        match &self.output_obj {
            Some(path) => path.clone(),
            None => self.output.with_extension(self.platform.operating_system().object_extension()),
        }
    }

    #[must_use]
    pub fn nasm_path(&self) -> PathBuf {
        match &self.output_nasm {
            Some(path) => path.clone(),
            None => self.output.with_extension("S"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum Stage {
    Parsing,
    Analyzing,
    Generating,
    Assembling,
    Linking,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub stages: Vec<(Stage, Duration)>,
    pub tokens: usize,
    pub functions: usize,
    pub instructions: usize,
}

impl Statistics {
    #[must_use]
    pub fn total_time(&self) -> Duration {
        self.stages.iter().map(|(_, duration)| *duration).sum()
    }

    fn time<T>(&mut self, stage: Stage, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        let duration = start.elapsed();

        debug!("{} took {duration:?}", stage.as_ref());
        self.stages.push((stage, duration));
        result
    }
}

impl Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (stage, duration) in &self.stages {
            f.write_fmt(format_args!("{} time: {duration:?}\n", stage.as_ref()))?;
        }

        f.write_fmt(format_args!("Total time: {:?}\n", self.total_time()))?;
        f.write_fmt(format_args!("Tokens: {}\n", self.tokens))?;
        f.write_fmt(format_args!("Functions: {}\n", self.functions))?;
        f.write_fmt(format_args!("Instructions: {}", self.instructions))
    }
}

/// The result of running the compiler proper on one source file.
#[derive(Debug)]
pub struct Compilation {
    pub tokens: Vec<Token>,
    pub tree: ParseTree,
    pub diagnostics: Vec<Diagnostic>,

    /// Only generated when there are no diagnostics.
    pub assembly: Option<Assembly>,
    pub statistics: Statistics,
}

impl Compilation {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty() && self.assembly.is_some()
    }
}

/// Lexes, parses, analyzes and generates assembly for `source_code`. Any
/// diagnostic stops the pipeline before the next stage.
#[must_use]
pub fn compile(source_code: &SourceCode, platform: &Platform) -> Compilation {
    let mut statistics = Statistics::default();

    let output = statistics.time(Stage::Parsing, || parse_source_code(source_code));
    statistics.tokens = output.tokens.len();
    statistics.functions = output.tree.functions.len();

    let mut diagnostics: Vec<Diagnostic> = output.lexer_errors.iter().map(Diagnostic::from)
        .chain(output.parse_diagnostics.iter().map(Diagnostic::from))
        .collect();

    let mut compilation = Compilation {
        tokens: output.tokens,
        tree: output.tree,
        diagnostics: Vec::new(),
        assembly: None,
        statistics,
    };

    if !diagnostics.is_empty() {
        info!("Parsing `{}` gave {} diagnostic(s)", source_code.path().display(), diagnostics.len());
        compilation.diagnostics = diagnostics;
        return compilation;
    }

    let base_directory = source_code.path().parent().map(Path::to_path_buf).unwrap_or_default();
    let (model, semantic_diagnostics) = compilation.statistics.time(Stage::Analyzing, || {
        let mut analyzer = SemanticAnalyzer::new(base_directory);
        analyzer.analyze_tree(&mut compilation.tree);
        analyzer.into_parts()
    });

    diagnostics.extend(semantic_diagnostics.iter().map(Diagnostic::from));
    if !diagnostics.is_empty() {
        info!("Analyzing `{}` gave {} diagnostic(s)", source_code.path().display(), diagnostics.len());
        compilation.diagnostics = diagnostics;
        return compilation;
    }

    let assembly = compilation.statistics.time(Stage::Generating, || {
        CodeGenerator::generate(platform, &model, &mut compilation.tree)
    });

    compilation.statistics.instructions = assembly.instruction_count();
    compilation.assembly = Some(assembly);
    compilation
}

/// Reads and compiles the file at `path`, then assembles and links it.
pub fn build(path: &Path, options: &CompileOptions) -> Result<Compilation, PipelineError> {
    let contents = fs::read_to_string(path).map_err(|source| PipelineError::Read { path: path.to_path_buf(), source })?;
    let source_code = SourceCode::new(path, contents);

    let mut compilation = compile(&source_code, &options.platform);
    if !compilation.is_success() {
        return Err(PipelineError::Diagnostics(compilation.diagnostics));
    }

    link_executable(&mut compilation, options)?;
    Ok(compilation)
}

/// Writes the assembly of a successful compilation and turns it into the
/// executable at `options.output`.
pub fn link_executable(compilation: &mut Compilation, options: &CompileOptions) -> Result<PathBuf, PipelineError> {
    let Some(assembly) = &compilation.assembly else {
        return Err(PipelineError::Diagnostics(compilation.diagnostics.clone()));
    };

    let nasm_path = options.nasm_path();
    let object_path = options.object_path();

    debug!("Writing assembly to {}", nasm_path.display());
    fs::write(&nasm_path, assembly.to_string())
        .map_err(|source| PipelineError::Write { path: nasm_path.clone(), source })?;

    let statistics = &mut compilation.statistics;
    statistics.time(Stage::Assembling, || {
        NasmAssembler::new(options.platform.clone(), &nasm_path, &object_path).run()
    })?;

    let mut linker = GccLinker::new(options.platform.clone(), &options.output);
    linker.add_path(LinkerPath::Object(object_path.clone()));

    for path in &options.library_search_paths {
        linker.add_search_path(path);
    }

    for link in &compilation.tree.links {
        linker.add_path(LinkerPath::from_link(link.value()));
    }

    statistics.time(Stage::Linking, || linker.run())?;

    if !options.keep_files {
        if options.output_nasm.is_none() {
            remove_intermediate(&nasm_path);
        }

        if options.output_obj.is_none() {
            remove_intermediate(&object_path);
        }
    }

    Ok(options.output.clone())
}

fn remove_intermediate(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Could not remove {}: {e}", path.display());
    }
}

/// How a compiled program ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub exit_code: Option<i32>,

    /// Set when the program crashed instead of exiting.
    pub abnormal_exit: Option<String>,
}

impl From<ExitStatus> for RunOutcome {
    fn from(status: ExitStatus) -> Self {
        Self {
            exit_code: status.code(),
            abnormal_exit: describe_abnormal_exit(&status),
        }
    }
}

/// Runs an executable with inherited standard streams until it exits.
pub fn run_executable(path: &Path) -> Result<RunOutcome, PipelineError> {
    debug!("Running {}", path.display());

    let status = Command::new(path)
        .status()
        .map_err(|source| PipelineError::Run { path: path.to_path_buf(), source })?;

    Ok(status.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn diagnostics_stop_before_generation() {
        let source_code = SourceCode::new_test("fn main() { let int x = true }".to_string());
        let compilation = compile(&source_code, &Platform::linux());

        assert!(!compilation.is_success());
        assert!(compilation.assembly.is_none());
        assert_eq!(compilation.diagnostics.len(), 1);
        assert_eq!(compilation.statistics.stages.iter().map(|x| x.0).collect::<Vec<_>>(), [Stage::Parsing, Stage::Analyzing]);
    }

    #[test]
    fn parse_errors_skip_analysis() {
        let source_code = SourceCode::new_test("fn main( {".to_string());
        let compilation = compile(&source_code, &Platform::linux());

        assert!(!compilation.diagnostics.is_empty());
        assert_eq!(compilation.statistics.stages.len(), 1);
    }

    #[test]
    fn successful_compilation_counts() {
        let source_code = SourceCode::new_test("fn one() int { ret 1 } fn main() int { ret one() }".to_string());
        let compilation = compile(&source_code, &Platform::linux());

        assert!(compilation.is_success(), "{:#?}", compilation.diagnostics);
        assert_eq!(compilation.statistics.functions, 2);
        assert!(compilation.statistics.instructions > 0);
    }

    #[rstest]
    #[case(Platform::linux(), "dir/app", "dir/app.o", "dir/app.S")]
    #[case(Platform::windows(), "dir/app.exe", "dir/app.obj", "dir/app.S")]
    fn default_paths(#[case] platform: Platform, #[case] output: &str, #[case] object: &str, #[case] nasm: &str) {
        let options = CompileOptions::new(Path::new("dir/app.bz"), platform);

        assert_eq!(options.output, PathBuf::from(output));
        assert_eq!(options.object_path(), PathBuf::from(object));
        assert_eq!(options.nasm_path(), PathBuf::from(nasm));
    }
}
