// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use borzoi::{FileRange, LexerError, ParseDiagnostic, SemanticDiagnostic};
use strum::AsRefStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum DiagnosticStage {
    Lexer,
    Parser,
    Semantics,
}

/// A problem found in the source, from any stage before code generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: DiagnosticStage,
    pub name: String,
    pub message: String,
    pub range: FileRange,
    pub related: Vec<(FileRange, String)>,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}: {}", self.range, self.message))
    }
}

impl From<&LexerError> for Diagnostic {
    fn from(value: &LexerError) -> Self {
        Self {
            stage: DiagnosticStage::Lexer,
            name: value.kind.name().to_string(),
            message: value.to_string(),
            range: value.location.as_zero_range(),
            related: Vec::new(),
        }
    }
}

impl From<&ParseDiagnostic> for Diagnostic {
    fn from(value: &ParseDiagnostic) -> Self {
        Self {
            stage: DiagnosticStage::Parser,
            name: value.name().to_string(),
            message: value.to_string(),
            range: value.range(),
            related: Vec::new(),
        }
    }
}

impl From<&SemanticDiagnostic> for Diagnostic {
    fn from(value: &SemanticDiagnostic) -> Self {
        Self {
            stage: DiagnosticStage::Semantics,
            name: value.kind().name().to_string(),
            message: value.to_string(),
            range: value.range(),
            related: value.related_info().iter()
                .map(|x| (x.range(), x.message().to_string()))
                .collect(),
        }
    }
}
