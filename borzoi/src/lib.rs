// Copyright (C) 2023 - 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

#![deny(elided_lifetimes_in_paths)]

mod ast;
mod lexer;
mod parser;
mod semantics;
mod string;
mod tree;
mod type_;
mod util;

pub use self::{
    ast::*,
    lexer::*,
    parser::{ParseDiagnostic, ParseError, ParseResult, Parser},
    semantics::*,
    string::{BorString, Slice},
    tree::ParseTree,
    type_::{is_assignable_modifier, ArrayLength, FunctionModifier, Type, TypeModifier},
    util::{FileId, FileLocation, FileRange, Ranged, SourceCode},
};

/// The output of the front half of the pipeline.
#[derive(Debug)]
pub struct ParseOutput {
    pub tokens: Vec<Token>,
    pub tree: ParseTree,
    pub lexer_errors: Vec<LexerError>,
    pub parse_diagnostics: Vec<ParseDiagnostic>,
}

impl ParseOutput {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.lexer_errors.is_empty() || !self.parse_diagnostics.is_empty()
    }
}

/// Lexes and parses `source_code` into an untyped tree.
pub fn parse_source_code(source_code: &SourceCode) -> ParseOutput {
    let (tokens, lexer_errors) = Lexer::new(source_code).collect_all();

    let mut parser = Parser::new(source_code.path().to_path_buf(), &tokens);
    let tree = parser.parse_tree();
    let parse_diagnostics = parser.into_diagnostics();

    ParseOutput {
        tokens,
        tree,
        lexer_errors,
        parse_diagnostics,
    }
}
