// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{error::Error, fmt::Display, path::PathBuf};

use strum::AsRefStr;
use thiserror::Error;

use crate::{BinaryOperator, BorString, FileRange, Type, UnaryOperator};

use super::SemanticRelatedInformation;

#[derive(Debug, Clone)]
pub struct SemanticDiagnostic {
    range: FileRange,
    kind: SemanticDiagnosticKind,
    related: Vec<SemanticRelatedInformation>,
}

impl Display for SemanticDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}

impl Error for SemanticDiagnostic {
}

impl SemanticDiagnostic {
    #[must_use]
    pub fn new(range: FileRange, kind: SemanticDiagnosticKind) -> Self {
        Self {
            range,
            kind,
            related: Vec::new(),
        }
    }

    #[must_use]
    pub fn range(&self) -> FileRange {
        self.range
    }

    #[must_use]
    pub fn kind(&self) -> &SemanticDiagnosticKind {
        &self.kind
    }

    #[must_use]
    pub fn related_info(&self) -> &[SemanticRelatedInformation] {
        &self.related
    }

    #[must_use]
    pub fn with_related(mut self, info: impl Into<Option<SemanticRelatedInformation>>) -> Self {
        if let Some(info) = info.into() {
            self.related.push(info);
        }

        self
    }
}

#[derive(Debug, Clone, Error, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SemanticDiagnosticKind {
    #[error("`{name}` already exists")]
    AlreadyExists { name: BorString },

    #[error("Type `{ty}` is unknown")]
    UnknownType { ty: Type },

    #[error("Variable is declared as `{expected}` but is assigned a value of type `{actual}`")]
    LetTypeMismatch { expected: Type, actual: Type },

    #[error("Variable `{name}` doesn't exist in this scope")]
    VariableDoesntExist { name: BorString },

    #[error("Function `{name}` returns `{ty}` but doesn't end with `ret`")]
    NoReturn { name: BorString, ty: Type },

    #[error("Function must return a value of type `{expected}`")]
    ReturnEmpty { expected: Type },

    #[error("Function returns `void` and can't return a value")]
    ReturnValueInVoid,

    #[error("Function returns `{expected}` but `ret` gives `{actual}`")]
    RetTypeMismatch { expected: Type, actual: Type },

    #[error("Expected a value of type `{expected}`, but got `{actual}`")]
    TypeMismatch { expected: Type, actual: Type },

    #[error("Array elements must all be of type `{expected}`, but one is `{actual}`")]
    TypeMismatchMany { expected: Type, actual: Type },

    #[error("Operator `{operator}` is not defined for `{ty}`")]
    BinaryOperatorUndefined { operator: BinaryOperator, ty: Type },

    #[error("Operator `{operator}` is not defined for `{ty}`")]
    UnaryOperatorUndefined { operator: UnaryOperator, ty: Type },

    #[error("Program has no `fn main()` entry point")]
    NoEntryPoint,

    #[error("`main` must take no parameters and return `void` or an integer type")]
    InvalidEntryPoint,

    #[error("Can't {access} a value of type `{ty}`")]
    CantAccess { ty: Type, access: BorString },

    #[error("Function `{name}` takes {expected}{} arguments, but {actual} were given", or_more(.variadic))]
    FnCallArgsCount { name: BorString, expected: usize, actual: usize, variadic: bool },

    #[error("Argument {position} should be of type `{expected}`, but is `{actual}`")]
    FnCallArgType { position: usize, expected: Type, actual: Type },

    #[error("Function `{name}` must be called")]
    FunctionNotCalled { name: BorString },

    #[error("Can't allocate a dynamic array into the fixed array type `{ty}`")]
    DynamicToFixedArray { ty: Type },

    #[error("Array allocation needs an array type from its context")]
    ArrayAllocationWithoutHint,

    #[error("Empty array needs an array type from its context")]
    EmptyArrayWithoutHint,

    #[error("`null` can only be used where a pointer or array is expected")]
    NullWithoutPointerHint,

    #[error("The variadic `*` must be the last parameter")]
    InvalidVarargPosition,

    #[error("Constructor arguments must be either all named or all positional")]
    ConstructorArgumentsFormat,

    #[error("Type `{ty}` has {expected} members, but {actual} were initialized")]
    ConstructorNotEnoughArgs { ty: Type, expected: usize, actual: usize },

    #[error("Type `{ty}` has no member called `{member}`")]
    ConstructorUnknownMember { ty: Type, member: BorString },

    #[error("Can't figure out the layout of `{name}`, its members depend on each other")]
    CantFigureTypes { name: BorString },

    #[error("Expected a pointer or array, but got `{ty}`")]
    NotPointerType { ty: Type },

    #[error("Can't take the address of a function call result")]
    InvalidPointerTarget,

    #[error("Can't assign to the result of a function call")]
    MutDestinationAcc,

    #[error("Can't convert from `{from}` to `{to}`")]
    InvalidConversion { from: Type, to: Type },

    #[error("`{keyword}` can only be used inside a loop")]
    NotInLoop { keyword: &'static str },

    #[error("Embedded file `{}` was not found", path.display())]
    EmbedNotFound { path: PathBuf },

    #[error("`call` must be followed by a function call")]
    NotACall,
}

fn or_more(variadic: &bool) -> &'static str {
    if *variadic { " or more" } else { "" }
}

impl SemanticDiagnosticKind {
    pub fn name(&self) -> &str {
        self.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SemanticDiagnosticKind::NoEntryPoint, "no-entry-point")]
    #[case(SemanticDiagnosticKind::FnCallArgsCount { name: "f".into(), expected: 1, actual: 2, variadic: false }, "fn-call-args-count")]
    #[case(SemanticDiagnosticKind::MutDestinationAcc, "mut-destination-acc")]
    fn names(#[case] kind: SemanticDiagnosticKind, #[case] expected: &str) {
        assert_eq!(kind.name(), expected);
    }

    #[test]
    fn variadic_argument_count_message() {
        let kind = SemanticDiagnosticKind::FnCallArgsCount { name: "printf".into(), expected: 1, actual: 0, variadic: true };
        assert_eq!(kind.to_string(), "Function `printf` takes 1 or more arguments, but 0 were given");
    }
}
