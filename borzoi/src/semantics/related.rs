// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use strum::AsRefStr;
use thiserror::Error;

use crate::{BorString, FileRange, Type};

#[derive(Debug, Clone)]
pub struct SemanticRelatedInformation {
    range: FileRange,
    message: SemanticRelatedMessage,
}

impl SemanticRelatedInformation {
    #[must_use]
    pub fn new(range: FileRange, message: SemanticRelatedMessage) -> Self {
        Self {
            range,
            message,
        }
    }

    #[must_use]
    pub fn range(&self) -> FileRange {
        self.range
    }

    #[must_use]
    pub fn message(&self) -> &SemanticRelatedMessage {
        &self.message
    }
}

#[derive(Debug, Clone, Error, AsRefStr)]
pub enum SemanticRelatedMessage {
    #[error("`{name}` was first declared here")]
    FirstDeclaredHere { name: BorString },

    #[error("function `{name}` is declared here")]
    FunctionDeclaredHere { name: BorString },

    #[error("return type `{ty}` is declared here")]
    ReturnTypeDeclaredHere { ty: Type },

    #[error("type `{name}` is declared here")]
    TypeDeclaredHere { name: BorString },

    #[error("expression is of type `{ty}`")]
    ExpressionIsOfType { ty: Type },
}
