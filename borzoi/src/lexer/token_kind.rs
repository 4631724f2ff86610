// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::{Display, Formatter};

use crate::BorString;

use super::{Keyword, Punctuator};

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),

    Identifier(BorString),
    StringLiteral(BorString),
    Integer(IntegerLiteral),
    Float(f64),

    Punctuator(Punctuator),
    IllegalCharacter(char),
}

impl TokenKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Keyword(..) => "keyword",
            Self::Identifier(..) => "identifier",
            Self::StringLiteral(..) => "string",
            Self::Integer(..) => "integer",
            Self::Float(..) => "floating-point number",
            Self::Punctuator(punctuator) => punctuator.into(),
            Self::IllegalCharacter(..) => "illegal character",
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyword(keyword) => f.write_str(keyword.as_ref()),
            Self::Identifier(ident) => ident.fmt(f),
            Self::StringLiteral(str) => f.write_fmt(format_args!("{str:?}")),
            Self::Integer(integer) => integer.fmt(f),
            Self::Float(float) => float.fmt(f),
            Self::Punctuator(punctuator) => punctuator.fmt(f),
            Self::IllegalCharacter(ch) => ch.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerLiteral {
    pub value: u64,
    pub radix: IntegerRadix,
}

impl IntegerLiteral {
    #[must_use]
    pub const fn decimal(value: u64) -> Self {
        Self {
            value,
            radix: IntegerRadix::Decimal,
        }
    }
}

impl Display for IntegerLiteral {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.radix {
            IntegerRadix::Decimal => self.value.fmt(f),
            IntegerRadix::Hexadecimal { digits } => {
                f.write_fmt(format_args!("0x{:0digits$x}", self.value))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerRadix {
    Decimal,

    /// The digit count decides which integer widths the literal may take.
    Hexadecimal { digits: usize },
}
