// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::{Display, Formatter};

use strum::IntoStaticStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum Punctuator {
    #[strum(serialize = "ampersand")]
    Ampersand,
    #[strum(serialize = "arrow")]
    Arrow,
    #[strum(serialize = "asterisk")]
    Asterisk,
    #[strum(serialize = "at sign")]
    AtSign,
    #[strum(serialize = "assignment")]
    Assignment,
    #[strum(serialize = "comma")]
    Comma,
    #[strum(serialize = "double ampersand")]
    DoubleAmpersand,
    #[strum(serialize = "double percent sign")]
    DoublePercentageSign,
    #[strum(serialize = "equals")]
    Equals,
    #[strum(serialize = "exclamation mark")]
    ExclamationMark,
    #[strum(serialize = "greater-than")]
    GreaterThan,
    #[strum(serialize = "greater-than-or-equal")]
    GreaterThanOrEqual,
    #[strum(serialize = "hyphen-minus")]
    HyphenMinus,
    #[strum(serialize = "left curly bracket")]
    LeftCurlyBracket,
    #[strum(serialize = "left parenthesis")]
    LeftParenthesis,
    #[strum(serialize = "left square bracket")]
    LeftSquareBracket,
    #[strum(serialize = "less-than")]
    LessThan,
    #[strum(serialize = "less-than-or-equal")]
    LessThanOrEqual,
    #[strum(serialize = "not-equals")]
    NotEquals,
    #[strum(serialize = "percent sign")]
    PercentageSign,
    #[strum(serialize = "period")]
    Period,
    #[strum(serialize = "plus sign")]
    PlusSign,
    #[strum(serialize = "right curly bracket")]
    RightCurlyBracket,
    #[strum(serialize = "right parenthesis")]
    RightParenthesis,
    #[strum(serialize = "right square bracket")]
    RightSquareBracket,
    #[strum(serialize = "solidus")]
    Solidus,
}

impl Punctuator {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ampersand => "&",
            Self::Arrow => "->",
            Self::Asterisk => "*",
            Self::AtSign => "@",
            Self::Assignment => "=",
            Self::Comma => ",",
            Self::DoubleAmpersand => "&&",
            Self::DoublePercentageSign => "%%",
            Self::Equals => "==",
            Self::ExclamationMark => "!",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::HyphenMinus => "-",
            Self::LeftCurlyBracket => "{",
            Self::LeftParenthesis => "(",
            Self::LeftSquareBracket => "[",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::NotEquals => "!=",
            Self::PercentageSign => "%",
            Self::Period => ".",
            Self::PlusSign => "+",
            Self::RightCurlyBracket => "}",
            Self::RightParenthesis => ")",
            Self::RightSquareBracket => "]",
            Self::Solidus => "/",
        }
    }
}

impl Display for Punctuator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
