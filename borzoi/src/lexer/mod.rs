// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod keyword;
mod lexer;
mod punctuator;
mod token;
mod token_kind;

pub use self::{
    keyword::Keyword,
    lexer::{
        Lexer,
        LexerError,
        LexerErrorKind,
    },
    punctuator::Punctuator,
    token::Token,
    token_kind::{
        IntegerLiteral,
        IntegerRadix,
        TokenKind,
    },
};
