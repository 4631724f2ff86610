// Copyright (C) 2023 - 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{error::Error, fmt::Display, str::CharIndices};

use strum::AsRefStr;
use thiserror::Error;

use crate::{BorString, FileLocation, IntegerLiteral, IntegerRadix, Keyword, Punctuator, Slice, SourceCode, Token, TokenKind};

pub struct Lexer<'source_code> {
    input: &'source_code SourceCode,
    chars: CharIndices<'source_code>,

    current: Option<(FileLocation, char)>,
    line: usize,
    column: usize,
    errors: Vec<LexerError>,
}

impl<'source_code> Lexer<'source_code> {
    pub fn new(input: &'source_code SourceCode) -> Self {
        Self {
            input,
            chars: input.char_indices(),
            current: None,
            line: 0,
            column: 0,
            errors: Vec::new(),
        }
    }

    pub fn next(&mut self) -> Option<Token> {
        self.skip_whitespace_and_comments();

        let ch = self.peek_char()?;
        match ch {
            '"' => self.consume_string(),

            'a'..='z' | 'A'..='Z' | '_' => self.consume_identifier_or_keyword(),
            '0'..='9' => self.consume_number(),

            '(' => self.consume_single_char_token(Punctuator::LeftParenthesis),
            ')' => self.consume_single_char_token(Punctuator::RightParenthesis),
            '{' => self.consume_single_char_token(Punctuator::LeftCurlyBracket),
            '}' => self.consume_single_char_token(Punctuator::RightCurlyBracket),
            '[' => self.consume_single_char_token(Punctuator::LeftSquareBracket),
            ']' => self.consume_single_char_token(Punctuator::RightSquareBracket),
            ',' => self.consume_single_char_token(Punctuator::Comma),
            '.' => self.consume_single_char_token(Punctuator::Period),
            '@' => self.consume_single_char_token(Punctuator::AtSign),
            '+' => self.consume_single_char_token(Punctuator::PlusSign),
            '*' => self.consume_single_char_token(Punctuator::Asterisk),
            '/' => self.consume_single_char_token(Punctuator::Solidus),

            '%' => self.consume_with_follower(Punctuator::PercentageSign, '%', Punctuator::DoublePercentageSign),
            '&' => self.consume_with_follower(Punctuator::Ampersand, '&', Punctuator::DoubleAmpersand),
            '-' => self.consume_with_follower(Punctuator::HyphenMinus, '>', Punctuator::Arrow),
            '=' => self.consume_with_follower(Punctuator::Assignment, '=', Punctuator::Equals),
            '!' => self.consume_with_follower(Punctuator::ExclamationMark, '=', Punctuator::NotEquals),
            '<' => self.consume_with_follower(Punctuator::LessThan, '=', Punctuator::LessThanOrEqual),
            '>' => self.consume_with_follower(Punctuator::GreaterThan, '=', Punctuator::GreaterThanOrEqual),

            _ => {
                let begin = self.current_location();
                self.consume_char();
                let end = self.current_location();

                Some(Token {
                    kind: TokenKind::IllegalCharacter(ch),
                    begin,
                    end,
                })
            }
        }
    }

    pub fn collect_all(mut self) -> (Vec<Token>, Vec<LexerError>) {
        let mut tokens = Vec::new();

        while let Some(token) = self.next() {
            tokens.push(token);
        }

        (tokens, self.errors)
    }

    #[must_use]
    fn consume_single_char_token(&mut self, punctuator: Punctuator) -> Option<Token> {
        let begin = self.current_location();
        self.consume_char();
        let end = self.current_location();

        Some(Token {
            kind: TokenKind::Punctuator(punctuator),
            begin,
            end,
        })
    }

    /// Consumes `single`, or `double` when the character after it is `follower`.
    fn consume_with_follower(&mut self, single: Punctuator, follower: char, double: Punctuator) -> Option<Token> {
        let begin = self.current_location();
        self.consume_char();

        let punctuator = if self.peek_char() == Some(follower) {
            self.consume_char();
            double
        } else {
            single
        };

        let end = self.current_location();

        Some(Token {
            kind: TokenKind::Punctuator(punctuator),
            begin,
            end,
        })
    }

    fn consume_string(&mut self) -> Option<Token> {
        let begin = self.current_location();
        self.consume_char();

        let offset_begin = self.current_location().offset();
        let mut buffer: Option<String> = None;
        let mut terminated = false;

        while let Some(c) = self.peek_char() {
            if c == '"' {
                terminated = true;
                break;
            }

            if c == '\n' {
                break;
            }

            let pos = self.current_location().offset();
            self.consume_char();

            if c != '\\' {
                if let Some(buffer) = &mut buffer {
                    buffer.push(c);
                }
                continue;
            }

            let buffer = buffer.get_or_insert_with(|| self.input[offset_begin..pos].to_string());
            let location = self.current_location();

            let Some(escaped) = self.peek_char() else {
                break;
            };

            match escaped {
                '"' => buffer.push('"'),
                'n' => buffer.push('\n'),
                'r' => buffer.push('\r'),
                't' => buffer.push('\t'),
                '0' => buffer.push('\0'),
                '\\' => buffer.push('\\'),
                invalid => {
                    buffer.push(invalid);
                    self.errors.push(LexerError {
                        location,
                        kind: LexerErrorKind::InvalidEscapeCharacter { invalid },
                    });
                }
            }

            self.consume_char();
        }

        let offset_end = self.current_location().offset();
        let str = match buffer {
            Some(buffer) => BorString::new(buffer),
            None => self.input.slice(offset_begin..offset_end),
        };

        if terminated {
            self.consume_char();
        } else {
            self.errors.push(LexerError {
                location: begin,
                kind: LexerErrorKind::UnterminatedString,
            });
        }

        let end = self.current_location();

        Some(Token {
            kind: TokenKind::StringLiteral(str),
            begin,
            end,
        })
    }

    fn consume_identifier_or_keyword(&mut self) -> Option<Token> {
        let begin = self.current_location();

        while self.peek_char().is_some_and(is_identifier_char) {
            self.consume_char();
        }

        let end = self.current_location();
        let str = self.input.slice(begin.offset()..end.offset());

        let kind = match Keyword::parse(&str) {
            Some(Keyword::Let) if self.peek_char() == Some('@') => {
                self.consume_char();
                TokenKind::Keyword(Keyword::LetAlloc)
            }
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(str),
        };

        Some(Token {
            kind,
            begin,
            end: self.current_location(),
        })
    }

    fn consume_number(&mut self) -> Option<Token> {
        let begin = self.current_location();

        if self.peek_char() == Some('0') {
            self.consume_char();

            if self.peek_char() == Some('x') {
                self.consume_char();
                return Some(self.consume_hexadecimal(begin));
            }
        }

        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.consume_char();
        }

        if self.peek_char() == Some('.') {
            return Some(self.consume_fraction(begin));
        }

        let end = self.current_location();
        let text = &self.input[begin.offset()..end.offset()];

        let value = match text.parse::<u64>() {
            Ok(value) if value <= i64::MAX as u64 => value,
            _ => {
                self.errors.push(LexerError {
                    location: begin,
                    kind: LexerErrorKind::NumberLiteralTooLong,
                });
                0
            }
        };

        Some(Token {
            kind: TokenKind::Integer(IntegerLiteral::decimal(value)),
            begin,
            end,
        })
    }

    fn consume_hexadecimal(&mut self, begin: FileLocation) -> Token {
        let digits_begin = self.current_location().offset();

        while self.peek_char().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.consume_char();
        }

        let end = self.current_location();
        let digits = &self.input[digits_begin..end.offset()];

        let value = if digits.is_empty() {
            self.errors.push(LexerError {
                location: begin,
                kind: LexerErrorKind::InvalidNumber,
            });
            0
        } else if digits.len() > 16 {
            self.errors.push(LexerError {
                location: begin,
                kind: LexerErrorKind::NumberLiteralTooLong,
            });
            0
        } else {
            u64::from_str_radix(digits, 16).unwrap_or_default()
        };

        Token {
            kind: TokenKind::Integer(IntegerLiteral {
                value,
                radix: IntegerRadix::Hexadecimal { digits: digits.len().max(1) },
            }),
            begin,
            end,
        }
    }

    fn consume_fraction(&mut self, begin: FileLocation) -> Token {
        self.consume_char();

        let fraction_begin = self.current_location().offset();
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.consume_char();
        }

        let end = self.current_location();
        if fraction_begin == end.offset() {
            self.errors.push(LexerError {
                location: end,
                kind: LexerErrorKind::FloatWrongFormat,
            });
        }

        let text = &self.input[begin.offset()..end.offset()];
        let value = text.trim_end_matches('.').parse::<f64>().unwrap_or_default();

        Token {
            kind: TokenKind::Float(value),
            begin,
            end,
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == '#' {
                while self.peek_char().is_some_and(|c| c != '\n') {
                    self.consume_char();
                }
                continue;
            }

            if !c.is_whitespace() {
                break;
            }

            self.consume_char();
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        if let Some((_, c)) = self.current {
            return Some(c);
        }

        self.current = self.chars.next()
            .map(|(offset, char)| {
                let location = FileLocation::new(self.input.file_id(), offset, self.line, self.column);

                if char == '\n' {
                    self.line += 1;
                    self.column = 0;
                } else {
                    self.column += 1;
                }

                (location, char)
            });

        Some(self.current?.1)
    }

    fn consume_char(&mut self) {
        self.current = None;
        _ = self.peek_char();
    }

    fn current_location(&mut self) -> FileLocation {
        _ = self.peek_char();
        match self.current {
            Some((location, _)) => location,
            None => FileLocation::new(self.input.file_id(), self.input.len(), self.line, self.column),
        }
    }
}

impl<'source_code> Iterator for Lexer<'source_code> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.next()
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexerError {
    pub location: FileLocation,
    pub kind: LexerErrorKind,
}

impl Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}

impl Error for LexerError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum LexerErrorKind {
    #[error("Invalid escape sequence `\\{invalid}`, only `\\\"`, `\\\\`, `\\0`, `\\n`, `\\r` and `\\t` are allowed")]
    InvalidEscapeCharacter { invalid: char },

    #[error("Invalid number")]
    InvalidNumber,

    #[error("Number literal does not fit in 64 bits")]
    NumberLiteralTooLong,

    #[error("Floating-point literal requires digits after the `.`")]
    FloatWrongFormat,

    #[error("String literal is not terminated before the end of the line")]
    UnterminatedString,
}

impl LexerErrorKind {
    #[must_use]
    pub fn name(&self) -> &str {
        self.as_ref()
    }
}
