// Copyright (C) 2023 - 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::path::PathBuf;

use strum::AsRefStr;

use crate::{
    Accessor, AccessorKind, ArrayLength, BinaryExpression, BinaryOperator, Block, BorString, ConstructorArgument,
    ConstructorExpression, EmbedDeclaration, Expression, ExpressionKind, FileLocation, FileRange, ForStatement,
    ForeignFunctionDeclaration, ForeignParameter, FunctionDeclaration, Keyword, LetStatement, Parameter, ParseTree,
    Punctuator, Ranged, RecordDeclaration, RecordMember, StackVariables, Statement, StatementKind, Token, TokenKind,
    Type, TypeModifier, UnaryOperator, VariableReference,
};

pub type ParseResult<T> = Result<T, ParseError>;

type OperandParser<'tokens> = fn(&mut Parser<'tokens>) -> ParseResult<Ranged<Expression>>;
type OperatorMatcher = fn(&TokenKind) -> Option<BinaryOperator>;

#[derive(Clone)]
pub struct Parser<'tokens> {
    pub path: PathBuf,
    tokens: &'tokens [Token],
    pub cursor: usize,
    pub token_begin: FileLocation,
    pub token_end: FileLocation,
    diagnostics: Vec<ParseDiagnostic>,
}

impl<'tokens> Parser<'tokens> {
    pub fn new(path: PathBuf, tokens: &'tokens [Token]) -> Self {
        Self {
            path,
            token_begin: Default::default(),
            token_end: Default::default(),
            diagnostics: Vec::new(),
            tokens,
            cursor: 0,
        }
    }

    pub fn parse_tree(&mut self) -> ParseTree {
        let mut tree = ParseTree::new(self.path.clone());

        while !self.is_at_end() {
            match self.parse_declaration(&mut tree) {
                Ok(()) => (),
                Err(ParseError::EndOfFile) => {
                    self.emit_diagnostic(ParseDiagnostic::UnexpectedEndOfFile { location: self.token_end });
                    break;
                }
                Err(ParseError::Reported) => self.skip_to_next_declaration(),
            }
        }

        tree
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<ParseDiagnostic> {
        self.diagnostics
    }

    #[must_use]
    pub const fn is_at_end(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    fn parse_declaration(&mut self, tree: &mut ParseTree) -> ParseResult<()> {
        let token = self.consume_token()?;

        match token.kind {
            TokenKind::Keyword(Keyword::Fn) => {
                let function = self.parse_function(token.begin)?;
                tree.functions.push(function);
            }

            TokenKind::Keyword(Keyword::Cfn) => {
                let function = self.parse_foreign_function(token.begin)?;
                tree.foreign_functions.push(function);
            }

            TokenKind::Keyword(Keyword::Type) => {
                let record = self.parse_record(token.begin)?;
                tree.records.push(record);
            }

            TokenKind::Keyword(Keyword::Link) => {
                let library = self.expect_string_literal("link")?;
                tree.links.push(library);
            }

            TokenKind::Keyword(Keyword::Embed) => {
                let path = self.expect_string_literal("embed")?;
                self.expect_keyword(Keyword::As, "embed path")?;
                let name = self.expect_identifier("embed path")?;

                tree.embeds.push(EmbedDeclaration {
                    range: FileRange::new(token.begin, self.token_end),
                    path,
                    name,
                    resolved_path: None,
                });
            }

            _ => {
                self.emit_diagnostic(ParseDiagnostic::ExpectedDeclaration { token });
                return Err(ParseError::Reported);
            }
        }

        Ok(())
    }

    fn skip_to_next_declaration(&mut self) {
        while let Ok(token) = self.peek_token() {
            if let TokenKind::Keyword(keyword) = &token.kind {
                if keyword.starts_declaration() {
                    break;
                }
            }

            self.cursor += 1;
        }
    }

    fn parse_function(&mut self, start: FileLocation) -> ParseResult<FunctionDeclaration> {
        let name = self.expect_identifier("fn")?;

        self.expect_punctuator(Punctuator::LeftParenthesis, "function name")?;

        let mut parameters = Vec::new();
        if self.peek_punctuator() == Some(Punctuator::RightParenthesis) {
            _ = self.consume_token()?;
        } else {
            loop {
                let ty = self.parse_type()?;
                let name = self.expect_identifier("parameter type")?;
                parameters.push(Parameter { ty, name });

                if self.expect_comma_or_right_paren("parameter")? == Punctuator::RightParenthesis {
                    break;
                }
            }
        }

        let return_type = self.parse_optional_return_type()?;

        let token = self.peek_token()?;
        if !matches!(token.kind, TokenKind::Punctuator(Punctuator::LeftCurlyBracket | Punctuator::DoubleAmpersand)) {
            let token = token.clone();
            self.emit_diagnostic(ParseDiagnostic::FunctionBodyExpectedCurlyBracket { token });
            return Err(ParseError::Reported);
        }

        let body = self.parse_block()?;

        Ok(FunctionDeclaration {
            range: FileRange::new(start, self.token_end),
            name,
            parameters,
            return_type,
            body,
            variables: StackVariables::default(),
        })
    }

    fn parse_foreign_function(&mut self, start: FileLocation) -> ParseResult<ForeignFunctionDeclaration> {
        let name = self.expect_identifier("cfn")?;

        let link_name = if self.peek_keyword() == Some(Keyword::From) {
            _ = self.consume_token()?;
            Some(self.expect_identifier("from")?)
        } else {
            None
        };

        self.expect_punctuator(Punctuator::LeftParenthesis, "foreign function name")?;

        let mut parameters = Vec::new();
        if self.peek_punctuator() == Some(Punctuator::RightParenthesis) {
            _ = self.consume_token()?;
        } else {
            loop {
                if self.peek_punctuator() == Some(Punctuator::Asterisk) {
                    let range = self.consume_token()?.range();
                    parameters.push(ForeignParameter::Variadic(range));
                } else {
                    let ty = self.parse_type()?;
                    let name = match self.peek_token()?.as_identifier() {
                        Some(name) => {
                            _ = self.consume_token()?;
                            Some(name)
                        }
                        None => None,
                    };

                    parameters.push(ForeignParameter::Typed { ty, name });
                }

                if self.expect_comma_or_right_paren("foreign parameter")? == Punctuator::RightParenthesis {
                    break;
                }
            }
        }

        let return_type = self.parse_optional_return_type()?;

        Ok(ForeignFunctionDeclaration {
            range: FileRange::new(start, self.token_end),
            name,
            link_name,
            parameters,
            return_type,
        })
    }

    fn parse_record(&mut self, start: FileLocation) -> ParseResult<RecordDeclaration> {
        let name = self.expect_identifier("type")?;
        self.expect_punctuator(Punctuator::LeftCurlyBracket, "type name")?;

        let mut members = Vec::new();
        loop {
            if self.peek_punctuator() == Some(Punctuator::RightCurlyBracket) {
                _ = self.consume_token()?;
                break;
            }

            let ty = self.parse_type()?;
            let name = self.expect_identifier("member type")?;
            members.push(RecordMember { ty, name });

            let token = self.consume_token()?;
            match token.kind {
                TokenKind::Punctuator(Punctuator::Comma) => continue,
                TokenKind::Punctuator(Punctuator::RightCurlyBracket) => break,
                _ => {
                    self.emit_diagnostic(ParseDiagnostic::ExpectedPunctuator {
                        token,
                        expected: Punctuator::RightCurlyBracket,
                        context: "record member",
                    });
                    return Err(ParseError::Reported);
                }
            }
        }

        Ok(RecordDeclaration {
            range: FileRange::new(start, self.token_end),
            name,
            members,
        })
    }

    fn parse_optional_return_type(&mut self) -> ParseResult<Ranged<Type>> {
        if matches!(self.peek_token().map(|x| &x.kind), Ok(TokenKind::Identifier(..))) {
            return self.parse_type();
        }

        Ok(Ranged::new(self.token_end.as_zero_range(), Type::void()))
    }

    pub fn parse_type(&mut self) -> ParseResult<Ranged<Type>> {
        let token = self.consume_token()?;
        let TokenKind::Identifier(ref name) = token.kind else {
            self.emit_diagnostic(ParseDiagnostic::ExpectedType { token });
            return Err(ParseError::Reported);
        };

        let mut ty = Type::new(name.clone());

        loop {
            match self.peek_punctuator() {
                Some(Punctuator::LeftSquareBracket) => {
                    _ = self.consume_token()?;

                    let token = self.consume_token()?;
                    let length = match token.kind {
                        TokenKind::Punctuator(Punctuator::RightSquareBracket) => ArrayLength::Dynamic,
                        TokenKind::Integer(integer) => {
                            self.expect_punctuator(Punctuator::RightSquareBracket, "array length")?;
                            ArrayLength::Fixed(integer.value)
                        }
                        _ => {
                            self.emit_diagnostic(ParseDiagnostic::InvalidArrayLength { token });
                            return Err(ParseError::Reported);
                        }
                    };

                    ty = ty.with_modifier(TypeModifier::Array(length));
                }

                Some(Punctuator::AtSign) => {
                    _ = self.consume_token()?;
                    ty = ty.with_modifier(TypeModifier::Pointer);
                }

                _ => break,
            }
        }

        Ok(Ranged::new(FileRange::new(token.begin, self.token_end), ty))
    }

    /// A braced body, optionally prefixed with `&&`, or a single statement.
    pub fn parse_block(&mut self) -> ParseResult<Block> {
        let start = self.peek_token()?.begin;

        let manual = self.peek_punctuator() == Some(Punctuator::DoubleAmpersand);
        if manual {
            _ = self.consume_token()?;
        }

        if self.peek_punctuator() != Some(Punctuator::LeftCurlyBracket) {
            let statement = self.parse_statement()?;
            return Ok(Block {
                range: FileRange::new(start, self.token_end),
                statements: vec![statement],
                manual,
            });
        }

        _ = self.consume_token()?;

        let mut statements = Vec::new();
        while self.peek_punctuator() != Some(Punctuator::RightCurlyBracket) {
            statements.push(self.parse_statement()?);
        }

        _ = self.consume_token()?;

        Ok(Block {
            range: FileRange::new(start, self.token_end),
            statements,
            manual,
        })
    }

    pub fn parse_statement(&mut self) -> ParseResult<Statement> {
        let token = self.peek_token()?;
        let start = token.begin;

        let kind = match token.kind {
            TokenKind::Keyword(keyword @ (Keyword::Let | Keyword::LetAlloc)) => {
                _ = self.consume_token()?;
                let ty = self.parse_type()?;
                let name = self.expect_identifier("variable type")?;
                self.expect_punctuator(Punctuator::Assignment, "variable name")?;
                let value = self.parse_expression()?;

                StatementKind::Let(LetStatement {
                    ty,
                    name,
                    allocate: keyword == Keyword::LetAlloc,
                    value,
                    mangled: None,
                })
            }

            TokenKind::Keyword(Keyword::Mut) => {
                _ = self.consume_token()?;
                let target = self.parse_variable_reference()?;
                self.expect_punctuator(Punctuator::Assignment, "mut target")?;
                let value = self.parse_expression()?;
                StatementKind::Mut { target, value }
            }

            TokenKind::Keyword(Keyword::Call) => {
                _ = self.consume_token()?;
                StatementKind::Call(self.parse_expression()?)
            }

            TokenKind::Keyword(Keyword::Collect) => {
                _ = self.consume_token()?;
                StatementKind::Collect(self.parse_expression()?)
            }

            TokenKind::Keyword(Keyword::Ret) => {
                _ = self.consume_token()?;
                let value = if self.can_start_expression() {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                StatementKind::Return(value)
            }

            TokenKind::Keyword(Keyword::Break) => {
                _ = self.consume_token()?;
                StatementKind::Break
            }

            TokenKind::Keyword(Keyword::Continue) => {
                _ = self.consume_token()?;
                StatementKind::Continue
            }

            TokenKind::Keyword(Keyword::If) => {
                _ = self.consume_token()?;
                let condition = self.parse_expression()?;
                let then_block = self.parse_block()?;

                let else_block = if self.peek_keyword() == Some(Keyword::Else) {
                    _ = self.consume_token()?;
                    Some(self.parse_block()?)
                } else {
                    None
                };

                StatementKind::If { condition, then_block, else_block }
            }

            TokenKind::Keyword(Keyword::While) => {
                _ = self.consume_token()?;
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                StatementKind::While { condition, body }
            }

            TokenKind::Keyword(Keyword::Do) => {
                _ = self.consume_token()?;
                let body = self.parse_block()?;
                self.expect_keyword(Keyword::While, "do block")?;
                let condition = self.parse_expression()?;
                StatementKind::DoWhile { body, condition }
            }

            TokenKind::Keyword(Keyword::For) => {
                _ = self.consume_token()?;
                let iterator = self.expect_identifier("for")?;
                self.expect_keyword(Keyword::From, "iterator name")?;
                let from = self.parse_expression()?;
                self.expect_keyword(Keyword::Until, "lower bound")?;
                let until = self.parse_expression()?;
                let body = self.parse_block()?;

                StatementKind::For(ForStatement {
                    iterator,
                    from,
                    until,
                    body,
                    mangled: None,
                })
            }

            TokenKind::Punctuator(Punctuator::LeftCurlyBracket | Punctuator::DoubleAmpersand) => {
                StatementKind::Block(self.parse_block()?)
            }

            _ => {
                let token = self.consume_token()?;
                self.emit_diagnostic(ParseDiagnostic::ExpectedStatement { token });
                return Err(ParseError::Reported);
            }
        };

        Ok(Statement {
            range: FileRange::new(start, self.token_end),
            kind,
        })
    }

    pub fn parse_expression(&mut self) -> ParseResult<Ranged<Expression>> {
        self.parse_bi_expression(Self::parse_comparison_expression, logical_operator)
    }

    fn parse_comparison_expression(&mut self) -> ParseResult<Ranged<Expression>> {
        self.parse_bi_expression(Self::parse_additive_expression, comparison_operator)
    }

    fn parse_additive_expression(&mut self) -> ParseResult<Ranged<Expression>> {
        self.parse_bi_expression(Self::parse_multiplicative_expression, additive_operator)
    }

    fn parse_multiplicative_expression(&mut self) -> ParseResult<Ranged<Expression>> {
        self.parse_bi_expression(Self::parse_unary_expression, multiplicative_operator)
    }

    fn parse_bi_expression(&mut self, operand: OperandParser<'tokens>, matcher: OperatorMatcher) -> ParseResult<Ranged<Expression>> {
        let mut expr = operand(self)?;

        loop {
            let Ok(next) = self.peek_token() else {
                break;
            };

            let Some(operator) = matcher(&next.kind) else {
                break;
            };

            let operator_range = self.consume_token()?.range();
            let operator = Ranged::new(operator_range, operator);

            let lhs = expr;
            let rhs = operand(self)?;
            let range = FileRange::new(lhs.range().start(), rhs.range().end());

            let expression = ExpressionKind::Binary(BinaryExpression {
                operator,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
            expr = Ranged::new(range, expression.into());
        }

        Ok(expr)
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Ranged<Expression>> {
        let token = self.peek_token()?;
        let operator = match token.kind {
            TokenKind::Keyword(Keyword::Not) | TokenKind::Punctuator(Punctuator::ExclamationMark) => UnaryOperator::Not,
            TokenKind::Punctuator(Punctuator::HyphenMinus) => UnaryOperator::Negate,
            TokenKind::Punctuator(Punctuator::Ampersand) => UnaryOperator::ManualRelease,
            _ => return self.parse_postfix_expression(),
        };

        let operator_range = self.consume_token()?.range();
        let operand = self.parse_unary_expression()?;
        let range = FileRange::new(operator_range.start(), operand.range().end());

        let expression = ExpressionKind::Unary {
            operator: Ranged::new(operator_range, operator),
            operand: Box::new(operand),
        };

        Ok(Ranged::new(range, expression.into()))
    }

    fn parse_postfix_expression(&mut self) -> ParseResult<Ranged<Expression>> {
        let mut expression = self.parse_leaf_expression()?;

        while self.peek_punctuator() == Some(Punctuator::Arrow) {
            _ = self.consume_token()?;
            let target = self.parse_type()?;
            let range = FileRange::new(expression.range().start(), target.range().end());

            let kind = ExpressionKind::Conversion {
                expression: Box::new(expression),
                target,
            };
            expression = Ranged::new(range, kind.into());
        }

        Ok(expression)
    }

    fn parse_leaf_expression(&mut self) -> ParseResult<Ranged<Expression>> {
        let token = self.peek_token()?;
        let start = token.begin;

        let kind = match &token.kind {
            TokenKind::Integer(integer) => {
                let integer = *integer;
                _ = self.consume_token()?;
                ExpressionKind::Integer(integer)
            }

            TokenKind::Float(float) => {
                let float = *float;
                _ = self.consume_token()?;
                ExpressionKind::Float(float)
            }

            TokenKind::StringLiteral(str) => {
                let str = str.clone();
                _ = self.consume_token()?;
                ExpressionKind::String(str)
            }

            TokenKind::Keyword(Keyword::True) => {
                _ = self.consume_token()?;
                ExpressionKind::Boolean(true)
            }

            TokenKind::Keyword(Keyword::False) => {
                _ = self.consume_token()?;
                ExpressionKind::Boolean(false)
            }

            TokenKind::Keyword(Keyword::Null) => {
                _ = self.consume_token()?;
                ExpressionKind::Null
            }

            TokenKind::Identifier(..) => {
                if self.peek_punctuator_at(1) == Some(Punctuator::ExclamationMark)
                        && self.peek_punctuator_at(2) == Some(Punctuator::LeftCurlyBracket) {
                    ExpressionKind::Constructor(self.parse_constructor()?)
                } else {
                    ExpressionKind::Variable(self.parse_variable_reference()?.into_value())
                }
            }

            TokenKind::Punctuator(Punctuator::LeftParenthesis) => {
                _ = self.consume_token()?;
                let inner = self.parse_expression()?;
                self.expect_punctuator(Punctuator::RightParenthesis, "parenthesized expression")?;
                ExpressionKind::Parenthesized(Box::new(inner))
            }

            TokenKind::Punctuator(Punctuator::LeftSquareBracket) => {
                _ = self.consume_token()?;

                let mut elements = Vec::new();
                if self.peek_punctuator() == Some(Punctuator::RightSquareBracket) {
                    _ = self.consume_token()?;
                } else {
                    loop {
                        elements.push(self.parse_expression()?);

                        let token = self.consume_token()?;
                        match token.kind {
                            TokenKind::Punctuator(Punctuator::Comma) => continue,
                            TokenKind::Punctuator(Punctuator::RightSquareBracket) => break,
                            _ => {
                                self.emit_diagnostic(ParseDiagnostic::ExpectedPunctuator {
                                    token,
                                    expected: Punctuator::RightSquareBracket,
                                    context: "array element",
                                });
                                return Err(ParseError::Reported);
                            }
                        }
                    }
                }

                ExpressionKind::ArrayLiteral(elements)
            }

            TokenKind::Punctuator(Punctuator::Asterisk) => {
                _ = self.consume_token()?;
                let size = self.parse_leaf_expression()?;
                ExpressionKind::ArrayAllocation(Box::new(size))
            }

            TokenKind::Punctuator(Punctuator::AtSign) => {
                _ = self.consume_token()?;
                let target = self.parse_variable_reference()?;
                ExpressionKind::AddressOf(Box::new(target))
            }

            _ => {
                let token = self.consume_token()?;
                self.emit_diagnostic(ParseDiagnostic::UnknownStartOfExpression { token });
                return Err(ParseError::Reported);
            }
        };

        Ok(Ranged::new(FileRange::new(start, self.token_end), kind.into()))
    }

    fn parse_variable_reference(&mut self) -> ParseResult<Ranged<VariableReference>> {
        let name = self.expect_identifier("variable reference")?;
        let start = name.range().start();
        let mut variable = VariableReference::new(name);

        loop {
            let Some(punctuator) = self.peek_punctuator() else {
                break;
            };

            let accessor_start = self.peek_token()?.begin;
            let kind = match punctuator {
                Punctuator::LeftParenthesis => {
                    _ = self.consume_token()?;

                    let mut arguments = Vec::new();
                    if self.peek_punctuator() == Some(Punctuator::RightParenthesis) {
                        _ = self.consume_token()?;
                    } else {
                        loop {
                            arguments.push(self.parse_expression()?);

                            if self.expect_comma_or_right_paren("argument")? == Punctuator::RightParenthesis {
                                break;
                            }
                        }
                    }

                    AccessorKind::Call(arguments)
                }

                Punctuator::LeftSquareBracket => {
                    _ = self.consume_token()?;
                    let index = self.parse_expression()?;
                    self.expect_punctuator(Punctuator::RightSquareBracket, "index")?;
                    AccessorKind::Index(Box::new(index))
                }

                Punctuator::Period => {
                    _ = self.consume_token()?;
                    AccessorKind::Member(self.expect_identifier("period")?)
                }

                Punctuator::AtSign => {
                    _ = self.consume_token()?;
                    AccessorKind::Dereference
                }

                _ => break,
            };

            let range = FileRange::new(accessor_start, self.token_end);
            variable.accessors.push(Ranged::new(range, Accessor::new(kind)));
        }

        Ok(Ranged::new(FileRange::new(start, self.token_end), variable))
    }

    fn parse_constructor(&mut self) -> ParseResult<ConstructorExpression> {
        let ty = self.expect_identifier("constructor")?;
        self.expect_punctuator(Punctuator::ExclamationMark, "constructor type")?;
        self.expect_punctuator(Punctuator::LeftCurlyBracket, "constructor type")?;

        let mut arguments = Vec::new();
        loop {
            if self.peek_punctuator() == Some(Punctuator::RightCurlyBracket) {
                _ = self.consume_token()?;
                break;
            }

            let name = match self.peek_token()?.as_identifier() {
                Some(name) if self.peek_punctuator_at(1) == Some(Punctuator::Assignment) => {
                    _ = self.consume_token()?;
                    _ = self.consume_token()?;
                    Some(name)
                }
                _ => None,
            };

            let value = self.parse_expression()?;
            arguments.push(ConstructorArgument { name, value });

            let token = self.consume_token()?;
            match token.kind {
                TokenKind::Punctuator(Punctuator::Comma) => continue,
                TokenKind::Punctuator(Punctuator::RightCurlyBracket) => break,
                _ => {
                    self.emit_diagnostic(ParseDiagnostic::ExpectedPunctuator {
                        token,
                        expected: Punctuator::RightCurlyBracket,
                        context: "constructor argument",
                    });
                    return Err(ParseError::Reported);
                }
            }
        }

        Ok(ConstructorExpression { ty, arguments })
    }

    fn can_start_expression(&self) -> bool {
        let Ok(token) = self.peek_token() else {
            return false;
        };

        match &token.kind {
            TokenKind::Integer(..) | TokenKind::Float(..) | TokenKind::StringLiteral(..) | TokenKind::Identifier(..) => true,
            TokenKind::Keyword(keyword) => matches!(keyword, Keyword::True | Keyword::False | Keyword::Null | Keyword::Not),
            TokenKind::Punctuator(punctuator) => matches!(punctuator,
                Punctuator::LeftParenthesis
                | Punctuator::LeftSquareBracket
                | Punctuator::Asterisk
                | Punctuator::AtSign
                | Punctuator::ExclamationMark
                | Punctuator::HyphenMinus
                | Punctuator::Ampersand
            ),
            TokenKind::IllegalCharacter(..) => false,
        }
    }

    fn peek_token(&self) -> ParseResult<&Token> {
        match self.tokens.get(self.cursor) {
            Some(token) => Ok(token),
            None => Err(ParseError::EndOfFile),
        }
    }

    fn peek_punctuator(&self) -> Option<Punctuator> {
        self.peek_punctuator_at(0)
    }

    fn peek_punctuator_at(&self, offset: usize) -> Option<Punctuator> {
        match self.tokens.get(self.cursor + offset)?.kind {
            TokenKind::Punctuator(punctuator) => Some(punctuator),
            _ => None,
        }
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        let Ok(token) = self.peek_token() else { return None };
        match token.kind {
            TokenKind::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }

    fn consume_token(&mut self) -> ParseResult<Token> {
        let token = self.peek_token()?.clone();
        self.token_begin = token.begin;
        self.token_end = token.end;
        self.cursor += 1;
        Ok(token)
    }

    fn expect_punctuator(&mut self, expected: Punctuator, context: &'static str) -> ParseResult<FileRange> {
        let token = self.consume_token()?;
        let range = token.range();

        if token.kind != TokenKind::Punctuator(expected) {
            self.emit_diagnostic(ParseDiagnostic::ExpectedPunctuator { token, expected, context });
            return Err(ParseError::Reported);
        }

        Ok(range)
    }

    fn expect_comma_or_right_paren(&mut self, context: &'static str) -> ParseResult<Punctuator> {
        let token = self.consume_token()?;

        match token.kind {
            TokenKind::Punctuator(punctuator @ (Punctuator::Comma | Punctuator::RightParenthesis)) => Ok(punctuator),
            _ => {
                self.emit_diagnostic(ParseDiagnostic::ExpectedPunctuator {
                    token,
                    expected: Punctuator::RightParenthesis,
                    context,
                });
                Err(ParseError::Reported)
            }
        }
    }

    fn expect_keyword(&mut self, expected: Keyword, context: &'static str) -> ParseResult<()> {
        let token = self.consume_token()?;

        if token.kind != TokenKind::Keyword(expected) {
            self.emit_diagnostic(ParseDiagnostic::ExpectedKeyword { token, expected, context });
            return Err(ParseError::Reported);
        }

        Ok(())
    }

    fn expect_identifier(&mut self, context: &'static str) -> ParseResult<Ranged<BorString>> {
        let token = self.consume_token()?;

        match token.as_identifier() {
            Some(identifier) => Ok(identifier),
            None => {
                self.emit_diagnostic(ParseDiagnostic::ExpectedIdentifier { token, context });
                Err(ParseError::Reported)
            }
        }
    }

    fn expect_string_literal(&mut self, context: &'static str) -> ParseResult<Ranged<BorString>> {
        let token = self.consume_token()?;

        match &token.kind {
            TokenKind::StringLiteral(str) => Ok(Ranged::new(token.range(), str.clone())),
            _ => {
                self.emit_diagnostic(ParseDiagnostic::ExpectedStringLiteral { token, context });
                Err(ParseError::Reported)
            }
        }
    }

    fn emit_diagnostic(&mut self, error: ParseDiagnostic) {
        log::trace!("Parse diagnostic: {error}");
        self.diagnostics.push(error);
    }
}

fn logical_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Keyword(Keyword::And) => Some(BinaryOperator::And),
        TokenKind::Keyword(Keyword::Or) => Some(BinaryOperator::Or),
        TokenKind::Keyword(Keyword::Xor) => Some(BinaryOperator::Xor),
        _ => None,
    }
}

fn comparison_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    let TokenKind::Punctuator(punctuator) = kind else { return None };
    match punctuator {
        Punctuator::Equals => Some(BinaryOperator::Equal),
        Punctuator::NotEquals => Some(BinaryOperator::NotEqual),
        Punctuator::LessThan => Some(BinaryOperator::Less),
        Punctuator::LessThanOrEqual => Some(BinaryOperator::LessOrEqual),
        Punctuator::GreaterThan => Some(BinaryOperator::Greater),
        Punctuator::GreaterThanOrEqual => Some(BinaryOperator::GreaterOrEqual),
        _ => None,
    }
}

fn additive_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Punctuator(Punctuator::PlusSign) => Some(BinaryOperator::Add),
        TokenKind::Punctuator(Punctuator::HyphenMinus) => Some(BinaryOperator::Subtract),
        _ => None,
    }
}

fn multiplicative_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Punctuator(Punctuator::Asterisk) => Some(BinaryOperator::Multiply),
        TokenKind::Punctuator(Punctuator::Solidus) => Some(BinaryOperator::Divide),
        TokenKind::Punctuator(Punctuator::PercentageSign) => Some(BinaryOperator::Modulo),
        TokenKind::Punctuator(Punctuator::DoublePercentageSign) => Some(BinaryOperator::FlooredModulo),
        _ => None,
    }
}

#[derive(Clone, Debug, thiserror::Error, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ParseDiagnostic {
    #[error("Expected `fn`, `cfn`, `type`, `link` or `embed`, but got: {token}")]
    ExpectedDeclaration { token: Token },

    #[error("Expected an identifier after {context}, but got: {token}")]
    ExpectedIdentifier { token: Token, context: &'static str },

    #[error("Expected {} `{}` after {context}, but got: {token}", Into::<&'static str>::into(*expected), expected.as_str())]
    ExpectedPunctuator { token: Token, expected: Punctuator, context: &'static str },

    #[error("Expected keyword `{}` after {context}, but got: {token}", expected.as_ref())]
    ExpectedKeyword { token: Token, expected: Keyword, context: &'static str },

    #[error("Expected a string after `{context}`, but got: {token}")]
    ExpectedStringLiteral { token: Token, context: &'static str },

    #[error("Expected a type, but got: {token}")]
    ExpectedType { token: Token },

    #[error("Expected a statement, but got: {token}")]
    ExpectedStatement { token: Token },

    #[error("Unknown start of an expression: {token}")]
    UnknownStartOfExpression { token: Token },

    #[error("Expected `{{` or `&&` to start the function body, but got: {token}")]
    FunctionBodyExpectedCurlyBracket { token: Token },

    #[error("Array length must be an integer, but got: {token}")]
    InvalidArrayLength { token: Token },

    #[error("Unexpected end of file")]
    UnexpectedEndOfFile { location: FileLocation },
}

impl ParseDiagnostic {
    #[must_use]
    pub fn token(&self) -> Option<&Token> {
        match self {
            Self::ExpectedDeclaration { token } => Some(token),
            Self::ExpectedIdentifier { token, .. } => Some(token),
            Self::ExpectedPunctuator { token, .. } => Some(token),
            Self::ExpectedKeyword { token, .. } => Some(token),
            Self::ExpectedStringLiteral { token, .. } => Some(token),
            Self::ExpectedType { token } => Some(token),
            Self::ExpectedStatement { token } => Some(token),
            Self::UnknownStartOfExpression { token } => Some(token),
            Self::FunctionBodyExpectedCurlyBracket { token } => Some(token),
            Self::InvalidArrayLength { token } => Some(token),
            Self::UnexpectedEndOfFile { .. } => None,
        }
    }

    #[must_use]
    pub fn range(&self) -> FileRange {
        match self {
            Self::UnexpectedEndOfFile { location } => location.as_zero_range(),
            _ => self.token().map(|x| x.range()).unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.as_ref()
    }
}

#[derive(Clone, Debug, thiserror::Error, AsRefStr)]
pub enum ParseError {
    #[error("Unexpected end of file")]
    EndOfFile,

    /// A diagnostic has been emitted and the current declaration is abandoned.
    #[error("Declaration could not be parsed")]
    Reported,
}

#[cfg(test)]
mod tests {
    use crate::{Lexer, SourceCode};

    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(input: &'static str) -> (ParseTree, Vec<ParseDiagnostic>) {
        let source_code = SourceCode::new_test(input);
        let (tokens, errors) = Lexer::new(&source_code).collect_all();
        assert!(errors.is_empty(), "lexer errors: {errors:?}");

        let mut parser = Parser::new(source_code.path().to_path_buf(), &tokens);
        let tree = parser.parse_tree();
        (tree, parser.into_diagnostics())
    }

    fn parse_expression(input: &'static str) -> Ranged<Expression> {
        let source_code = SourceCode::new_test(input);
        let (tokens, _) = Lexer::new(&source_code).collect_all();
        let mut parser = Parser::new(source_code.path().to_path_buf(), &tokens);
        let expression = parser.parse_expression().unwrap();
        assert!(parser.is_at_end(), "residual tokens after {expression:?}");
        expression
    }

    fn binary_operator(expression: &Expression) -> BinaryOperator {
        match &expression.kind {
            ExpressionKind::Binary(binary) => *binary.operator.value(),
            kind => panic!("not a binary expression: {kind:?}"),
        }
    }

    #[rstest]
    #[case("1 + 2 * 3", BinaryOperator::Add)]
    #[case("1 * 2 + 3", BinaryOperator::Add)]
    #[case("a < b and c", BinaryOperator::And)]
    #[case("a + 1 == b", BinaryOperator::Equal)]
    #[case("a %% b", BinaryOperator::FlooredModulo)]
    #[case("x xor y or z", BinaryOperator::Or)]
    fn precedence(#[case] input: &'static str, #[case] root: BinaryOperator) {
        let expression = parse_expression(input);
        assert_eq!(binary_operator(&expression), root);
    }

    #[test]
    fn accessor_chain() {
        let expression = parse_expression("list[i].next@.value(1, 2)");
        let ExpressionKind::Variable(variable) = &expression.kind else {
            panic!("expected a variable, got {expression:?}");
        };

        assert_eq!(variable.name.value(), "list");
        assert_eq!(variable.accessors.len(), 5);
        assert!(matches!(variable.accessors[0].kind, AccessorKind::Index(..)));
        assert!(matches!(variable.accessors[1].kind, AccessorKind::Member(..)));
        assert!(matches!(variable.accessors[2].kind, AccessorKind::Dereference));
        assert!(matches!(variable.accessors[3].kind, AccessorKind::Member(..)));
        assert!(variable.ends_in_call());
    }

    #[test]
    fn named_constructor() {
        let expression = parse_expression("Point!{y = 2, x = 1}");
        let ExpressionKind::Constructor(constructor) = &expression.kind else {
            panic!("expected a constructor, got {expression:?}");
        };

        assert_eq!(constructor.ty.value(), "Point");
        let names: Vec<_> = constructor.arguments.iter()
            .map(|x| x.name.as_ref().map(|x| x.value().to_string()))
            .collect();
        assert_eq!(names, vec![Some("y".to_string()), Some("x".to_string())]);
    }

    #[test]
    fn positional_constructor() {
        let expression = parse_expression("Point!{1, 2}");
        let ExpressionKind::Constructor(constructor) = &expression.kind else {
            panic!("expected a constructor, got {expression:?}");
        };

        assert!(constructor.arguments.iter().all(|x| x.name.is_none()));
    }

    #[test]
    fn conversion_binds_tighter_than_binary() {
        let expression = parse_expression("a -> double + 1.5");
        let ExpressionKind::Binary(binary) = &expression.kind else {
            panic!("expected a binary expression, got {expression:?}");
        };

        assert!(matches!(binary.lhs.kind, ExpressionKind::Conversion { .. }));
    }

    #[rstest]
    #[case("-a", UnaryOperator::Negate)]
    #[case("not a", UnaryOperator::Not)]
    #[case("!a", UnaryOperator::Not)]
    #[case("&a", UnaryOperator::ManualRelease)]
    fn unary(#[case] input: &'static str, #[case] expected: UnaryOperator) {
        let expression = parse_expression(input);
        let ExpressionKind::Unary { operator, .. } = &expression.kind else {
            panic!("expected a unary expression, got {expression:?}");
        };
        assert_eq!(*operator.value(), expected);
    }

    #[test]
    fn declarations() {
        let (tree, diagnostics) = parse(r#"
            link "m"
            embed "data.bin" as data
            cfn printf(byte[] format, *) i32
            cfn sqrt from c_sqrt(double) double
            type Point { int x, int y, }
            fn main() int {
                ret 0
            }
        "#);

        assert_eq!(diagnostics.len(), 0, "{diagnostics:#?}");
        assert_eq!(tree.links.len(), 1);
        assert_eq!(tree.embeds[0].name.value(), "data");
        assert_eq!(tree.foreign_functions.len(), 2);
        assert!(tree.foreign_functions[0].is_variadic());
        assert_eq!(tree.foreign_functions[1].link_name(), "c_sqrt");
        assert_eq!(tree.records[0].members.len(), 2);
        assert_eq!(tree.functions[0].return_type.value(), &Type::int());
    }

    #[test]
    fn function_without_return_type_is_void() {
        let (tree, diagnostics) = parse("fn main() { ret }");
        assert!(diagnostics.is_empty());

        let main = &tree.functions[0];
        assert!(main.return_type.is_void());
        assert!(matches!(main.body.statements[0].kind, StatementKind::Return(None)));
    }

    #[test]
    fn statements() {
        let (tree, diagnostics) = parse(r#"
            fn main() {
                let int[] xs = [1, 2, 3]
                let@ int p = 5
                mut p@ = 6
                if xs[0] == 1 call print(xs) else {
                    collect xs
                }
                while true break
                do { continue } while false
                for i from 0 until 10 &&{
                    call print(i)
                }
                {
                    let byte b = 0
                }
            }
        "#);

        assert!(diagnostics.is_empty(), "{diagnostics:#?}");

        let statements = &tree.functions[0].body.statements;
        assert_eq!(statements.len(), 8);
        assert!(matches!(&statements[1].kind, StatementKind::Let(LetStatement { allocate: true, .. })));
        assert!(matches!(&statements[3].kind, StatementKind::If { else_block: Some(..), .. }));

        let StatementKind::For(for_statement) = &statements[6].kind else {
            panic!("expected a for statement");
        };
        assert!(for_statement.body.manual);
    }

    #[test]
    fn array_types() {
        let (tree, diagnostics) = parse("fn f(int[4]@ a, byte[][] b) {}");
        assert!(diagnostics.is_empty());

        let parameters = &tree.functions[0].parameters;
        assert_eq!(parameters[0].ty.to_string(), "int[4]@");
        assert_eq!(parameters[1].ty.to_string(), "byte[][]");
    }

    #[test]
    fn recovers_at_next_declaration() {
        let (tree, diagnostics) = parse(r#"
            fn broken( {
                ret
            }
            fn main() {}
        "#);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].name(), "expected-type");
        assert_eq!(tree.functions.len(), 1);
        assert_eq!(tree.functions[0].name.value(), "main");
    }

    #[test]
    fn end_of_file_inside_body() {
        let (_, diagnostics) = parse("fn main() { let int x = 1");
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0], ParseDiagnostic::UnexpectedEndOfFile { .. }));
    }

    #[test]
    fn stray_token_at_top_level() {
        let (tree, diagnostics) = parse("ret fn main() {}");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].name(), "expected-declaration");
        assert_eq!(tree.functions.len(), 1);
    }
}
