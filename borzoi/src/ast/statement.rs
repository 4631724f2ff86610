// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use crate::{BorString, FileRange, Ranged, Type};

use super::{Expression, VariableReference};

#[derive(Debug, Clone)]
pub struct Statement {
    pub range: FileRange,
    pub kind: StatementKind,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Let(LetStatement),

    Mut {
        target: Ranged<VariableReference>,
        value: Ranged<Expression>,
    },

    Call(Ranged<Expression>),
    Collect(Ranged<Expression>),

    Return(Option<Ranged<Expression>>),
    Break,
    Continue,

    If {
        condition: Ranged<Expression>,
        then_block: Block,
        else_block: Option<Block>,
    },

    While {
        condition: Ranged<Expression>,
        body: Block,
    },

    DoWhile {
        body: Block,
        condition: Ranged<Expression>,
    },

    For(ForStatement),

    Block(Block),
}

#[derive(Debug, Clone)]
pub struct LetStatement {
    pub ty: Ranged<Type>,
    pub name: Ranged<BorString>,

    /// `let@`: the value lives on the heap and the variable holds `ty@`.
    pub allocate: bool,
    pub value: Ranged<Expression>,
    pub mangled: Option<BorString>,
}

/// `for i from a until b`, counting `i` up from `a` while it stays below `b`.
#[derive(Debug, Clone)]
pub struct ForStatement {
    pub iterator: Ranged<BorString>,
    pub from: Ranged<Expression>,
    pub until: Ranged<Expression>,
    pub body: Block,
    pub mangled: Option<BorString>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub range: FileRange,
    pub statements: Vec<Statement>,

    /// A `&&` block does not open a collection frame.
    pub manual: bool,
}

impl Block {
    #[must_use]
    pub fn ends_in_return(&self) -> bool {
        matches!(self.statements.last().map(|x| &x.kind), Some(StatementKind::Return(..)))
    }
}
