// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use strum::AsRefStr;

use crate::{BorString, IntegerLiteral, Ranged, SymbolKind, Type};

use super::TypeAnnotation;

#[derive(Debug, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub ty: TypeAnnotation,
}

impl Expression {
    #[must_use]
    pub const fn new(kind: ExpressionKind) -> Self {
        Self {
            kind,
            ty: TypeAnnotation::empty(),
        }
    }

    /// Whether this is a variable reference whose final accessor is a call.
    #[must_use]
    pub fn is_call(&self) -> bool {
        match &self.kind {
            ExpressionKind::Variable(variable) => variable.ends_in_call(),
            ExpressionKind::Parenthesized(inner) => inner.is_call(),
            _ => false,
        }
    }
}

impl From<ExpressionKind> for Expression {
    fn from(value: ExpressionKind) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Integer(IntegerLiteral),
    Float(f64),
    Boolean(bool),
    String(BorString),
    Null,

    Variable(VariableReference),
    Parenthesized(Box<Ranged<Expression>>),

    /// `[a, b, c]`
    ArrayLiteral(Vec<Ranged<Expression>>),

    /// `*size`, a heap array whose element type comes from the hint.
    ArrayAllocation(Box<Ranged<Expression>>),

    /// `@variable`
    AddressOf(Box<Ranged<VariableReference>>),

    Unary {
        operator: Ranged<UnaryOperator>,
        operand: Box<Ranged<Expression>>,
    },

    Binary(BinaryExpression),

    /// `expression -> type`
    Conversion {
        expression: Box<Ranged<Expression>>,
        target: Ranged<Type>,
    },

    Constructor(ConstructorExpression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum UnaryOperator {
    Not,
    Negate,
    ManualRelease,
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Not => "not",
            Self::Negate => "-",
            Self::ManualRelease => "&",
        })
    }
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub operator: Ranged<BinaryOperator>,
    pub lhs: Box<Ranged<Expression>>,
    pub rhs: Box<Ranged<Expression>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    FlooredModulo,

    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,

    And,
    Or,
    Xor,
}

impl BinaryOperator {
    #[must_use]
    pub const fn is_comparison(&self) -> bool {
        matches!(self, Self::Equal | Self::NotEqual | Self::Less | Self::LessOrEqual | Self::Greater | Self::GreaterOrEqual)
    }

    #[must_use]
    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Xor)
    }

    /// Operators defined on floating-point operands next to the comparisons.
    #[must_use]
    pub const fn is_floating_arithmetic(&self) -> bool {
        matches!(self, Self::Add | Self::Subtract | Self::Multiply | Self::Divide)
    }

    #[must_use]
    pub const fn is_integer_arithmetic(&self) -> bool {
        self.is_floating_arithmetic() || matches!(self, Self::Modulo | Self::FlooredModulo)
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::FlooredModulo => "%%",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
        })
    }
}

/// A name followed by a chain of accessors, such as `list[i].next@.value`.
#[derive(Debug, Clone)]
pub struct VariableReference {
    pub name: Ranged<BorString>,
    pub accessors: Vec<Ranged<Accessor>>,

    /// The type of the symbol `name` refers to, before any accessor.
    pub base_ty: TypeAnnotation,

    /// Filled in by the analyzer once `name` has been resolved.
    pub binding: Option<Binding>,
}

impl VariableReference {
    #[must_use]
    pub fn new(name: Ranged<BorString>) -> Self {
        Self {
            name,
            accessors: Vec::new(),
            base_ty: TypeAnnotation::empty(),
            binding: None,
        }
    }

    #[must_use]
    pub fn ends_in_call(&self) -> bool {
        matches!(self.accessors.last().map(|x| &x.kind), Some(AccessorKind::Call(..)))
    }

    #[must_use]
    pub fn contains_call(&self) -> bool {
        self.accessors.iter().any(|x| matches!(x.kind, AccessorKind::Call(..)))
    }

    /// The type after every accessor has been applied.
    #[must_use]
    pub fn resolved_type(&self) -> &Type {
        match self.accessors.last() {
            Some(accessor) => accessor.ty.resolved(),
            None => self.base_ty.resolved(),
        }
    }

    #[must_use]
    pub fn binding(&self) -> &Binding {
        match &self.binding {
            Some(binding) => binding,
            None => panic!("ICE: variable `{}` was never resolved", self.name.value()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub mangled: BorString,
    pub kind: SymbolKind,
}

#[derive(Debug, Clone)]
pub struct Accessor {
    pub kind: AccessorKind,

    /// The running type after this accessor has been applied.
    pub ty: TypeAnnotation,
}

impl Accessor {
    #[must_use]
    pub const fn new(kind: AccessorKind) -> Self {
        Self {
            kind,
            ty: TypeAnnotation::empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AccessorKind {
    Call(Vec<Ranged<Expression>>),
    Index(Box<Ranged<Expression>>),
    Dereference,
    Member(Ranged<BorString>),
}

/// `Name!{a, b}` or `Name!{x = a, y = b}`.
#[derive(Debug, Clone)]
pub struct ConstructorExpression {
    pub ty: Ranged<BorString>,
    pub arguments: Vec<ConstructorArgument>,
}

#[derive(Debug, Clone)]
pub struct ConstructorArgument {
    pub name: Option<Ranged<BorString>>,
    pub value: Ranged<Expression>,
}
