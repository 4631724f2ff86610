// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod annotation;
mod declaration;
mod expression;
mod statement;

pub use self::{
    annotation::TypeAnnotation,
    declaration::{
        EmbedDeclaration,
        ForeignFunctionDeclaration,
        ForeignParameter,
        FunctionDeclaration,
        Parameter,
        RecordDeclaration,
        RecordMember,
        StackVariable,
        StackVariables,
        VariableArea,
    },
    expression::{
        Accessor,
        AccessorKind,
        BinaryExpression,
        BinaryOperator,
        Binding,
        ConstructorArgument,
        ConstructorExpression,
        Expression,
        ExpressionKind,
        UnaryOperator,
        VariableReference,
    },
    statement::{
        Block,
        ForStatement,
        LetStatement,
        Statement,
        StatementKind,
    },
};
