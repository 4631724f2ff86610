// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::path::PathBuf;

use crate::{BorString, FileRange, FunctionModifier, Ranged, Type, TypeModifier};

use super::Block;

#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub range: FileRange,
    pub name: Ranged<BorString>,
    pub parameters: Vec<Parameter>,

    /// `void` when the declaration names no return type.
    pub return_type: Ranged<Type>,
    pub body: Block,

    /// Every stack-allocated value of the function, filled in by the analyzer.
    pub variables: StackVariables,
}

impl FunctionDeclaration {
    /// The type of the function symbol, `ret(params)`.
    #[must_use]
    pub fn signature(&self) -> Type {
        self.return_type.with_modifier(TypeModifier::Function(FunctionModifier {
            parameters: self.parameters.iter().map(|x| x.ty.value().clone()).collect(),
            variadic: false,
            foreign: false,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub ty: Ranged<Type>,
    pub name: Ranged<BorString>,
}

#[derive(Debug, Clone, Default)]
pub struct StackVariables {
    pub parameters: Vec<StackVariable>,

    /// All locals of the function flattened, including those of nested
    /// blocks, `let@` pointers and loop iterators.
    pub locals: Vec<StackVariable>,
}

impl StackVariables {
    #[must_use]
    pub fn find(&self, mangled_name: &str) -> Option<(&StackVariable, VariableArea)> {
        if let Some(var) = self.parameters.iter().find(|x| x.mangled_name == mangled_name) {
            return Some((var, VariableArea::Parameters));
        }

        self.locals.iter()
            .find(|x| x.mangled_name == mangled_name)
            .map(|var| (var, VariableArea::Locals))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableArea {
    Parameters,
    Locals,
}

#[derive(Debug, Clone)]
pub struct StackVariable {
    pub ty: Type,
    pub mangled_name: BorString,

    /// Assigned by the frame layout pass.
    pub offset: Option<usize>,
}

impl StackVariable {
    #[must_use]
    pub fn new(ty: Type, mangled_name: BorString) -> Self {
        Self {
            ty,
            mangled_name,
            offset: None,
        }
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        match self.offset {
            Some(offset) => offset,
            None => panic!("ICE: stack variable `{}` has no frame offset", self.mangled_name),
        }
    }
}

/// `cfn name from c_name(int, byte[] text, *) int`
#[derive(Debug, Clone)]
pub struct ForeignFunctionDeclaration {
    pub range: FileRange,
    pub name: Ranged<BorString>,
    pub link_name: Option<Ranged<BorString>>,
    pub parameters: Vec<ForeignParameter>,
    pub return_type: Ranged<Type>,
}

impl ForeignFunctionDeclaration {
    /// The symbol name used when linking.
    #[must_use]
    pub fn link_name(&self) -> &BorString {
        match &self.link_name {
            Some(name) => name.value(),
            None => self.name.value(),
        }
    }

    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.parameters.iter().any(|x| matches!(x, ForeignParameter::Variadic(..)))
    }

    #[must_use]
    pub fn signature(&self) -> Type {
        self.return_type.with_modifier(TypeModifier::Function(FunctionModifier {
            parameters: self.parameters.iter()
                .filter_map(|x| match x {
                    ForeignParameter::Typed { ty, .. } => Some(ty.value().clone()),
                    ForeignParameter::Variadic(..) => None,
                })
                .collect(),
            variadic: self.is_variadic(),
            foreign: true,
        }))
    }
}

#[derive(Debug, Clone)]
pub enum ForeignParameter {
    Typed {
        ty: Ranged<Type>,
        name: Option<Ranged<BorString>>,
    },

    /// `*`, accepting any number of further arguments.
    Variadic(FileRange),
}

impl ForeignParameter {
    #[must_use]
    pub fn range(&self) -> FileRange {
        match self {
            Self::Typed { ty, name } => match name {
                Some(name) => ty.range().to(name.range()),
                None => ty.range(),
            },
            Self::Variadic(range) => *range,
        }
    }
}

/// `type Name { int a, byte b }`
#[derive(Debug, Clone)]
pub struct RecordDeclaration {
    pub range: FileRange,
    pub name: Ranged<BorString>,
    pub members: Vec<RecordMember>,
}

#[derive(Debug, Clone)]
pub struct RecordMember {
    pub ty: Ranged<Type>,
    pub name: Ranged<BorString>,
}

/// `embed "path" as name`
#[derive(Debug, Clone)]
pub struct EmbedDeclaration {
    pub range: FileRange,
    pub path: Ranged<BorString>,
    pub name: Ranged<BorString>,

    /// `path` resolved against the directory of the source file.
    pub resolved_path: Option<PathBuf>,
}
