// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::{Display, Write};

use crate::BorString;

/// A structural type: a base name with modifiers applied from left to right,
/// so `int[]@` is a pointer to a dynamic array of `int`.
#[derive(Debug, Clone)]
pub enum Type {
    /// The result of a failed inference. Never equal to any type.
    Invalid,

    Named {
        name: BorString,
        modifiers: Vec<TypeModifier>,
    },
}

impl Type {
    pub const INT: &'static str = "int";
    pub const I32: &'static str = "i32";
    pub const BYTE: &'static str = "byte";
    pub const BOOL: &'static str = "bool";
    pub const DOUBLE: &'static str = "double";
    pub const FLOAT: &'static str = "float";
    pub const VOID: &'static str = "void";

    #[must_use]
    pub fn new(name: impl Into<BorString>) -> Self {
        Self::Named {
            name: name.into(),
            modifiers: Vec::new(),
        }
    }

    #[must_use]
    pub fn int() -> Self {
        Self::new(Self::INT)
    }

    #[must_use]
    pub fn i32() -> Self {
        Self::new(Self::I32)
    }

    #[must_use]
    pub fn byte() -> Self {
        Self::new(Self::BYTE)
    }

    #[must_use]
    pub fn bool() -> Self {
        Self::new(Self::BOOL)
    }

    #[must_use]
    pub fn double() -> Self {
        Self::new(Self::DOUBLE)
    }

    #[must_use]
    pub fn float() -> Self {
        Self::new(Self::FLOAT)
    }

    #[must_use]
    pub fn void() -> Self {
        Self::new(Self::VOID)
    }

    /// `byte[]`, the type of string literals and embedded files.
    #[must_use]
    pub fn byte_array() -> Self {
        Self::byte().with_modifier(TypeModifier::Array(ArrayLength::Dynamic))
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Named { .. })
    }

    /// `None` for the invalid type, so inference failures can be propagated
    /// with `?`.
    #[must_use]
    pub fn into_valid(self) -> Option<Self> {
        match self {
            Self::Invalid => None,
            ty => Some(ty),
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&BorString> {
        match self {
            Self::Invalid => None,
            Self::Named { name, .. } => Some(name),
        }
    }

    #[must_use]
    pub fn modifiers(&self) -> &[TypeModifier] {
        match self {
            Self::Invalid => &[],
            Self::Named { modifiers, .. } => modifiers,
        }
    }

    #[must_use]
    pub fn last_modifier(&self) -> Option<&TypeModifier> {
        self.modifiers().last()
    }

    /// Returns a copy with `modifier` appended. Appending to the invalid type
    /// keeps it invalid.
    #[must_use]
    pub fn with_modifier(&self, modifier: TypeModifier) -> Self {
        match self {
            Self::Invalid => Self::Invalid,
            Self::Named { name, modifiers } => {
                let mut modifiers = modifiers.clone();
                modifiers.push(modifier);
                Self::Named { name: name.clone(), modifiers }
            }
        }
    }

    /// Returns a copy with the trailing modifier removed, or the invalid type
    /// if there is none.
    #[must_use]
    pub fn without_last_modifier(&self) -> Self {
        match self {
            Self::Named { name, modifiers } if !modifiers.is_empty() => {
                let mut modifiers = modifiers.clone();
                modifiers.pop();
                Self::Named { name: name.clone(), modifiers }
            }
            _ => Self::Invalid,
        }
    }

    /// Whether this is the base type `name` without any modifiers.
    #[must_use]
    pub fn is_plain(&self, name: &str) -> bool {
        match self {
            Self::Named { name: n, modifiers } => modifiers.is_empty() && n == name,
            Self::Invalid => false,
        }
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        self.is_plain(Self::VOID)
    }

    #[must_use]
    pub fn is_pointer(&self) -> bool {
        matches!(self.last_modifier(), Some(TypeModifier::Pointer))
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.last_modifier(), Some(TypeModifier::Array(..)))
    }

    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self.last_modifier(), Some(TypeModifier::Function(..)))
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.is_plain(Self::INT) || self.is_plain(Self::I32) || self.is_plain(Self::BYTE)
    }

    #[must_use]
    pub fn is_floating_point(&self) -> bool {
        self.is_plain(Self::DOUBLE) || self.is_plain(Self::FLOAT)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating_point()
    }

    #[must_use]
    pub fn function(&self) -> Option<&FunctionModifier> {
        match self.last_modifier() {
            Some(TypeModifier::Function(function)) => Some(function),
            _ => None,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Named { name: a, modifiers: ma }, Self::Named { name: b, modifiers: mb }) => {
                a == b
                    && ma.len() == mb.len()
                    && ma.iter().zip(mb).all(|(a, b)| is_assignable_modifier(a, b))
            }
            _ => false,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self::Named { name, modifiers } = self else {
            return f.write_str("<invalid>");
        };

        f.write_str(name)?;

        for modifier in modifiers {
            modifier.fmt(f)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum TypeModifier {
    Function(FunctionModifier),
    Array(ArrayLength),
    Pointer,
}

impl Display for TypeModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function(function) => {
                f.write_char('(')?;
                for (idx, parameter) in function.parameters.iter().enumerate() {
                    if idx != 0 {
                        f.write_str(", ")?;
                    }
                    parameter.fmt(f)?;
                }

                if function.variadic {
                    if !function.parameters.is_empty() {
                        f.write_str(", ")?;
                    }
                    f.write_str("...")?;
                }

                f.write_char(')')
            }
            Self::Array(ArrayLength::Dynamic) => f.write_str("[]"),
            Self::Array(ArrayLength::Fixed(length)) => f.write_fmt(format_args!("[{length}]")),
            Self::Pointer => f.write_char('@'),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionModifier {
    pub parameters: Vec<Type>,
    pub variadic: bool,
    pub foreign: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLength {
    Dynamic,
    Fixed(u64),
}

/// Modifier compatibility used by type equality. Function modifiers compare
/// their parameter types positionally, arrays match when either side is
/// dynamic or the lengths agree.
#[must_use]
pub fn is_assignable_modifier(a: &TypeModifier, b: &TypeModifier) -> bool {
    match (a, b) {
        (TypeModifier::Function(a), TypeModifier::Function(b)) => {
            a.parameters.len() == b.parameters.len()
                && a.variadic == b.variadic
                && a.parameters.iter().zip(&b.parameters).all(|(a, b)| a == b)
        }

        (TypeModifier::Array(a), TypeModifier::Array(b)) => match (a, b) {
            (ArrayLength::Dynamic, _) | (_, ArrayLength::Dynamic) => true,
            (ArrayLength::Fixed(a), ArrayLength::Fixed(b)) => a == b,
        },

        (TypeModifier::Pointer, TypeModifier::Pointer) => true,

        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn function(ret: Type, parameters: Vec<Type>) -> Type {
        ret.with_modifier(TypeModifier::Function(FunctionModifier {
            parameters,
            variadic: false,
            foreign: false,
        }))
    }

    #[test]
    fn invalid_is_never_equal() {
        assert_ne!(Type::Invalid, Type::Invalid);
        assert_ne!(Type::Invalid, Type::int());
        assert_ne!(Type::int(), Type::Invalid);
    }

    #[test]
    fn function_equality_is_structural() {
        let a = function(Type::bool(), vec![Type::int(), Type::int()]);
        let b = function(Type::bool(), vec![Type::int(), Type::int()]);
        let c = function(Type::bool(), vec![Type::int(), Type::int(), Type::int()]);
        let d = function(Type::bool(), vec![Type::int(), Type::i32()]);

        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_eq!(a, a.clone());
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[rstest]
    #[case(ArrayLength::Dynamic, ArrayLength::Fixed(4), true)]
    #[case(ArrayLength::Fixed(4), ArrayLength::Dynamic, true)]
    #[case(ArrayLength::Fixed(4), ArrayLength::Fixed(4), true)]
    #[case(ArrayLength::Fixed(4), ArrayLength::Fixed(5), false)]
    fn array_compatibility(#[case] a: ArrayLength, #[case] b: ArrayLength, #[case] expected: bool) {
        let a = Type::int().with_modifier(TypeModifier::Array(a));
        let b = Type::int().with_modifier(TypeModifier::Array(b));
        assert_eq!(a == b, expected);
    }

    #[test]
    fn modifier_order_matters() {
        let pointer_to_array = Type::int()
            .with_modifier(TypeModifier::Array(ArrayLength::Dynamic))
            .with_modifier(TypeModifier::Pointer);
        let array_of_pointers = Type::int()
            .with_modifier(TypeModifier::Pointer)
            .with_modifier(TypeModifier::Array(ArrayLength::Dynamic));

        assert_ne!(pointer_to_array, array_of_pointers);
        assert_eq!(pointer_to_array.to_string(), "int[]@");
        assert_eq!(array_of_pointers.to_string(), "int@[]");
    }

    #[test]
    fn stripping_modifiers_copies() {
        let array = Type::int().with_modifier(TypeModifier::Array(ArrayLength::Fixed(3)));
        let element = array.without_last_modifier();

        assert_eq!(element, Type::int());
        assert_eq!(array.to_string(), "int[3]");
        assert!(!Type::int().without_last_modifier().is_valid());
    }
}
