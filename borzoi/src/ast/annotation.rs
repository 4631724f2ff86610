// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use crate::Type;

/// The inferred type of a node. Starts out empty and is filled in exactly
/// once by the analyzer.
#[derive(Debug, Clone, Default)]
pub struct TypeAnnotation(Option<Type>);

impl TypeAnnotation {
    #[must_use]
    pub const fn empty() -> Self {
        Self(None)
    }

    pub fn set(&mut self, ty: Type) {
        debug_assert!(self.0.is_none(), "annotation was already set to {:?}", self.0);
        self.0 = Some(ty);
    }

    #[must_use]
    pub fn get(&self) -> Option<&Type> {
        self.0.as_ref()
    }

    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// The annotated type for code generation, which only ever runs on
    /// fully analyzed trees.
    #[must_use]
    pub fn resolved(&self) -> &Type {
        match &self.0 {
            Some(ty) => ty,
            None => panic!("ICE: expression reached code generation without a type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let annotation = TypeAnnotation::default();
        assert!(!annotation.is_set());
        assert!(annotation.get().is_none());
    }

    #[test]
    fn keeps_the_first_value() {
        let mut annotation = TypeAnnotation::empty();
        annotation.set(Type::int());
        assert_eq!(annotation.resolved(), &Type::int());
    }

    #[test]
    #[should_panic(expected = "ICE")]
    fn resolving_empty_is_a_fault() {
        _ = TypeAnnotation::empty().resolved();
    }
}
