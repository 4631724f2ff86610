// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::collections::HashMap;

use strum::AsRefStr;

use crate::{BorString, FileRange, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SymbolKind {
    Function,
    ForeignFunction,
    Parameter,
    Local,
    Iterator,

    /// A file included at compile time, of type `byte[]`.
    Embed,
}

impl SymbolKind {
    /// Whether values of this symbol live in the frame of a function.
    #[must_use]
    pub const fn is_stack_variable(&self) -> bool {
        matches!(self, Self::Parameter | Self::Local | Self::Iterator)
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: BorString,
    pub mangled: BorString,
    pub ty: Type,
    pub range: FileRange,
    pub kind: SymbolKind,
}

/// The segment kinds a scope path is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SegmentKind {
    If,
    Else,
    While,
    Do,
    For,
    Block,
}

/// The position of a block within its function, e.g. `main$if0$while1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePath {
    segments: Vec<BorString>,
}

impl ScopePath {
    #[must_use]
    pub fn function(name: BorString) -> Self {
        Self {
            segments: vec![name],
        }
    }

    #[must_use]
    pub fn child(&self, kind: SegmentKind, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(BorString::new(format!("{}{index}", kind.as_ref())));
        Self { segments }
    }

    #[must_use]
    pub fn function_name(&self) -> &BorString {
        &self.segments[0]
    }

    #[must_use]
    pub fn mangle(&self, name: &str) -> BorString {
        Self::join(&self.segments, name)
    }

    /// The candidate mangled names for `name`, innermost scope first.
    pub fn candidates<'a>(&'a self, name: &'a str) -> impl Iterator<Item = BorString> + 'a {
        (1..=self.segments.len())
            .rev()
            .map(move |len| Self::join(&self.segments[..len], name))
    }

    fn join(segments: &[BorString], name: &str) -> BorString {
        let mut mangled = String::new();
        for segment in segments {
            mangled.push_str(segment);
            mangled.push('$');
        }
        mangled.push_str(name);
        BorString::new(mangled)
    }
}

impl std::fmt::Display for ScopePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx != 0 {
                f.write_str("$")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// Hands out per-kind indices for the nested scopes of one block.
#[derive(Debug, Default)]
pub struct SegmentCounters {
    counters: HashMap<SegmentKind, usize>,
}

impl SegmentCounters {
    pub fn next(&mut self, kind: SegmentKind) -> usize {
        let counter = self.counters.entry(kind).or_default();
        let index = *counter;
        *counter += 1;
        index
    }
}

/// All symbols of a program, keyed by mangled name.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<BorString, Symbol>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `symbol`, or returns the symbol that already owns its mangled name.
    pub fn declare(&mut self, symbol: Symbol) -> Result<&Symbol, &Symbol> {
        if self.symbols.contains_key(symbol.mangled.as_str()) {
            return Err(&self.symbols[symbol.mangled.as_str()]);
        }

        Ok(self.symbols.entry(symbol.mangled.clone()).or_insert(symbol))
    }

    #[must_use]
    pub fn get(&self, mangled: &str) -> Option<&Symbol> {
        self.symbols.get(mangled)
    }

    /// Resolves `name` from within `scope`, walking outwards until the
    /// function scope and finally the global names.
    #[must_use]
    pub fn resolve(&self, scope: &ScopePath, name: &str) -> Option<&Symbol> {
        scope.candidates(name)
            .find_map(|mangled| self.symbols.get(mangled.as_str()))
            .or_else(|| self.symbols.get(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn symbol(scope: Option<&ScopePath>, name: &'static str, ty: Type, kind: SymbolKind) -> Symbol {
        Symbol {
            name: BorString::new_static(name),
            mangled: match scope {
                Some(scope) => scope.mangle(name),
                None => BorString::new_static(name),
            },
            ty,
            range: FileRange::default(),
            kind,
        }
    }

    #[test]
    fn mangling() {
        let main = ScopePath::function("main".into());
        let nested = main.child(SegmentKind::If, 0).child(SegmentKind::While, 1);

        assert_eq!(main.mangle("x"), "main$x");
        assert_eq!(nested.mangle("x"), "main$if0$while1$x");
        assert_eq!(nested.to_string(), "main$if0$while1");
    }

    #[test]
    fn shadow_then_restore() {
        let mut table = SymbolTable::new();
        let f = ScopePath::function("f".into());
        let inner = f.child(SegmentKind::If, 0);
        let sibling = f.child(SegmentKind::If, 1);

        table.declare(symbol(Some(&f), "x", Type::int(), SymbolKind::Local)).unwrap();
        table.declare(symbol(Some(&inner), "x", Type::bool(), SymbolKind::Local)).unwrap();

        assert_eq!(table.resolve(&inner, "x").unwrap().ty, Type::bool());
        assert_eq!(table.resolve(&inner.child(SegmentKind::Block, 0), "x").unwrap().mangled, "f$if0$x");
        assert_eq!(table.resolve(&f, "x").unwrap().ty, Type::int());
        assert_eq!(table.resolve(&sibling, "x").unwrap().mangled, "f$x");
    }

    #[test]
    fn globals_are_found_last() {
        let mut table = SymbolTable::new();
        let f = ScopePath::function("f".into());

        table.declare(symbol(None, "g", Type::void(), SymbolKind::Function)).unwrap();
        table.declare(symbol(Some(&f), "g", Type::int(), SymbolKind::Local)).unwrap();

        assert_eq!(table.resolve(&f, "g").unwrap().kind, SymbolKind::Local);
        assert_eq!(table.resolve(&ScopePath::function("h".into()), "g").unwrap().kind, SymbolKind::Function);
        assert!(table.resolve(&f, "missing").is_none());
    }

    #[test]
    fn redeclaration_returns_the_original() {
        let mut table = SymbolTable::new();
        let f = ScopePath::function("f".into());

        table.declare(symbol(Some(&f), "x", Type::int(), SymbolKind::Parameter)).unwrap();
        let original = table.declare(symbol(Some(&f), "x", Type::bool(), SymbolKind::Local)).unwrap_err();

        assert_eq!(original.kind, SymbolKind::Parameter);
    }

    #[test]
    fn counters_are_per_kind() {
        let mut counters = SegmentCounters::default();
        assert_eq!(counters.next(SegmentKind::If), 0);
        assert_eq!(counters.next(SegmentKind::While), 0);
        assert_eq!(counters.next(SegmentKind::If), 1);
    }
}
