// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::collections::HashMap;

use strum::AsRefStr;
use thiserror::Error;

use crate::{BorString, RecordDeclaration, Type, TypeModifier};

use super::classification::{classify_members, EightbyteClass};

/// Size, alignment and member placement of a type.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRecord {
    pub size: usize,
    pub alignment: usize,
    pub members: Vec<LayoutMember>,

    /// One class per eightbyte, or a single [`EightbyteClass::Memory`].
    pub classes: Vec<EightbyteClass>,
}

impl LayoutRecord {
    #[must_use]
    pub fn primitive(size: usize, class: EightbyteClass) -> Self {
        Self {
            size,
            alignment: size.max(1),
            members: Vec::new(),
            classes: vec![class],
        }
    }

    /// The `{ptr, len}` record every array and string is represented by.
    #[must_use]
    pub fn array() -> Self {
        Self {
            size: 16,
            alignment: 8,
            members: vec![
                LayoutMember {
                    name: BorString::new_static("ptr"),
                    ty: Type::void().with_modifier(TypeModifier::Pointer),
                    offset: 0,
                },
                LayoutMember {
                    name: BorString::new_static("len"),
                    ty: Type::int(),
                    offset: 8,
                },
            ],
            classes: vec![EightbyteClass::Integer, EightbyteClass::Integer],
        }
    }

    #[must_use]
    pub fn pointer() -> Self {
        Self::primitive(8, EightbyteClass::Integer)
    }

    #[must_use]
    pub fn member(&self, name: &str) -> Option<&LayoutMember> {
        self.members.iter().find(|x| x.name == name)
    }

    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.classes.first() == Some(&EightbyteClass::Memory)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutMember {
    pub name: BorString,
    pub ty: Type,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Error, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum LayoutError {
    #[error("Type `{name}` is already registered")]
    DuplicateType { name: BorString },

    #[error("Type `{ty}` is not known")]
    UnknownType { ty: Type },

    #[error("Type `{ty}` has no memory representation")]
    NotMaterializable { ty: Type },

    #[error("Layout of `{name}` depends on itself")]
    Cycle { name: BorString },
}

/// The per-compilation store of record layouts, keyed by base name.
/// Entries are never removed or replaced.
#[derive(Debug, Clone)]
pub struct LayoutRegistry {
    records: HashMap<BorString, LayoutRecord>,
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut records = HashMap::new();

        let primitives = [
            (Type::INT, 8, EightbyteClass::Integer),
            (Type::I32, 4, EightbyteClass::Integer),
            (Type::BYTE, 1, EightbyteClass::Integer),
            (Type::BOOL, 1, EightbyteClass::Integer),
            (Type::VOID, 0, EightbyteClass::Integer),
            (Type::DOUBLE, 8, EightbyteClass::Sse),
            (Type::FLOAT, 4, EightbyteClass::Sse),
        ];

        for (name, size, class) in primitives {
            records.insert(BorString::new_static(name), LayoutRecord::primitive(size, class));
        }

        Self { records }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LayoutRecord> {
        self.records.get(name)
    }

    /// Registers a record type with its members in declaration order.
    pub fn register_type(&mut self, name: BorString, members: &[(BorString, Type)]) -> Result<&LayoutRecord, LayoutError> {
        if self.contains(&name) {
            return Err(LayoutError::DuplicateType { name });
        }

        let mut offset = 0;
        let mut alignment = 1;
        let mut laid_out = Vec::with_capacity(members.len());

        for (member_name, ty) in members {
            let layout = self.layout_of(ty)?;

            offset = align_up(offset, layout.alignment);
            alignment = alignment.max(layout.alignment);

            laid_out.push(LayoutMember {
                name: member_name.clone(),
                ty: ty.clone(),
                offset,
            });

            offset += layout.size;
        }

        let size = align_up(offset, alignment);
        let classes = classify_members(self, size, &laid_out)?;

        log::trace!("Registered type `{name}` with size {size}, alignment {alignment} and classes {classes:?}");

        let record = LayoutRecord {
            size,
            alignment,
            members: laid_out,
            classes,
        };

        Ok(self.records.entry(name).or_insert(record))
    }

    /// The layout of any materializable type value.
    pub fn layout_of(&self, ty: &Type) -> Result<LayoutRecord, LayoutError> {
        match ty.last_modifier() {
            Some(TypeModifier::Pointer) => return Ok(LayoutRecord::pointer()),
            Some(TypeModifier::Array(..)) => return Ok(LayoutRecord::array()),
            Some(TypeModifier::Function(..)) => return Err(LayoutError::NotMaterializable { ty: ty.clone() }),
            None => (),
        }

        let Some(name) = ty.name() else {
            return Err(LayoutError::UnknownType { ty: ty.clone() });
        };

        self.get(name)
            .cloned()
            .ok_or_else(|| LayoutError::UnknownType { ty: ty.clone() })
    }

    #[must_use]
    pub fn size_of(&self, ty: &Type) -> Option<usize> {
        self.layout_of(ty).ok().map(|x| x.size)
    }

    /// Registers all `records`, deferring each until the layouts its members
    /// depend on are known. Pointer and array members never block, since
    /// their layout does not depend on the element type.
    pub fn register_records(&mut self, records: &[RecordDeclaration]) -> Result<(), Vec<(usize, LayoutError)>> {
        let mut pending: Vec<usize> = (0..records.len()).collect();
        let mut errors = Vec::new();

        loop {
            let before = pending.len();

            pending.retain(|&index| {
                let record = &records[index];
                let ready = record.members.iter().all(|member| {
                    !member.ty.modifiers().is_empty()
                        || member.ty.name().is_some_and(|name| self.contains(name))
                });

                if !ready {
                    return true;
                }

                let members: Vec<_> = record.members.iter()
                    .map(|x| (x.name.value().clone(), x.ty.value().clone()))
                    .collect();

                if let Err(error) = self.register_type(record.name.value().clone(), &members) {
                    errors.push((index, error));
                }

                false
            });

            if pending.is_empty() || pending.len() == before {
                break;
            }
        }

        for index in pending {
            let record = &records[index];
            let missing = record.members.iter()
                .filter(|x| x.ty.modifiers().is_empty())
                .find(|member| {
                    let name = member.ty.name();
                    !name.is_some_and(|name| self.contains(name) || records.iter().any(|x| x.name.value() == name))
                });

            let error = match missing {
                Some(member) => LayoutError::UnknownType { ty: member.ty.value().clone() },
                None => LayoutError::Cycle { name: record.name.value().clone() },
            };

            errors.push((index, error));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            errors.sort_by_key(|(index, _)| *index);
            Err(errors)
        }
    }
}

#[must_use]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return value;
    }

    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileRange, Ranged, RecordMember};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn members(types: &[Type]) -> Vec<(BorString, Type)> {
        types.iter()
            .enumerate()
            .map(|(idx, ty)| (BorString::new(format!("m{idx}")), ty.clone()))
            .collect()
    }

    fn record(name: &'static str, members: &[(&'static str, Type)]) -> RecordDeclaration {
        RecordDeclaration {
            range: FileRange::default(),
            name: Ranged::new(FileRange::default(), BorString::new_static(name)),
            members: members.iter()
                .map(|(name, ty)| RecordMember {
                    ty: Ranged::new(FileRange::default(), ty.clone()),
                    name: Ranged::new(FileRange::default(), BorString::new_static(name)),
                })
                .collect(),
        }
    }

    #[test]
    fn int_i32_i32() {
        let mut registry = LayoutRegistry::new();
        let layout = registry.register_type("A".into(), &members(&[Type::int(), Type::i32(), Type::i32()])).unwrap();

        assert_eq!(layout.size, 16);
        assert_eq!(layout.alignment, 8);
        let offsets: Vec<_> = layout.members.iter().map(|x| x.offset).collect();
        assert_eq!(offsets, vec![0, 8, 12]);
    }

    #[test]
    fn three_i32() {
        let mut registry = LayoutRegistry::new();
        let layout = registry.register_type("B".into(), &members(&[Type::i32(), Type::i32(), Type::i32()])).unwrap();

        assert_eq!(layout.size, 12);
        assert_eq!(layout.alignment, 4);
    }

    #[test]
    fn padding_between_members() {
        let mut registry = LayoutRegistry::new();
        let layout = registry.register_type("C".into(), &members(&[Type::byte(), Type::int(), Type::bool()])).unwrap();

        let offsets: Vec<_> = layout.members.iter().map(|x| x.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16]);
        assert_eq!(layout.size, 24);
    }

    #[rstest]
    #[case(Type::int().with_modifier(TypeModifier::Pointer), 8, 8)]
    #[case(Type::byte_array(), 16, 8)]
    #[case(Type::i32(), 4, 4)]
    #[case(Type::void(), 0, 1)]
    fn synthetic_layouts(#[case] ty: Type, #[case] size: usize, #[case] alignment: usize) {
        let layout = LayoutRegistry::new().layout_of(&ty).unwrap();
        assert_eq!((layout.size, layout.alignment), (size, alignment));
    }

    #[test]
    fn duplicate_registration() {
        let mut registry = LayoutRegistry::new();
        let error = registry.register_type("int".into(), &[]).unwrap_err();
        assert_eq!(error, LayoutError::DuplicateType { name: "int".into() });
    }

    #[test]
    fn unknown_plain_type() {
        let error = LayoutRegistry::new().layout_of(&Type::new("Nope")).unwrap_err();
        assert_eq!(error.as_ref(), "unknown-type");
    }

    #[test]
    fn function_types_are_not_materializable() {
        let ty = Type::int().with_modifier(TypeModifier::Function(crate::FunctionModifier {
            parameters: Vec::new(),
            variadic: false,
            foreign: false,
        }));

        assert!(matches!(LayoutRegistry::new().layout_of(&ty), Err(LayoutError::NotMaterializable { .. })));
    }

    #[test]
    fn records_are_registered_out_of_order() {
        let mut registry = LayoutRegistry::new();
        let records = [
            record("Line", &[("from", Type::new("Point")), ("to", Type::new("Point"))]),
            record("Point", &[("x", Type::int()), ("y", Type::int())]),
        ];

        registry.register_records(&records).unwrap();
        assert_eq!(registry.get("Line").unwrap().size, 32);
    }

    #[test]
    fn self_reference_through_pointer() {
        let mut registry = LayoutRegistry::new();
        let node = Type::new("Node").with_modifier(TypeModifier::Pointer);
        let records = [record("Node", &[("value", Type::int()), ("next", node)])];

        registry.register_records(&records).unwrap();
        assert_eq!(registry.get("Node").unwrap().size, 16);
    }

    #[test]
    fn cycles_are_reported() {
        let mut registry = LayoutRegistry::new();
        let records = [
            record("A", &[("b", Type::new("B"))]),
            record("B", &[("a", Type::new("A"))]),
            record("C", &[("x", Type::new("Missing"))]),
        ];

        let errors = registry.register_records(&records).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].1, LayoutError::Cycle { name: "A".into() });
        assert_eq!(errors[2].1, LayoutError::UnknownType { ty: Type::new("Missing") });
    }
}
