// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use strum::AsRefStr;

use crate::{Type, TypeModifier};

use super::{LayoutError, LayoutMember, LayoutRegistry};

/// The register class of one eightbyte of a value, as used by the System V
/// calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum EightbyteClass {
    Sse,
    Integer,
    Memory,
}

impl EightbyteClass {
    /// Combines two classes sharing an eightbyte. MEMORY wins over INTEGER,
    /// which wins over SSE.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }
}

/// Classifies a record laid out as `members` spanning `size` bytes.
pub(super) fn classify_members(registry: &LayoutRegistry, size: usize, members: &[LayoutMember]) -> Result<Vec<EightbyteClass>, LayoutError> {
    // Anything wider than two eightbytes never travels in registers, so a
    // 24- or 32-byte record is MEMORY as a whole.
    if size > 16 {
        return Ok(vec![EightbyteClass::Memory]);
    }

    let mut leaves = Vec::new();
    for member in members {
        flatten(registry, &member.ty, member.offset, &mut leaves)?;
    }

    let mut classes: Vec<Option<EightbyteClass>> = vec![None; size.div_ceil(8).max(1)];

    // A leaf is at most eight bytes and naturally aligned, so it never
    // straddles two eightbytes and its start offset picks its window.
    for (offset, class) in leaves {
        let Some(window) = classes.get_mut(offset / 8) else {
            continue;
        };

        *window = Some(match *window {
            Some(existing) => existing.merge(class),
            None => class,
        });
    }

    Ok(classes.into_iter()
        .map(|x| x.unwrap_or(EightbyteClass::Integer))
        .collect())
}

fn flatten(registry: &LayoutRegistry, ty: &Type, offset: usize, leaves: &mut Vec<(usize, EightbyteClass)>) -> Result<(), LayoutError> {
    match ty.last_modifier() {
        Some(TypeModifier::Pointer) => leaves.push((offset, EightbyteClass::Integer)),

        Some(TypeModifier::Array(..)) => {
            leaves.push((offset, EightbyteClass::Integer));
            leaves.push((offset + 8, EightbyteClass::Integer));
        }

        Some(TypeModifier::Function(..)) => return Err(LayoutError::NotMaterializable { ty: ty.clone() }),

        None => {
            let layout = registry.layout_of(ty)?;

            if layout.members.is_empty() {
                if layout.size != 0 {
                    leaves.push((offset, layout.classes[0]));
                }
            } else {
                for member in &layout.members {
                    flatten(registry, &member.ty, offset + member.offset, leaves)?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BorString;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use EightbyteClass::*;

    fn classes_of(types: &[Type]) -> Vec<EightbyteClass> {
        let mut registry = LayoutRegistry::new();
        let members: Vec<_> = types.iter()
            .enumerate()
            .map(|(idx, ty)| (BorString::new(format!("m{idx}")), ty.clone()))
            .collect();

        registry.register_type("Test".into(), &members).unwrap().classes.clone()
    }

    #[rstest]
    #[case(&[Type::i32(), Type::i32()], vec![Integer])]
    #[case(&[Type::double()], vec![Sse])]
    #[case(&[Type::float(), Type::float()], vec![Sse])]
    #[case(&[Type::float(), Type::i32()], vec![Integer])]
    #[case(&[Type::double(), Type::int()], vec![Sse, Integer])]
    #[case(&[Type::int(), Type::int(), Type::int()], vec![Memory])]
    #[case(&[Type::int(), Type::int(), Type::int(), Type::int()], vec![Memory])]
    #[case(&[Type::i32(), Type::byte(), Type::byte(), Type::float()], vec![Integer, Sse])]
    #[case(&[Type::byte_array()], vec![Integer, Integer])]
    #[case(&[Type::byte(), Type::double()], vec![Integer, Sse])]
    fn classification(#[case] members: &[Type], #[case] expected: Vec<EightbyteClass>) {
        assert_eq!(classes_of(members), expected);
    }

    #[test]
    fn nested_records_are_flattened() {
        let mut registry = LayoutRegistry::new();
        registry.register_type("Pair".into(), &[
            ("a".into(), Type::float()),
            ("b".into(), Type::float()),
        ]).unwrap();

        let layout = registry.register_type("Outer".into(), &[
            ("pair".into(), Type::new("Pair")),
            ("count".into(), Type::int()),
        ]).unwrap();

        assert_eq!(layout.classes, vec![Sse, Integer]);
    }

    #[test]
    fn merge_order() {
        assert_eq!(Sse.merge(Integer), Integer);
        assert_eq!(Integer.merge(Memory), Memory);
        assert_eq!(Sse.merge(Sse), Sse);
        assert_eq!(Memory.as_ref(), "MEMORY");
    }
}
