// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Placement of arguments and return values for calls into C.

use borzoi::{align_up, EightbyteClass, LayoutRecord, Type};

use crate::CallingConvention;

use super::{Amd64Register, FloatPrecision, XmmRegister};

/// What the placement of a value depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueShape {
    pub size: usize,
    pub classes: Vec<EightbyteClass>,

    /// Set for the scalar `float` and `double` types.
    pub float: Option<FloatPrecision>,
}

impl ValueShape {
    #[must_use]
    pub fn new(ty: &Type, layout: &LayoutRecord) -> Self {
        let float = if ty.is_plain(Type::DOUBLE) {
            Some(FloatPrecision::Double)
        } else if ty.is_plain(Type::FLOAT) {
            Some(FloatPrecision::Single)
        } else {
            None
        };

        Self {
            size: layout.size,
            classes: layout.classes.clone(),
            float,
        }
    }

    #[must_use]
    pub fn int() -> Self {
        Self {
            size: 8,
            classes: vec![EightbyteClass::Integer],
            float: None,
        }
    }

    #[must_use]
    pub fn double() -> Self {
        Self {
            size: 8,
            classes: vec![EightbyteClass::Sse],
            float: Some(FloatPrecision::Double),
        }
    }

    fn is_memory(&self) -> bool {
        self.size > 16 || self.classes.first() == Some(&EightbyteClass::Memory)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignArgument {
    pub shape: ValueShape,

    /// Passed in the `*` tail of a variadic function.
    pub variadic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterSlot {
    General(Amd64Register),
    Vector(XmmRegister),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPlacement {
    Register(Amd64Register),
    Stack { offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentPlacement {
    /// One register per eightbyte.
    Registers(Vec<RegisterSlot>),

    /// A variadic floating-point value passed in both register files.
    Duplicated { vector: XmmRegister, general: Amd64Register },

    /// Copied to `[rsp + offset]` at the call.
    Stack { offset: usize },

    /// Copied to the copy area at `copy_offset`, with a pointer to the copy
    /// passed in its place.
    Reference { copy_offset: usize, pointer: PointerPlacement },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnPlacement {
    Void,
    Registers(Vec<RegisterSlot>),

    /// The caller passes the address of the result in the first argument
    /// register.
    Hidden(Amd64Register),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignCallPlan {
    pub return_value: ReturnPlacement,
    pub arguments: Vec<ArgumentPlacement>,

    /// Bytes at the bottom of the call area, including the shadow space.
    pub stack_size: usize,

    /// Bytes above the stack area holding copies of by-reference arguments.
    pub copies_size: usize,

    /// The number of vector registers used, passed in `al` under System V.
    pub vector_registers: usize,
}

impl ForeignCallPlan {
    #[must_use]
    pub const fn area_size(&self) -> usize {
        self.stack_size + self.copies_size
    }
}

#[must_use]
pub fn plan_foreign_call(convention: CallingConvention, arguments: &[ForeignArgument], return_value: Option<&ValueShape>) -> ForeignCallPlan {
    match convention {
        CallingConvention::MicrosoftX64 => plan_microsoft(arguments, return_value),
        CallingConvention::SystemV => plan_system_v(arguments, return_value),
    }
}

const MICROSOFT_SHADOW_SPACE: usize = 32;

fn plan_microsoft(arguments: &[ForeignArgument], return_value: Option<&ValueShape>) -> ForeignCallPlan {
    let mut slot: usize = 0;

    let return_value = match return_value {
        None => ReturnPlacement::Void,
        Some(shape) if shape.size == 0 => ReturnPlacement::Void,
        Some(shape) if !matches!(shape.size, 1 | 2 | 4 | 8) => {
            slot = 1;
            ReturnPlacement::Hidden(Amd64Register::MICROSOFT_ARGUMENTS[0])
        }
        Some(shape) if shape.float.is_some() => ReturnPlacement::Registers(vec![RegisterSlot::Vector(XmmRegister::new(0))]),
        Some(..) => ReturnPlacement::Registers(vec![RegisterSlot::General(Amd64Register::Rax)]),
    };

    let mut copies_size = 0;
    let mut placements = Vec::with_capacity(arguments.len());

    for argument in arguments {
        let by_reference = !matches!(argument.shape.size, 1 | 2 | 4 | 8);
        let stack_offset = MICROSOFT_SHADOW_SPACE + 8 * slot.saturating_sub(4);

        let placement = if by_reference {
            let pointer = match Amd64Register::MICROSOFT_ARGUMENTS.get(slot) {
                Some(register) => PointerPlacement::Register(*register),
                None => PointerPlacement::Stack { offset: stack_offset },
            };

            let placement = ArgumentPlacement::Reference { copy_offset: copies_size, pointer };
            copies_size += align_up(argument.shape.size, 16);
            placement
        } else if let Some(general) = Amd64Register::MICROSOFT_ARGUMENTS.get(slot).copied() {
            let vector = XmmRegister::new(slot as u8);

            match (argument.shape.float, argument.variadic) {
                (Some(..), true) => ArgumentPlacement::Duplicated { vector, general },
                (Some(..), false) => ArgumentPlacement::Registers(vec![RegisterSlot::Vector(vector)]),
                (None, _) => ArgumentPlacement::Registers(vec![RegisterSlot::General(general)]),
            }
        } else {
            ArgumentPlacement::Stack { offset: stack_offset }
        };

        placements.push(placement);
        slot += 1;
    }

    ForeignCallPlan {
        return_value,
        arguments: placements,
        stack_size: align_up(MICROSOFT_SHADOW_SPACE + 8 * slot.saturating_sub(4), 16),
        copies_size,
        vector_registers: 0,
    }
}

const SYSTEM_V_VECTOR_REGISTERS: usize = 8;

fn plan_system_v(arguments: &[ForeignArgument], return_value: Option<&ValueShape>) -> ForeignCallPlan {
    let mut general = 0;
    let mut vector = 0;

    let return_value = match return_value {
        None => ReturnPlacement::Void,
        Some(shape) if shape.size == 0 => ReturnPlacement::Void,
        Some(shape) if shape.is_memory() => {
            general = 1;
            ReturnPlacement::Hidden(Amd64Register::SYSTEM_V_ARGUMENTS[0])
        }
        Some(shape) => {
            let mut general = [Amd64Register::Rax, Amd64Register::Rdx].into_iter();
            let mut vector = (0..2).map(XmmRegister::new);

            ReturnPlacement::Registers(shape.classes.iter()
                .map(|class| match class {
                    EightbyteClass::Sse => vector.next().map(RegisterSlot::Vector),
                    _ => general.next().map(RegisterSlot::General),
                })
                .map(|slot| match slot {
                    Some(slot) => slot,
                    None => panic!("ICE: return value has more than two eightbytes"),
                })
                .collect())
        }
    };

    let mut stack_offset = 0;
    let mut placements = Vec::with_capacity(arguments.len());

    for argument in arguments {
        let shape = &argument.shape;
        let needed_general = shape.classes.iter().filter(|x| **x == EightbyteClass::Integer).count();
        let needed_vector = shape.classes.iter().filter(|x| **x == EightbyteClass::Sse).count();

        let fits = general + needed_general <= Amd64Register::SYSTEM_V_ARGUMENTS.len()
            && vector + needed_vector <= SYSTEM_V_VECTOR_REGISTERS;

        if shape.is_memory() || !fits {
            placements.push(ArgumentPlacement::Stack { offset: stack_offset });
            stack_offset += align_up(shape.size, 8);
            continue;
        }

        let slots = shape.classes.iter()
            .map(|class| match class {
                EightbyteClass::Sse => {
                    vector += 1;
                    RegisterSlot::Vector(XmmRegister::new(vector as u8 - 1))
                }
                _ => {
                    general += 1;
                    RegisterSlot::General(Amd64Register::SYSTEM_V_ARGUMENTS[general - 1])
                }
            })
            .collect();

        placements.push(ArgumentPlacement::Registers(slots));
    }

    ForeignCallPlan {
        return_value,
        arguments: placements,
        stack_size: align_up(stack_offset, 16),
        copies_size: 0,
        vector_registers: vector,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use Amd64Register::*;

    fn fixed(shape: ValueShape) -> ForeignArgument {
        ForeignArgument { shape, variadic: false }
    }

    fn general(registers: &[Amd64Register]) -> Vec<ArgumentPlacement> {
        registers.iter().map(|x| ArgumentPlacement::Registers(vec![RegisterSlot::General(*x)])).collect()
    }

    fn record(size: usize, classes: Vec<EightbyteClass>) -> ValueShape {
        ValueShape { size, classes, float: None }
    }

    #[test]
    fn five_integers_on_windows() {
        let arguments = vec![fixed(ValueShape::int()); 5];
        let plan = plan_foreign_call(CallingConvention::MicrosoftX64, &arguments, Some(&ValueShape::int()));

        let mut expected = general(&[Rcx, Rdx, R8, R9]);
        expected.push(ArgumentPlacement::Stack { offset: 32 });

        assert_eq!(plan.arguments, expected);
        assert_eq!(plan.stack_size, 48);
        assert_eq!(plan.copies_size, 0);
        assert_eq!(plan.return_value, ReturnPlacement::Registers(vec![RegisterSlot::General(Rax)]));
    }

    #[test]
    fn five_integers_on_system_v() {
        let arguments = vec![fixed(ValueShape::int()); 5];
        let plan = plan_foreign_call(CallingConvention::SystemV, &arguments, Some(&ValueShape::int()));

        assert_eq!(plan.arguments, general(&[Rdi, Rsi, Rdx, Rcx, R8]));
        assert_eq!(plan.stack_size, 0);
        assert_eq!(plan.vector_registers, 0);
    }

    #[test]
    fn variadic_double_is_duplicated_on_windows() {
        let arguments = [
            fixed(record(16, vec![EightbyteClass::Integer, EightbyteClass::Integer])),
            ForeignArgument { shape: ValueShape::double(), variadic: true },
        ];

        let plan = plan_foreign_call(CallingConvention::MicrosoftX64, &arguments, None);

        assert_eq!(plan.arguments, vec![
            ArgumentPlacement::Reference { copy_offset: 0, pointer: PointerPlacement::Register(Rcx) },
            ArgumentPlacement::Duplicated { vector: XmmRegister::new(1), general: Rdx },
        ]);
        assert_eq!(plan.copies_size, 16);
        assert_eq!(plan.stack_size, 32);
        assert_eq!(plan.return_value, ReturnPlacement::Void);
    }

    #[test]
    fn hidden_return_shifts_the_arguments() {
        let large = record(24, vec![EightbyteClass::Memory]);

        let windows = plan_foreign_call(CallingConvention::MicrosoftX64, &[fixed(ValueShape::int())], Some(&large));
        assert_eq!(windows.return_value, ReturnPlacement::Hidden(Rcx));
        assert_eq!(windows.arguments, general(&[Rdx]));

        let system_v = plan_foreign_call(CallingConvention::SystemV, &[fixed(ValueShape::int())], Some(&large));
        assert_eq!(system_v.return_value, ReturnPlacement::Hidden(Rdi));
        assert_eq!(system_v.arguments, general(&[Rsi]));
    }

    #[test]
    fn mixed_classes_on_system_v() {
        let pair = record(16, vec![EightbyteClass::Sse, EightbyteClass::Integer]);
        let plan = plan_foreign_call(CallingConvention::SystemV, &[fixed(ValueShape::double()), fixed(pair.clone())], Some(&pair));

        assert_eq!(plan.arguments, vec![
            ArgumentPlacement::Registers(vec![RegisterSlot::Vector(XmmRegister::new(0))]),
            ArgumentPlacement::Registers(vec![RegisterSlot::Vector(XmmRegister::new(1)), RegisterSlot::General(Rdi)]),
        ]);
        assert_eq!(plan.vector_registers, 2);
        assert_eq!(plan.return_value, ReturnPlacement::Registers(vec![
            RegisterSlot::Vector(XmmRegister::new(0)),
            RegisterSlot::General(Rax),
        ]));
    }

    #[test]
    fn memory_and_overflowing_arguments_go_to_the_stack() {
        let large = record(24, vec![EightbyteClass::Memory]);
        let mut arguments = vec![fixed(large)];
        arguments.extend(vec![fixed(ValueShape::int()); 7]);

        let plan = plan_foreign_call(CallingConvention::SystemV, &arguments, None);

        assert_eq!(plan.arguments[0], ArgumentPlacement::Stack { offset: 0 });
        assert_eq!(plan.arguments[6], ArgumentPlacement::Registers(vec![RegisterSlot::General(R9)]));
        assert_eq!(plan.arguments[7], ArgumentPlacement::Stack { offset: 24 });
        assert_eq!(plan.stack_size, 32);
    }
}
