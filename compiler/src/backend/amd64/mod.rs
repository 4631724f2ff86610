// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod address;
mod assembly;
mod call;
mod calling_convention;
mod code_generator;
mod condition_code;
mod expression;
mod frame;
mod instruction;
mod register;
mod runtime;

pub use self::{
    assembly::{
        Assembly,
        DataItem,
    },
    code_generator::CodeGenerator,
    frame::{
        assign_frames,
        FrameLayout,
    },
    instruction::Amd64Instruction,
};

use self::{
    address::Amd64Address,
    condition_code::Amd64ConditionCode,
    instruction::{
        Amd64Operand,
        ArithmeticOperation,
        FloatPrecision,
        JumpTarget,
        Label,
        OperandSize,
        SseOperation,
    },
    register::{
        Amd64Register,
        Amd64RegisterNameMode,
        XmmRegister,
    },
};
