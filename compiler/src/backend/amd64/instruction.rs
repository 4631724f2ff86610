// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use borzoi::BorString;
use strum::AsRefStr;

use super::{Amd64Address, Amd64ConditionCode, Amd64Register, Amd64RegisterNameMode, XmmRegister};

/// A local jump target, unique within one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub usize);

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("_L{}", self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpTarget {
    Label(Label),
    Symbol(BorString),
}

impl From<Label> for JumpTarget {
    fn from(value: Label) -> Self {
        Self::Label(value)
    }
}

impl Display for JumpTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Label(label) => label.fmt(f),
            Self::Symbol(symbol) => f.write_str(symbol),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandSize {
    Byte,
    Word,
    Dword,
    Qword,
}

impl OperandSize {
    #[must_use]
    pub const fn from_bytes(bytes: usize) -> Option<Self> {
        match bytes {
            1 => Some(Self::Byte),
            2 => Some(Self::Word),
            4 => Some(Self::Dword),
            8 => Some(Self::Qword),
            _ => None,
        }
    }

    #[must_use]
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Dword => 4,
            Self::Qword => 8,
        }
    }

    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Word => "word",
            Self::Dword => "dword",
            Self::Qword => "qword",
        }
    }

    #[must_use]
    pub const fn name_mode(&self) -> Amd64RegisterNameMode {
        match self {
            Self::Byte => Amd64RegisterNameMode::Byte,
            Self::Word => Amd64RegisterNameMode::Word,
            Self::Dword => Amd64RegisterNameMode::Long,
            Self::Qword => Amd64RegisterNameMode::Quad,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Amd64Operand {
    Register { register: Amd64Register, size: OperandSize },
    Memory { size: OperandSize, address: Amd64Address },
    Immediate(i64),
}

impl Amd64Operand {
    #[must_use]
    pub const fn reg64(register: Amd64Register) -> Self {
        Self::Register { register, size: OperandSize::Qword }
    }

    #[must_use]
    pub const fn reg32(register: Amd64Register) -> Self {
        Self::Register { register, size: OperandSize::Dword }
    }

    #[must_use]
    pub const fn reg(register: Amd64Register, size: OperandSize) -> Self {
        Self::Register { register, size }
    }

    #[must_use]
    pub const fn qword(address: Amd64Address) -> Self {
        Self::Memory { size: OperandSize::Qword, address }
    }

    #[must_use]
    pub const fn memory(size: OperandSize, address: Amd64Address) -> Self {
        Self::Memory { size, address }
    }
}

impl From<Amd64Register> for Amd64Operand {
    fn from(value: Amd64Register) -> Self {
        Self::reg64(value)
    }
}

impl From<i64> for Amd64Operand {
    fn from(value: i64) -> Self {
        Self::Immediate(value)
    }
}

impl From<i32> for Amd64Operand {
    fn from(value: i32) -> Self {
        Self::Immediate(value.into())
    }
}

impl Display for Amd64Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register { register, size } => f.write_str(register.name(size.name_mode())),
            Self::Memory { size, address } => f.write_fmt(format_args!("{} {address}", size.keyword())),
            Self::Immediate(value) => value.fmt(f),
        }
    }
}

/// The operand of a scalar SSE move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FloatOperand {
    Xmm(XmmRegister),
    Memory(Amd64Address),
}

impl From<XmmRegister> for FloatOperand {
    fn from(value: XmmRegister) -> Self {
        Self::Xmm(value)
    }
}

impl From<Amd64Address> for FloatOperand {
    fn from(value: Amd64Address) -> Self {
        Self::Memory(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatPrecision {
    Single,
    Double,
}

impl FloatPrecision {
    #[must_use]
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Single => "ss",
            Self::Double => "sd",
        }
    }

    #[must_use]
    pub const fn operand_size(&self) -> OperandSize {
        match self {
            Self::Single => OperandSize::Dword,
            Self::Double => OperandSize::Qword,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ArithmeticOperation {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Cmp,
    Test,
    Mov,
    IMul,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum SseOperation {
    Add,
    Sub,
    Mul,
    Div,
}

/// One line of the text section.
#[derive(Debug, Clone, PartialEq)]
pub enum Amd64Instruction {
    Comment(String),
    Label(Label),

    /// A named global label, such as a function entry.
    Symbol(BorString),

    /// The two-operand integer instructions sharing the `op dst, src` shape.
    Arithmetic { operation: ArithmeticOperation, dst: Amd64Operand, src: Amd64Operand },

    Lea { dst: Amd64Register, address: Amd64Address },

    /// Sign-extends a dword into a 64-bit register.
    Movsxd { dst: Amd64Register, src: Amd64Operand },

    /// Zero-extends a byte or word into a 32-bit register (clearing the upper half).
    Movzx { dst: Amd64Register, src: Amd64Operand },

    CMov { condition: Amd64ConditionCode, dst: Amd64Register, src: Amd64Operand },

    /// <https://www.felixcloutier.com/x86/cwd:cdq:cqo>
    Cqo,
    IDiv { rhs: Amd64Operand },
    Div { rhs: Amd64Operand },

    Neg(Amd64Operand),
    Not(Amd64Operand),
    Inc(Amd64Operand),
    Dec(Amd64Operand),

    /// Complements a single bit, used to flip the sign of floats.
    Btc { dst: Amd64Operand, bit: u8 },

    Push(Amd64Register),
    Pop(Amd64Register),

    Call(JumpTarget),
    Jmp(JumpTarget),
    Jcc { condition: Amd64ConditionCode, location: JumpTarget },
    Ret,

    /// Copies `rcx` bytes from `[rsi]` to `[rdi]`.
    RepMovsb,

    /// `movss`/`movsd` between registers and memory.
    MovFloat { precision: FloatPrecision, dst: FloatOperand, src: FloatOperand },

    MovqToVector { dst: XmmRegister, src: Amd64Register },
    MovqToGeneral { dst: Amd64Register, src: XmmRegister },

    SseArithmetic { operation: SseOperation, precision: FloatPrecision, dst: XmmRegister, src: XmmRegister },

    /// Unordered compare, setting the flags like an unsigned `cmp`.
    Ucomis { precision: FloatPrecision, lhs: XmmRegister, rhs: XmmRegister },

    CvtIntToFloat { precision: FloatPrecision, dst: XmmRegister, src: Amd64Register },

    /// Truncating conversion towards zero.
    CvtFloatToInt { precision: FloatPrecision, dst: Amd64Register, src: XmmRegister },

    /// Converts between the precisions, `from` naming the source precision.
    CvtFloat { from: FloatPrecision, dst: XmmRegister, src: XmmRegister },
}

impl Amd64Instruction {
    #[must_use]
    pub fn mov(dst: impl Into<Amd64Operand>, src: impl Into<Amd64Operand>) -> Self {
        Self::Arithmetic { operation: ArithmeticOperation::Mov, dst: dst.into(), src: src.into() }
    }

    #[must_use]
    pub fn arithmetic(operation: ArithmeticOperation, dst: impl Into<Amd64Operand>, src: impl Into<Amd64Operand>) -> Self {
        Self::Arithmetic { operation, dst: dst.into(), src: src.into() }
    }

    #[must_use]
    pub fn call(symbol: impl Into<BorString>) -> Self {
        Self::Call(JumpTarget::Symbol(symbol.into()))
    }

    #[must_use]
    pub fn jcc(condition: Amd64ConditionCode, location: impl Into<JumpTarget>) -> Self {
        Self::Jcc { condition, location: location.into() }
    }

    #[must_use]
    pub fn jmp(location: impl Into<JumpTarget>) -> Self {
        Self::Jmp(location.into())
    }

    /// Whether this line turns into machine code.
    #[must_use]
    pub const fn is_machine_instruction(&self) -> bool {
        !matches!(self, Self::Comment(..) | Self::Label(..) | Self::Symbol(..))
    }
}

impl Display for Amd64Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Comment(comment) => f.write_fmt(format_args!("; {comment}")),
            Self::Label(label) => f.write_fmt(format_args!("{label}:")),
            Self::Symbol(symbol) => f.write_fmt(format_args!("{symbol}:")),

            Self::Arithmetic { operation, dst, src } => {
                f.write_fmt(format_args!("{} {dst}, {src}", operation.as_ref()))
            }

            Self::Lea { dst, address } => f.write_fmt(format_args!("lea {}, {address}", dst.name64())),
            Self::Movsxd { dst, src } => f.write_fmt(format_args!("movsxd {}, {src}", dst.name64())),
            Self::Movzx { dst, src } => f.write_fmt(format_args!("movzx {}, {src}", dst.name32())),
            Self::CMov { condition, dst, src } => f.write_fmt(format_args!("cmov{condition} {}, {src}", dst.name64())),

            Self::Cqo => f.write_str("cqo"),
            Self::IDiv { rhs } => f.write_fmt(format_args!("idiv {rhs}")),
            Self::Div { rhs } => f.write_fmt(format_args!("div {rhs}")),

            Self::Neg(operand) => f.write_fmt(format_args!("neg {operand}")),
            Self::Not(operand) => f.write_fmt(format_args!("not {operand}")),
            Self::Inc(operand) => f.write_fmt(format_args!("inc {operand}")),
            Self::Dec(operand) => f.write_fmt(format_args!("dec {operand}")),
            Self::Btc { dst, bit } => f.write_fmt(format_args!("btc {dst}, {bit}")),

            Self::Push(register) => f.write_fmt(format_args!("push {register}")),
            Self::Pop(register) => f.write_fmt(format_args!("pop {register}")),

            Self::Call(target) => f.write_fmt(format_args!("call {target}")),
            Self::Jmp(target) => f.write_fmt(format_args!("jmp {target}")),
            Self::Jcc { condition, location } => f.write_fmt(format_args!("j{condition} {location}")),
            Self::Ret => f.write_str("ret"),
            Self::RepMovsb => f.write_str("rep movsb"),

            Self::MovFloat { precision, dst, src } => {
                f.write_fmt(format_args!("mov{} ", precision.suffix()))?;
                write_float_operand(f, dst, *precision)?;
                f.write_str(", ")?;
                write_float_operand(f, src, *precision)
            }

            Self::MovqToVector { dst, src } => f.write_fmt(format_args!("movq {dst}, {src}")),
            Self::MovqToGeneral { dst, src } => f.write_fmt(format_args!("movq {dst}, {src}")),

            Self::SseArithmetic { operation, precision, dst, src } => {
                f.write_fmt(format_args!("{}{} {dst}, {src}", operation.as_ref(), precision.suffix()))
            }

            Self::Ucomis { precision, lhs, rhs } => f.write_fmt(format_args!("ucomi{} {lhs}, {rhs}", precision.suffix())),

            Self::CvtIntToFloat { precision, dst, src } => {
                f.write_fmt(format_args!("cvtsi2{} {dst}, {}", precision.suffix(), src.name64()))
            }

            Self::CvtFloatToInt { precision, dst, src } => {
                f.write_fmt(format_args!("cvtt{}2si {}, {src}", precision.suffix(), dst.name64()))
            }

            Self::CvtFloat { from, dst, src } => match from {
                FloatPrecision::Single => f.write_fmt(format_args!("cvtss2sd {dst}, {src}")),
                FloatPrecision::Double => f.write_fmt(format_args!("cvtsd2ss {dst}, {src}")),
            },
        }
    }
}

fn write_float_operand(f: &mut std::fmt::Formatter<'_>, operand: &FloatOperand, precision: FloatPrecision) -> std::fmt::Result {
    match operand {
        FloatOperand::Xmm(register) => register.fmt(f),
        FloatOperand::Memory(address) => f.write_fmt(format_args!("{} {address}", precision.operand_size().keyword())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Amd64Instruction::mov(Amd64Register::Rax, Amd64Operand::qword(Amd64Address::rsp(16))), "mov rax, qword [rsp + 16]")]
    #[case(Amd64Instruction::mov(Amd64Operand::memory(OperandSize::Byte, Amd64Address::rbp(-8)), Amd64Operand::reg(Amd64Register::Rax, OperandSize::Byte)), "mov byte [rbp - 8], al")]
    #[case(Amd64Instruction::arithmetic(ArithmeticOperation::Sub, Amd64Register::Rsp, 32), "sub rsp, 32")]
    #[case(Amd64Instruction::Movzx { dst: Amd64Register::Rax, src: Amd64Operand::memory(OperandSize::Byte, Amd64Address::rsp(0)) }, "movzx eax, byte [rsp]")]
    #[case(Amd64Instruction::Movsxd { dst: Amd64Register::Rcx, src: Amd64Operand::memory(OperandSize::Dword, Amd64Address::rsp(0)) }, "movsxd rcx, dword [rsp]")]
    #[case(Amd64Instruction::jcc(Amd64ConditionCode::AboveOrEqual, JumpTarget::Symbol("err$bounds".into())), "jae err$bounds")]
    #[case(Amd64Instruction::jmp(Label(3)), "jmp _L3")]
    #[case(Amd64Instruction::MovFloat { precision: FloatPrecision::Single, dst: XmmRegister::new(0).into(), src: Amd64Address::rsp(0).into() }, "movss xmm0, dword [rsp]")]
    #[case(Amd64Instruction::CvtIntToFloat { precision: FloatPrecision::Double, dst: XmmRegister::new(1), src: Amd64Register::Rax }, "cvtsi2sd xmm1, rax")]
    #[case(Amd64Instruction::CvtFloatToInt { precision: FloatPrecision::Single, dst: Amd64Register::Rax, src: XmmRegister::new(0) }, "cvttss2si rax, xmm0")]
    #[case(Amd64Instruction::CvtFloat { from: FloatPrecision::Single, dst: XmmRegister::new(0), src: XmmRegister::new(0) }, "cvtss2sd xmm0, xmm0")]
    #[case(Amd64Instruction::Btc { dst: Amd64Operand::qword(Amd64Address::rsp(0)), bit: 63 }, "btc qword [rsp], 63")]
    #[case(Amd64Instruction::CMov { condition: Amd64ConditionCode::Equal, dst: Amd64Register::Rax, src: Amd64Register::R10.into() }, "cmove rax, r10")]
    fn display(#[case] instruction: Amd64Instruction, #[case] expected: &str) {
        assert_eq!(instruction.to_string(), expected);
    }

    #[test]
    fn labels_are_not_machine_instructions() {
        assert!(!Amd64Instruction::Label(Label(0)).is_machine_instruction());
        assert!(!Amd64Instruction::Comment("x".into()).is_machine_instruction());
        assert!(Amd64Instruction::Ret.is_machine_instruction());
    }
}
