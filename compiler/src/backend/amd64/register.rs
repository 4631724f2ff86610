// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Amd64Register {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl Amd64Register {
    /// Integer argument registers of the System V convention, in order.
    pub const SYSTEM_V_ARGUMENTS: [Self; 6] = [Self::Rdi, Self::Rsi, Self::Rdx, Self::Rcx, Self::R8, Self::R9];

    /// Integer argument registers of the Microsoft x64 convention, in order.
    pub const MICROSOFT_ARGUMENTS: [Self; 4] = [Self::Rcx, Self::Rdx, Self::R8, Self::R9];

    #[must_use]
    pub const fn name64(&self) -> &'static str {
        self.name(Amd64RegisterNameMode::Quad)
    }

    #[must_use]
    pub const fn name32(&self) -> &'static str {
        self.name(Amd64RegisterNameMode::Long)
    }

    #[must_use]
    pub const fn name16(&self) -> &'static str {
        self.name(Amd64RegisterNameMode::Word)
    }

    #[must_use]
    pub const fn name8(&self) -> &'static str {
        self.name(Amd64RegisterNameMode::Byte)
    }

    #[must_use]
    pub const fn name(&self, mode: Amd64RegisterNameMode) -> &'static str {
        match (mode, self) {
            (Amd64RegisterNameMode::Quad, Self::Rax) => "rax",
            (Amd64RegisterNameMode::Long, Self::Rax) => "eax",
            (Amd64RegisterNameMode::Word, Self::Rax) => "ax",
            (Amd64RegisterNameMode::Byte, Self::Rax) => "al",
            (Amd64RegisterNameMode::Quad, Self::Rbx) => "rbx",
            (Amd64RegisterNameMode::Long, Self::Rbx) => "ebx",
            (Amd64RegisterNameMode::Word, Self::Rbx) => "bx",
            (Amd64RegisterNameMode::Byte, Self::Rbx) => "bl",
            (Amd64RegisterNameMode::Quad, Self::Rcx) => "rcx",
            (Amd64RegisterNameMode::Long, Self::Rcx) => "ecx",
            (Amd64RegisterNameMode::Word, Self::Rcx) => "cx",
            (Amd64RegisterNameMode::Byte, Self::Rcx) => "cl",
            (Amd64RegisterNameMode::Quad, Self::Rdx) => "rdx",
            (Amd64RegisterNameMode::Long, Self::Rdx) => "edx",
            (Amd64RegisterNameMode::Word, Self::Rdx) => "dx",
            (Amd64RegisterNameMode::Byte, Self::Rdx) => "dl",
            (Amd64RegisterNameMode::Quad, Self::Rsi) => "rsi",
            (Amd64RegisterNameMode::Long, Self::Rsi) => "esi",
            (Amd64RegisterNameMode::Word, Self::Rsi) => "si",
            (Amd64RegisterNameMode::Byte, Self::Rsi) => "sil",
            (Amd64RegisterNameMode::Quad, Self::Rdi) => "rdi",
            (Amd64RegisterNameMode::Long, Self::Rdi) => "edi",
            (Amd64RegisterNameMode::Word, Self::Rdi) => "di",
            (Amd64RegisterNameMode::Byte, Self::Rdi) => "dil",
            (Amd64RegisterNameMode::Quad, Self::Rbp) => "rbp",
            (Amd64RegisterNameMode::Long, Self::Rbp) => "ebp",
            (Amd64RegisterNameMode::Word, Self::Rbp) => "bp",
            (Amd64RegisterNameMode::Byte, Self::Rbp) => "bpl",
            (Amd64RegisterNameMode::Quad, Self::Rsp) => "rsp",
            (Amd64RegisterNameMode::Long, Self::Rsp) => "esp",
            (Amd64RegisterNameMode::Word, Self::Rsp) => "sp",
            (Amd64RegisterNameMode::Byte, Self::Rsp) => "spl",
            (Amd64RegisterNameMode::Quad, Self::R8) => "r8",
            (Amd64RegisterNameMode::Long, Self::R8) => "r8d",
            (Amd64RegisterNameMode::Word, Self::R8) => "r8w",
            (Amd64RegisterNameMode::Byte, Self::R8) => "r8b",
            (Amd64RegisterNameMode::Quad, Self::R9) => "r9",
            (Amd64RegisterNameMode::Long, Self::R9) => "r9d",
            (Amd64RegisterNameMode::Word, Self::R9) => "r9w",
            (Amd64RegisterNameMode::Byte, Self::R9) => "r9b",
            (Amd64RegisterNameMode::Quad, Self::R10) => "r10",
            (Amd64RegisterNameMode::Long, Self::R10) => "r10d",
            (Amd64RegisterNameMode::Word, Self::R10) => "r10w",
            (Amd64RegisterNameMode::Byte, Self::R10) => "r10b",
            (Amd64RegisterNameMode::Quad, Self::R11) => "r11",
            (Amd64RegisterNameMode::Long, Self::R11) => "r11d",
            (Amd64RegisterNameMode::Word, Self::R11) => "r11w",
            (Amd64RegisterNameMode::Byte, Self::R11) => "r11b",
            (Amd64RegisterNameMode::Quad, Self::R12) => "r12",
            (Amd64RegisterNameMode::Long, Self::R12) => "r12d",
            (Amd64RegisterNameMode::Word, Self::R12) => "r12w",
            (Amd64RegisterNameMode::Byte, Self::R12) => "r12b",
            (Amd64RegisterNameMode::Quad, Self::R13) => "r13",
            (Amd64RegisterNameMode::Long, Self::R13) => "r13d",
            (Amd64RegisterNameMode::Word, Self::R13) => "r13w",
            (Amd64RegisterNameMode::Byte, Self::R13) => "r13b",
            (Amd64RegisterNameMode::Quad, Self::R14) => "r14",
            (Amd64RegisterNameMode::Long, Self::R14) => "r14d",
            (Amd64RegisterNameMode::Word, Self::R14) => "r14w",
            (Amd64RegisterNameMode::Byte, Self::R14) => "r14b",
            (Amd64RegisterNameMode::Quad, Self::R15) => "r15",
            (Amd64RegisterNameMode::Long, Self::R15) => "r15d",
            (Amd64RegisterNameMode::Word, Self::R15) => "r15w",
            (Amd64RegisterNameMode::Byte, Self::R15) => "r15b",
        }
    }
}

impl Display for Amd64Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name(Amd64RegisterNameMode::Quad))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amd64RegisterNameMode {
    Quad,
    Long,
    Word,
    Byte,
}

/// One of `xmm0` to `xmm15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XmmRegister(u8);

impl XmmRegister {
    #[must_use]
    pub const fn new(index: u8) -> Self {
        debug_assert!(index < 16);
        Self(index)
    }

    #[must_use]
    pub const fn index(&self) -> u8 {
        self.0
    }
}

impl Display for XmmRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("xmm{}", self.0))
    }
}
