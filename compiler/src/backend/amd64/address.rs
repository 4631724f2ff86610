// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::{Display, Write};

use borzoi::BorString;

use super::Amd64Register;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressBase {
    Register(Amd64Register),

    /// A RIP-relative reference to a label, printed as `[rel label]`.
    Symbol(BorString),
}

/// A memory reference in the `[base + index * scale + displacement]` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amd64Address {
    base: AddressBase,
    index: Option<(Amd64Register, u8)>,
    displacement: i64,
}

impl Amd64Address {
    #[must_use]
    pub const fn new(base: Amd64Register) -> Self {
        Self {
            base: AddressBase::Register(base),
            index: None,
            displacement: 0,
        }
    }

    #[must_use]
    pub fn symbol(name: impl Into<BorString>) -> Self {
        Self {
            base: AddressBase::Symbol(name.into()),
            index: None,
            displacement: 0,
        }
    }

    #[must_use]
    pub fn rsp(displacement: usize) -> Self {
        Self::new(Amd64Register::Rsp).with_displacement(displacement as i64)
    }

    #[must_use]
    pub fn rbp(displacement: i64) -> Self {
        Self::new(Amd64Register::Rbp).with_displacement(displacement)
    }

    #[must_use]
    pub fn with_index(self, index: Amd64Register, scale: u8) -> Self {
        debug_assert!(matches!(scale, 1 | 2 | 4 | 8), "invalid scale {scale}");

        Self {
            index: Some((index, scale)),
            ..self
        }
    }

    #[must_use]
    pub fn with_displacement(self, displacement: i64) -> Self {
        Self {
            displacement,
            ..self
        }
    }

    /// Returns the address `bytes` further along.
    #[must_use]
    pub fn offset(&self, bytes: usize) -> Self {
        Self {
            displacement: self.displacement + bytes as i64,
            ..self.clone()
        }
    }

    #[must_use]
    pub const fn base(&self) -> &AddressBase {
        &self.base
    }

    #[must_use]
    pub const fn displacement(&self) -> i64 {
        self.displacement
    }
}

impl Display for Amd64Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_char('[')?;

        match &self.base {
            AddressBase::Register(register) => f.write_str(register.name64())?,
            AddressBase::Symbol(name) => {
                f.write_str("rel ")?;
                f.write_str(name)?;
            }
        }

        if let Some((index, scale)) = self.index {
            f.write_str(" + ")?;
            f.write_str(index.name64())?;

            if scale != 1 {
                f.write_fmt(format_args!(" * {scale}"))?;
            }
        }

        match self.displacement {
            0 => (),
            displacement if displacement < 0 => f.write_fmt(format_args!(" - {}", displacement.unsigned_abs()))?,
            displacement => f.write_fmt(format_args!(" + {displacement}"))?,
        }

        f.write_char(']')
    }
}
