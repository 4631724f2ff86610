// Copyright (C) 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use thiserror::Error;

/// The exception code a crashed Windows program exits with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NtStatus {
    #[error("exit code {0:#X}")]
    Unknown(u32),

    #[error("access violation, such as a null pointer dereference")]
    AccessViolation,

    #[error("integer division by zero")]
    IntegerDivideByZero,

    #[error("integer overflow in a division")]
    IntegerOverflow,

    #[error("stack overflow")]
    StackOverflow,
}

impl NtStatus {
    #[must_use]
    pub const fn new(value: u32) -> Self {
        match value {
            0xC0000005 => Self::AccessViolation,
            0xC0000094 => Self::IntegerDivideByZero,
            0xC0000095 => Self::IntegerOverflow,
            0xC00000FD => Self::StackOverflow,
            _ => Self::Unknown(value),
        }
    }

    /// Whether the exit code is an error status rather than a value the
    /// program returned.
    #[must_use]
    pub const fn is_error_code(value: u32) -> bool {
        value & 0xC000_0000 == 0xC000_0000
    }
}

impl From<i32> for NtStatus {
    fn from(value: i32) -> Self {
        Self::new(value as _)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_violation() {
        assert_eq!(NtStatus::from(0xC0000005_u32 as i32), NtStatus::AccessViolation);
        assert!(NtStatus::is_error_code(0xC0000005));
        assert!(!NtStatus::is_error_code(13));
    }
}
