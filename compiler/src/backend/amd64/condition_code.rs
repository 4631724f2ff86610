// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use borzoi::BinaryOperator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amd64ConditionCode {
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    NotEqual,

    Above,
    AboveOrEqual,
    Below,
    BelowOrEqual,

    Overflow,

    /// Set by `ucomis` when either operand is NaN.
    Parity,
}

impl Amd64ConditionCode {
    /// The condition under which the comparison `lhs <operator> rhs` holds
    /// after `cmp lhs, rhs`. Floating-point comparisons set the flags like
    /// unsigned integers do.
    #[must_use]
    pub const fn for_comparison(operator: BinaryOperator, unsigned: bool) -> Option<Self> {
        Some(match (operator, unsigned) {
            (BinaryOperator::Equal, _) => Self::Equal,
            (BinaryOperator::NotEqual, _) => Self::NotEqual,
            (BinaryOperator::Greater, false) => Self::Greater,
            (BinaryOperator::GreaterOrEqual, false) => Self::GreaterOrEqual,
            (BinaryOperator::Less, false) => Self::Less,
            (BinaryOperator::LessOrEqual, false) => Self::LessOrEqual,
            (BinaryOperator::Greater, true) => Self::Above,
            (BinaryOperator::GreaterOrEqual, true) => Self::AboveOrEqual,
            (BinaryOperator::Less, true) => Self::Below,
            (BinaryOperator::LessOrEqual, true) => Self::BelowOrEqual,
            _ => return None,
        })
    }
}

impl Display for Amd64ConditionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equal => f.write_str("e"),
            Self::Greater => f.write_str("g"),
            Self::GreaterOrEqual => f.write_str("ge"),
            Self::Less => f.write_str("l"),
            Self::LessOrEqual => f.write_str("le"),
            Self::NotEqual => f.write_str("ne"),
            Self::Above => f.write_str("a"),
            Self::AboveOrEqual => f.write_str("ae"),
            Self::Below => f.write_str("b"),
            Self::BelowOrEqual => f.write_str("be"),
            Self::Overflow => f.write_str("o"),
            Self::Parity => f.write_str("p"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(BinaryOperator::Less, false, Some(Amd64ConditionCode::Less))]
    #[case(BinaryOperator::Less, true, Some(Amd64ConditionCode::Below))]
    #[case(BinaryOperator::GreaterOrEqual, true, Some(Amd64ConditionCode::AboveOrEqual))]
    #[case(BinaryOperator::NotEqual, true, Some(Amd64ConditionCode::NotEqual))]
    #[case(BinaryOperator::Add, false, None)]
    fn comparisons(#[case] operator: BinaryOperator, #[case] unsigned: bool, #[case] expected: Option<Amd64ConditionCode>) {
        assert_eq!(Amd64ConditionCode::for_comparison(operator, unsigned), expected);
    }
}
