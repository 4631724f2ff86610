// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use strum::IntoEnumIterator;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(strum::AsRefStr, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Keyword {
    And,
    As,
    Break,
    Call,
    Cfn,
    Collect,
    Continue,
    Do,
    Else,
    Embed,
    False,
    Fn,
    For,
    From,
    If,
    Let,
    #[strum(serialize = "let@")]
    LetAlloc,
    Link,
    Mut,
    Not,
    Null,
    Or,
    Ret,
    True,
    Type,
    Until,
    While,
    Xor,
}

impl Keyword {
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        Self::iter().find(|x| x.as_ref() == input)
    }

    /// Keywords that may start a top-level declaration, used by the parser to
    /// resynchronize after an error.
    #[must_use]
    pub const fn starts_declaration(&self) -> bool {
        matches!(self, Self::Fn | Self::Cfn | Self::Type | Self::Link | Self::Embed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("fn", Some(Keyword::Fn))]
    #[case("cfn", Some(Keyword::Cfn))]
    #[case("collect", Some(Keyword::Collect))]
    #[case("until", Some(Keyword::Until))]
    #[case("xor", Some(Keyword::Xor))]
    #[case("letter", None)]
    #[case("Fn", None)]
    fn parse(#[case] input: &str, #[case] expected: Option<Keyword>) {
        assert_eq!(Keyword::parse(input), expected);
    }

    #[test]
    fn alloc_keyword_is_spelled_with_at_sign() {
        assert_eq!(Keyword::LetAlloc.as_ref(), "let@");
    }
}
