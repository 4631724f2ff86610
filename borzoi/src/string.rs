// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{borrow::Borrow, fmt::{Debug, Display}, hash::Hash, ops::{Deref, Range}, sync::Arc};

/// Cheaply clonable string used for identifiers, literals and mangled names.
///
/// Slices of the source text share the backing allocation of the file.
#[derive(Clone)]
pub struct BorString {
    inner: BorStringImpl,
}

impl BorString {
    #[must_use]
    pub const fn empty() -> Self {
        Self::new_static("")
    }

    #[must_use]
    pub const fn new_static(str: &'static str) -> Self {
        Self {
            inner: BorStringImpl::Static { str },
        }
    }

    #[must_use]
    pub fn new(str: impl Into<Arc<str>>) -> Self {
        let data: Arc<str> = str.into();
        let end = data.len();

        Self {
            inner: BorStringImpl::Shared {
                data,
                start: 0,
                end,
            },
        }
    }

    #[must_use]
    pub fn sliced(&self, start: usize, end: usize) -> Self {
        if start == end {
            return Self::empty();
        }

        match &self.inner {
            BorStringImpl::Shared { data, start: base, end: base_end } => {
                debug_assert!(base + end <= *base_end, "slice {start}..{end} is outside of `{}`", self.as_str());

                Self {
                    inner: BorStringImpl::Shared {
                        data: Arc::clone(data),
                        start: base + start,
                        end: base + end,
                    },
                }
            }

            BorStringImpl::Static { str } => Self {
                inner: BorStringImpl::Static {
                    str: &str[start..end],
                },
            },
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match &self.inner {
            BorStringImpl::Shared { data, start, end } => &data[*start..*end],
            BorStringImpl::Static { str } => str,
        }
    }
}

#[derive(Debug, Clone)]
enum BorStringImpl {
    Shared {
        data: Arc<str>,
        start: usize,
        end: usize,
    },
    Static {
        str: &'static str,
    },
}

impl Debug for BorString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self.as_str(), f)
    }
}

impl Display for BorString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self.as_str(), f)
    }
}

impl Deref for BorString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl Borrow<str> for BorString {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<String> for BorString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&'static str> for BorString {
    fn from(value: &'static str) -> Self {
        Self::new_static(value)
    }
}

impl PartialEq for BorString {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for BorString {}

impl PartialOrd for BorString {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BorString {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Hash for BorString {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl PartialEq<str> for BorString {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for BorString {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

pub trait Slice<T> {
    fn slice(&self, t: T) -> Self;
}

impl Slice<Range<usize>> for BorString {
    fn slice(&self, t: Range<usize>) -> Self {
        self.sliced(t.start, t.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_share_the_source() {
        let source = BorString::new("fn main() {}");
        let name = source.slice(3..7);

        assert_eq!(name, "main");
        assert_eq!(name.slice(1..3), "ai");
    }

    #[test]
    fn static_and_shared_compare_equal() {
        assert_eq!(BorString::new_static("int"), BorString::new(String::from("int")));
        assert!(BorString::empty().is_empty());
    }
}
