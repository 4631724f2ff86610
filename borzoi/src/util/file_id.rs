// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{fmt::Debug, hash::{DefaultHasher, Hash, Hasher}, path::Path};

/// Identifies the source file a location belongs to, derived from its path.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(u64);

impl FileId {
    pub const INTERNAL: Self = Self(u64::MAX);

    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        Self(hasher.finish())
    }
}

impl Debug for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::INTERNAL {
            f.write_str("FileId::INTERNAL")
        } else {
            f.debug_tuple("FileId").field(&self.0).finish()
        }
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::INTERNAL
    }
}
