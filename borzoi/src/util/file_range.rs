// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use super::{FileId, FileLocation};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileRange {
    start: FileLocation,
    end: FileLocation,
}

impl FileRange {
    pub const INTERNAL: Self = Self::new(FileLocation::INTERNAL, FileLocation::INTERNAL);

    #[must_use]
    pub const fn new(start: FileLocation, end: FileLocation) -> Self {
        Self {
            start,
            end,
        }
    }

    #[must_use]
    pub const fn start(&self) -> FileLocation {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> FileLocation {
        self.end
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.offset().saturating_sub(self.start.offset())
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn file_id(&self) -> FileId {
        self.start.file_id()
    }

    /// The smallest range covering both `self` and `other`.
    #[must_use]
    pub fn to(&self, other: FileRange) -> Self {
        Self::new(self.start, other.end)
    }
}

impl From<(FileLocation, FileLocation)> for FileRange {
    fn from(value: (FileLocation, FileLocation)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl Display for FileRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.start.fmt(f)
    }
}
