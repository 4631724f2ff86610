// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{ops::Deref, path::{Path, PathBuf}, sync::Arc};

use crate::BorString;

use super::{FileId, FileRange};

#[derive(Debug, Clone)]
pub struct SourceCode {
    id: FileId,
    path: Arc<PathBuf>,
    contents: BorString,
}

impl SourceCode {
    #[must_use]
    pub fn new_test(contents: impl Into<BorString>) -> Self {
        Self::new(PathBuf::new(), contents.into())
    }

    #[must_use]
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<BorString>) -> Self {
        let path = Arc::new(path.into());
        let id = FileId::from_path(&path);

        Self {
            id,
            path,
            contents: contents.into(),
        }
    }

    #[must_use]
    pub const fn file_id(&self) -> FileId {
        self.id
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn contents(&self) -> &BorString {
        &self.contents
    }

    /// The complete line the range starts on, without its line terminator.
    #[must_use]
    pub fn line_of(&self, range: FileRange) -> Option<&str> {
        self.contents.lines().nth(range.start().line())
    }
}

impl Deref for SourceCode {
    type Target = BorString;

    fn deref(&self) -> &Self::Target {
        self.contents()
    }
}
