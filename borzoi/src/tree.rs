// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{borrow::Cow, path::{Path, PathBuf}};

use crate::{BorString, EmbedDeclaration, ForeignFunctionDeclaration, FunctionDeclaration, Ranged, RecordDeclaration};

#[derive(Debug, Default, Clone)]
pub struct ParseTree {
    pub(crate) path: PathBuf,
    pub functions: Vec<FunctionDeclaration>,
    pub foreign_functions: Vec<ForeignFunctionDeclaration>,
    pub records: Vec<RecordDeclaration>,

    /// Libraries named by `link "name"`.
    pub links: Vec<Ranged<BorString>>,
    pub embeds: Vec<EmbedDeclaration>,
}

impl ParseTree {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn module_name(&self) -> Cow<'_, str> {
        self.path.to_string_lossy()
    }

    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionDeclaration> {
        self.functions.iter().find(|x| x.name.value() == name)
    }

    #[must_use]
    pub fn foreign_function(&self, name: &str) -> Option<&ForeignFunctionDeclaration> {
        self.foreign_functions.iter().find(|x| x.name.value() == name)
    }

    #[must_use]
    pub fn declaration_count(&self) -> usize {
        self.functions.len() + self.foreign_functions.len() + self.records.len() + self.links.len() + self.embeds.len()
    }
}
