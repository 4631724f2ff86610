// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{io, path::PathBuf, process::Command};

use thiserror::Error;

use crate::Platform;

use super::CommandExt;

#[derive(Debug, Error)]
pub enum AssemblerError {
    #[error("could not start `nasm`: {0}")]
    Spawn(#[from] io::Error),

    #[error("`nasm` failed:\n{0}")]
    Failed(String),
}

/// Assembles the generated NASM text into an object file.
pub struct NasmAssembler {
    platform: Platform,
    input_path: PathBuf,
    output_path: PathBuf,
}

impl NasmAssembler {
    #[must_use]
    pub fn new(platform: Platform, input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            input_path: input_path.into(),
            output_path: output_path.into(),
        }
    }

    pub fn run(self) -> Result<(), AssemblerError> {
        let mut command = Command::new("nasm");

        command.arg("-f");
        command.arg(self.platform.operating_system().nasm_format());
        command.arg(&self.input_path);
        command.arg("-o");
        command.arg(&self.output_path);

        command.run_capturing_stderr()?.map_err(AssemblerError::Failed)
    }
}
