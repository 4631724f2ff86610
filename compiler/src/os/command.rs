// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{io, process::{Command, Stdio}};

use log::debug;

pub trait CommandExt {
    /// Runs the command to completion. A nonzero exit gives the captured
    /// stderr as the inner error.
    fn run_capturing_stderr(self) -> io::Result<Result<(), String>>;
}

impl CommandExt for Command {
    fn run_capturing_stderr(mut self) -> io::Result<Result<(), String>> {
        debug!("Running {self:?}");

        self.stdout(Stdio::piped());
        self.stderr(Stdio::piped());

        let output = self.output()?;
        if output.status.success() {
            return Ok(Ok(()));
        }

        let mut description = match String::from_utf8(output.stderr) {
            Ok(str) => str,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };

        if description.trim().is_empty() {
            description = String::from_utf8_lossy(&output.stdout).into_owned();
        }

        Ok(Err(description))
    }
}

/// Whether `program` can be started at all.
#[must_use]
pub fn is_program_available(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}
