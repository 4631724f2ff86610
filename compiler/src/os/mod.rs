// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod assembler;
mod command;
mod linker;
mod ntstatus;
mod signal;

use std::process::ExitStatus;

pub use self::{
    assembler::{AssemblerError, NasmAssembler},
    command::{is_program_available, CommandExt},
    linker::{GccLinker, LinkerError, LinkerPath},
    ntstatus::NtStatus,
    signal::Signal,
};

/// Explains why a compiled program ended abnormally, when it did.
#[must_use]
pub fn describe_abnormal_exit(status: &ExitStatus) -> Option<String> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return Some(Signal::new(signal).to_string());
        }
    }

    let code = status.code()?;
    if cfg!(windows) && NtStatus::is_error_code(code as u32) {
        return Some(NtStatus::from(code).to_string());
    }

    None
}
