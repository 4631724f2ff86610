// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod backend;
mod diagnostic;
mod os;
mod pipeline;
mod types;

pub use self::{
    backend::{
        assign_frames,
        Amd64Instruction,
        Assembly,
        CodeGenerator,
        DataItem,
        FrameLayout,
    },
    diagnostic::{
        Diagnostic,
        DiagnosticStage,
    },
    os::{
        is_program_available,
        AssemblerError,
        LinkerError,
        NtStatus,
        Signal,
    },
    pipeline::{
        build,
        compile,
        link_executable,
        run_executable,
        Compilation,
        CompileOptions,
        PipelineError,
        RunOutcome,
        Stage,
        Statistics,
    },
    types::{
        CallingConvention,
        OperatingSystem,
        Platform,
        PlatformParseError,
    },
};
