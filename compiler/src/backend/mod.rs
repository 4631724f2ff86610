// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod amd64;

pub use self::amd64::{
    assign_frames,
    Amd64Instruction,
    Assembly,
    CodeGenerator,
    DataItem,
    FrameLayout,
};
