// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{fmt::{Display, Write}, path::PathBuf};

use borzoi::BorString;

use crate::Platform;

use super::Amd64Instruction;

/// A labelled item of one of the data sections.
#[derive(Debug, Clone, PartialEq)]
pub enum DataItem {
    Bytes { label: BorString, bytes: Vec<u8> },

    /// Quadwords given as NASM expressions, so they may refer to labels.
    Quads { label: BorString, values: Vec<String> },

    /// The contents of a file, followed by a label marking its end.
    Include { label: BorString, path: PathBuf, end_label: BorString },

    /// Zero-initialized quadwords in `.bss`.
    Reserve { label: BorString, quads: usize },
}

impl Display for DataItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes { label, bytes } => {
                f.write_fmt(format_args!("{label}: db "))?;

                if bytes.is_empty() {
                    return f.write_char('0');
                }

                for (idx, byte) in bytes.iter().enumerate() {
                    if idx != 0 {
                        f.write_str(", ")?;
                    }
                    byte.fmt(f)?;
                }

                Ok(())
            }

            Self::Quads { label, values } => f.write_fmt(format_args!("{label}: dq {}", values.join(", "))),

            Self::Include { label, path, end_label } => {
                let path = path.to_string_lossy().replace('\\', "/");
                f.write_fmt(format_args!("{label}: incbin \"{path}\"\n{end_label}:"))
            }

            Self::Reserve { label, quads } => f.write_fmt(format_args!("{label}: resq {quads}")),
        }
    }
}

/// A complete NASM translation unit.
#[derive(Debug, Clone)]
pub struct Assembly {
    platform: Platform,
    externs: Vec<BorString>,
    text: Vec<Amd64Instruction>,
    read_only: Vec<DataItem>,
    data: Vec<DataItem>,
    bss: Vec<DataItem>,
}

impl Assembly {
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            externs: Vec::new(),
            text: Vec::new(),
            read_only: Vec::new(),
            data: Vec::new(),
            bss: Vec::new(),
        }
    }

    pub fn add_extern(&mut self, name: impl Into<BorString>) {
        let name = name.into();
        if !self.externs.contains(&name) {
            self.externs.push(name);
        }
    }

    pub fn extend_text(&mut self, instructions: impl IntoIterator<Item = Amd64Instruction>) {
        self.text.extend(instructions);
    }

    pub fn add_read_only(&mut self, item: DataItem) {
        self.read_only.push(item);
    }

    pub fn add_data(&mut self, item: DataItem) {
        self.data.push(item);
    }

    pub fn add_bss(&mut self, item: DataItem) {
        self.bss.push(item);
    }

    #[must_use]
    pub fn externs(&self) -> &[BorString] {
        &self.externs
    }

    #[must_use]
    pub fn text(&self) -> &[Amd64Instruction] {
        &self.text
    }

    /// The number of machine instructions, excluding labels and comments.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.text.iter().filter(|x| x.is_machine_instruction()).count()
    }
}

impl Display for Assembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("bits 64\ndefault rel\n\n")?;

        for name in &self.externs {
            f.write_fmt(format_args!("extern {name}\n"))?;
        }

        f.write_str("\nglobal main\n\nsection .text\n")?;

        for instruction in &self.text {
            if !matches!(instruction, Amd64Instruction::Label(..) | Amd64Instruction::Symbol(..)) {
                f.write_str("    ")?;
            }

            f.write_fmt(format_args!("{instruction}\n"))?;
        }

        let sections = [
            (self.platform.operating_system().read_only_section(), &self.read_only),
            (".data", &self.data),
            (".bss", &self.bss),
        ];

        for (name, items) in sections {
            if items.is_empty() {
                continue;
            }

            f.write_fmt(format_args!("\nsection {name}\n"))?;

            // `incbin` data and quadword tables must stay 8-byte aligned for
            // the `{ptr, len}` records pointing at them.
            f.write_str("align 8\n")?;

            for item in items {
                f.write_fmt(format_args!("{item}\n"))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::amd64::{Amd64Register, Label};
    use pretty_assertions::assert_eq;

    #[test]
    fn sections_follow_the_platform() {
        let mut assembly = Assembly::new(Platform::windows());
        assembly.add_read_only(DataItem::Bytes { label: "str$0".into(), bytes: b"hi".to_vec() });

        let text = assembly.to_string();
        assert!(text.contains("section .rdata\n"), "{text}");
        assert!(text.contains("str$0: db 104, 105\n"), "{text}");
    }

    #[test]
    fn layout() {
        let mut assembly = Assembly::new(Platform::linux());
        assembly.add_extern("calloc");
        assembly.add_extern("calloc");
        assembly.extend_text([
            Amd64Instruction::Symbol("main".into()),
            Amd64Instruction::Label(Label(0)),
            Amd64Instruction::mov(Amd64Register::Rax, 0),
            Amd64Instruction::Ret,
        ]);
        assembly.add_bss(DataItem::Reserve { label: "gc$len".into(), quads: 1 });

        assert_eq!(assembly.to_string(), "bits 64\ndefault rel\n\nextern calloc\n\nglobal main\n\nsection .text\nmain:\n_L0:\n    mov rax, 0\n    ret\n\nsection .bss\nalign 8\ngc$len: resq 1\n");
        assert_eq!(assembly.instruction_count(), 2);
    }
}
