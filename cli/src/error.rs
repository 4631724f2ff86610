// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use borzoi::{FileRange, SourceCode};
use borzoi_compiler::Diagnostic;
use colored::{Color, Colorize};

/// Prints a diagnostic with the offending source line and a caret under the
/// range.
pub struct DiagnosticPrinter<'a> {
    source_code: &'a SourceCode,
    diagnostic: &'a Diagnostic,
    color: Color,
}

impl<'a> DiagnosticPrinter<'a> {
    #[must_use = "Use the `print` method to actually print"]
    pub fn new(source_code: &'a SourceCode, diagnostic: &'a Diagnostic) -> Self {
        Self {
            source_code,
            diagnostic,
            color: Color::Red,
        }
    }

    pub fn print(self) {
        eprintln!("{}[{}]: {}", "error".red().bold(), self.diagnostic.name, self.diagnostic.message.bold());
        eprintln!();

        self.print_source(self.diagnostic.range);

        for (range, message) in &self.diagnostic.related {
            eprintln!("{}: {}", "note".cyan().bold(), message.bold());
            self.print_source(*range);
        }

        let path = self.source_code.path().display();
        eprintln!("In {path}:{}\n", self.diagnostic.range);
    }

    fn print_source(&self, range: FileRange) {
        let Some(line) = self.source_code.line_of(range) else {
            return;
        };

        let line_number = (range.start().line() + 1).to_string();
        let separator = " | ".blue().bold();
        eprintln!("{}{separator}{line}", line_number.blue().bold());

        let columns = if range.start().line() == range.end().line() {
            range.len()
        } else {
            line.len().saturating_sub(range.start().column())
        };

        let spaces = " ".repeat(range.start().column());
        let caret = "^".color(self.color).bold();
        let tildes = "~".repeat(columns.saturating_sub(1)).color(self.color);

        eprintln!("{}{separator}{spaces}{caret}{tildes}", " ".repeat(line_number.len()));
        eprintln!();
    }
}
