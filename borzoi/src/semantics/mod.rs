// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod analyzer;
mod classification;
mod diagnostic;
mod layout;
mod related;
mod scope;

pub use self::{
    analyzer::{
        integer_literal_type,
        is_valid_conversion,
        SemanticAnalyzer,
        SemanticModel,
    },
    classification::EightbyteClass,
    diagnostic::{
        SemanticDiagnostic,
        SemanticDiagnosticKind,
    },
    layout::{
        align_up,
        LayoutError,
        LayoutMember,
        LayoutRecord,
        LayoutRegistry,
    },
    related::{
        SemanticRelatedInformation,
        SemanticRelatedMessage,
    },
    scope::{
        ScopePath,
        SegmentCounters,
        SegmentKind,
        Symbol,
        SymbolKind,
        SymbolTable,
    },
};
