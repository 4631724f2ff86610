// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::collections::HashMap;

use borzoi::{align_up, BorString, FunctionDeclaration, LayoutRegistry, ParseTree, StackVariable, Type};

/// The sizes making up the frame of one function. Every area is a multiple
/// of 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub locals_size: usize,
    pub arguments_size: usize,
    pub return_size: usize,
}

impl FrameLayout {
    /// The space a caller reserves for the return value.
    #[must_use]
    pub const fn return_slot_size(&self) -> usize {
        align_up(self.return_size, 16)
    }

    /// `[rbp + displacement]` of the parameter at `offset`.
    #[must_use]
    pub const fn parameter_displacement(&self, offset: usize) -> i64 {
        16 + offset as i64
    }

    /// `[rbp + displacement]` of the local at `offset`.
    #[must_use]
    pub const fn local_displacement(&self, offset: usize) -> i64 {
        offset as i64 - self.locals_size as i64
    }

    #[must_use]
    pub const fn return_displacement(&self) -> i64 {
        16 + self.arguments_size as i64
    }
}

/// Assigns a frame offset to every stack variable of every function.
pub fn assign_frames(layouts: &LayoutRegistry, tree: &mut ParseTree) -> HashMap<BorString, FrameLayout> {
    tree.functions.iter_mut()
        .map(|function| (function.name.value().clone(), assign_frame(layouts, function)))
        .collect()
}

pub fn assign_frame(layouts: &LayoutRegistry, function: &mut FunctionDeclaration) -> FrameLayout {
    let arguments_size = lay_out(layouts, &mut function.variables.parameters);
    let locals_size = lay_out(layouts, &mut function.variables.locals);
    let return_size = size_of(layouts, function.return_type.value());

    log::trace!("Frame of `{}`: {locals_size} bytes of locals, {arguments_size} bytes of arguments", function.name.value());

    FrameLayout {
        locals_size,
        arguments_size,
        return_size,
    }
}

/// Places `variables` in declaration order and returns the area size.
fn lay_out(layouts: &LayoutRegistry, variables: &mut [StackVariable]) -> usize {
    let mut offset = 0;

    for variable in variables {
        let layout = match layouts.layout_of(&variable.ty) {
            Ok(layout) => layout,
            Err(e) => panic!("ICE: stack variable `{}` has no layout: {e}", variable.mangled_name),
        };

        offset = align_up(offset, layout.alignment);
        variable.offset = Some(offset);
        offset += layout.size;
    }

    align_up(offset, 16)
}

#[must_use]
pub fn size_of(layouts: &LayoutRegistry, ty: &Type) -> usize {
    match layouts.size_of(ty) {
        Some(size) => size,
        None => panic!("ICE: type `{ty}` has no layout"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use borzoi::{parse_source_code, SemanticAnalyzer, SourceCode};
    use pretty_assertions::assert_eq;

    #[test]
    fn variables_are_aligned_in_declaration_order() {
        let source_code = SourceCode::new_test(r#"
            fn f(byte a, int b, i32 c) byte[] {
                let bool flag = true
                let double d = 1.5
                let@ int boxed = 4
                ret "x"
            }

            fn main() {}
        "#.to_string());

        let mut tree = parse_source_code(&source_code).tree;
        let mut analyzer = SemanticAnalyzer::new(".");
        analyzer.analyze_tree(&mut tree);
        let (model, diagnostics) = analyzer.into_parts();
        assert!(diagnostics.is_empty(), "{diagnostics:#?}");

        let frames = assign_frames(&model.layouts, &mut tree);
        let frame = frames["f"];

        let parameters: Vec<_> = tree.functions[0].variables.parameters.iter().map(|x| x.offset()).collect();
        let locals: Vec<_> = tree.functions[0].variables.locals.iter().map(|x| x.offset()).collect();

        assert_eq!(parameters, vec![0, 8, 16]);
        assert_eq!(locals, vec![0, 8, 16]);
        assert_eq!(frame, FrameLayout { locals_size: 32, arguments_size: 32, return_size: 16 });
        assert_eq!(frame.local_displacement(8), -24);
        assert_eq!(frame.return_displacement(), 48);
        assert_eq!(frames["main"].locals_size, 0);
    }
}
