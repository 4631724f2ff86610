// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::collections::HashMap;

use borzoi::{
    align_up,
    Block,
    BorString,
    ForStatement,
    FunctionDeclaration,
    LayoutRecord,
    LayoutRegistry,
    LetStatement,
    ParseTree,
    Ranged,
    SemanticModel,
    Statement,
    StatementKind,
    Type,
    VariableArea,
    VariableReference,
    Expression,
};
use log::{debug, trace};

use crate::Platform;

use super::{
    frame::{assign_frames, FrameLayout},
    runtime::{self, check_allocation, runtime_call, RuntimeArgument, GC_COLLECT, GC_ENTER, GC_EXIT, GC_PUSH, GC_RELEASE},
    Amd64Address,
    Amd64ConditionCode,
    Amd64Instruction,
    Amd64Operand,
    Amd64Register,
    ArithmeticOperation,
    Assembly,
    DataItem,
    Label,
    OperandSize,
};

/// The session object for lowering one analyzed program to NASM.
#[derive(Debug)]
pub struct CodeGenerator<'a> {
    pub(super) platform: Platform,
    pub(super) layouts: &'a LayoutRegistry,
    pub(super) tree: &'a ParseTree,
    pub(super) frames: HashMap<BorString, FrameLayout>,
    assembly: Assembly,
    label_counter: usize,
    string_counter: usize,
}

impl<'a> CodeGenerator<'a> {
    /// Lays out the frames of `tree` and generates the complete program.
    /// The tree must have been analyzed without diagnostics.
    #[must_use]
    pub fn generate(platform: &Platform, model: &SemanticModel, tree: &mut ParseTree) -> Assembly {
        let frames = assign_frames(&model.layouts, tree);

        let mut this = CodeGenerator {
            platform: platform.clone(),
            layouts: &model.layouts,
            tree,
            frames,
            assembly: Assembly::new(platform.clone()),
            label_counter: 0,
            string_counter: 0,
        };

        this.emit_program();
        this.assembly
    }

    fn emit_program(&mut self) {
        let tree = self.tree;

        for function in &tree.foreign_functions {
            self.assembly.add_extern(function.link_name().clone());
        }

        let main_return_size = self.frames.get("main").map(|x| x.return_size);
        let counter = &mut self.label_counter;
        runtime::emit_runtime(&mut self.assembly, &self.platform, main_return_size, || {
            *counter += 1;
            Label(*counter)
        });

        for embed in &tree.embeds {
            let name = embed.name.value();
            let Some(path) = &embed.resolved_path else {
                panic!("ICE: embed `{name}` was never resolved");
            };

            let bytes = BorString::new(format!("emb${name}$bytes"));
            let end = BorString::new(format!("emb${name}$end"));

            self.assembly.add_read_only(DataItem::Include {
                label: bytes.clone(),
                path: path.clone(),
                end_label: end.clone(),
            });

            self.assembly.add_data(DataItem::Quads {
                label: BorString::new(format!("emb${name}")),
                values: vec![bytes.to_string(), format!("{end} - {bytes}")],
            });
        }

        for function in &tree.functions {
            debug!("Generating code for `{}`", function.name.value());

            let instructions = FunctionGenerator::new(self, function).emit();
            trace!("`{}` has {} lines", function.name.value(), instructions.len());

            self.assembly.extend_text(instructions);
        }
    }

    pub(super) fn next_label(&mut self) -> Label {
        self.label_counter += 1;
        Label(self.label_counter)
    }

    /// Places `bytes` in the read-only section, returning its label.
    pub(super) fn add_string(&mut self, bytes: &[u8]) -> BorString {
        let label = BorString::new(format!("str${}", self.string_counter));
        self.string_counter += 1;

        self.assembly.add_read_only(DataItem::Bytes { label: label.clone(), bytes: bytes.to_vec() });
        label
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct LoopLabels {
    continue_label: Label,
    break_label: Label,

    /// The number of collection frames open around the loop statement.
    frame_depth: usize,
}

/// Generates the body of a single function.
pub(super) struct FunctionGenerator<'g, 'a> {
    pub(super) session: &'g mut CodeGenerator<'a>,
    pub(super) function: &'a FunctionDeclaration,
    pub(super) frame: FrameLayout,
    exit_label: Label,

    /// Collection frames currently open, including the body frame.
    open_frames: usize,
    body_frames: usize,
    instructions: Vec<Amd64Instruction>,
}

impl<'g, 'a> FunctionGenerator<'g, 'a> {
    fn new(session: &'g mut CodeGenerator<'a>, function: &'a FunctionDeclaration) -> Self {
        let frame = match session.frames.get(function.name.value()) {
            Some(frame) => *frame,
            None => panic!("ICE: function `{}` has no frame", function.name.value()),
        };

        let exit_label = session.next_label();
        let body_frames = usize::from(!function.body.manual);

        Self {
            session,
            function,
            frame,
            exit_label,
            open_frames: body_frames,
            body_frames,
            instructions: Vec::new(),
        }
    }

    fn emit(mut self) -> Vec<Amd64Instruction> {
        let function = self.function;

        self.add(Amd64Instruction::Comment(format!("fn {}: {}", function.name.value(), function.signature())));
        self.add(Amd64Instruction::Symbol(function_symbol(function.name.value())));
        self.add(Amd64Instruction::Push(Amd64Register::Rbp));
        self.add(Amd64Instruction::mov(Amd64Register::Rbp, Amd64Register::Rsp));
        self.sub_rsp(self.frame.locals_size);

        if !function.body.manual {
            self.add(Amd64Instruction::call(GC_ENTER));
        }

        for statement in &function.body.statements {
            self.emit_statement(statement, None);
        }

        self.add(Amd64Instruction::Label(self.exit_label));

        if !function.body.manual {
            self.add(Amd64Instruction::call(GC_EXIT));
        }

        self.add(Amd64Instruction::mov(Amd64Register::Rsp, Amd64Register::Rbp));
        self.add(Amd64Instruction::Pop(Amd64Register::Rbp));
        self.add(Amd64Instruction::Ret);

        debug_assert_eq!(self.open_frames, self.body_frames);
        self.instructions
    }

    fn emit_block(&mut self, block: &Block, loop_labels: Option<LoopLabels>) {
        if !block.manual {
            self.add(Amd64Instruction::call(GC_ENTER));
            self.open_frames += 1;
        }

        for statement in &block.statements {
            self.emit_statement(statement, loop_labels);
        }

        if !block.manual {
            self.add(Amd64Instruction::call(GC_EXIT));
            self.open_frames -= 1;
        }
    }

    fn emit_statement(&mut self, statement: &Statement, loop_labels: Option<LoopLabels>) {
        match &statement.kind {
            StatementKind::Let(statement) => self.emit_let(statement),

            StatementKind::Mut { target, value } => self.emit_mut(target, value),

            StatementKind::Call(expression) => {
                let size = self.size_of(expression.ty.resolved());
                self.emit_expression(expression);
                self.add_rsp(align_up(size, 16));
            }

            StatementKind::Collect(expression) => {
                self.emit_expression(expression);
                self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Operand::qword(Amd64Address::rsp(0))));
                self.add_rsp(16);
                self.add(Amd64Instruction::call(GC_COLLECT));
            }

            StatementKind::Return(value) => self.emit_return(value.as_ref()),

            StatementKind::Break => {
                let labels = expect_loop(loop_labels);
                self.exit_frames(self.open_frames - labels.frame_depth);
                self.add(Amd64Instruction::jmp(labels.break_label));
            }

            StatementKind::Continue => {
                let labels = expect_loop(loop_labels);
                self.exit_frames(self.open_frames - labels.frame_depth);
                self.add(Amd64Instruction::jmp(labels.continue_label));
            }

            StatementKind::If { condition, then_block, else_block } => {
                let else_label = self.next_label();
                let end_label = self.next_label();

                self.emit_condition(condition);
                self.add(Amd64Instruction::jcc(Amd64ConditionCode::Equal, else_label));

                self.emit_block(then_block, loop_labels);
                self.add(Amd64Instruction::jmp(end_label));

                self.add(Amd64Instruction::Label(else_label));
                if let Some(else_block) = else_block {
                    self.emit_block(else_block, loop_labels);
                }

                self.add(Amd64Instruction::Label(end_label));
            }

            StatementKind::While { condition, body } => {
                let start = self.next_label();
                let end = self.next_label();

                self.add(Amd64Instruction::Label(start));
                self.emit_condition(condition);
                self.add(Amd64Instruction::jcc(Amd64ConditionCode::Equal, end));

                self.emit_block(body, Some(LoopLabels {
                    continue_label: start,
                    break_label: end,
                    frame_depth: self.open_frames,
                }));

                self.add(Amd64Instruction::jmp(start));
                self.add(Amd64Instruction::Label(end));
            }

            StatementKind::DoWhile { body, condition } => {
                let start = self.next_label();
                let check = self.next_label();
                let end = self.next_label();

                self.add(Amd64Instruction::Label(start));
                self.emit_block(body, Some(LoopLabels {
                    continue_label: check,
                    break_label: end,
                    frame_depth: self.open_frames,
                }));

                self.add(Amd64Instruction::Label(check));
                self.emit_condition(condition);
                self.add(Amd64Instruction::jcc(Amd64ConditionCode::NotEqual, start));
                self.add(Amd64Instruction::Label(end));
            }

            StatementKind::For(statement) => self.emit_for(statement),

            StatementKind::Block(block) => self.emit_block(block, loop_labels),
        }
    }

    fn emit_let(&mut self, statement: &LetStatement) {
        let Some(mangled) = &statement.mangled else {
            panic!("ICE: variable `{}` was never declared", statement.name.value());
        };

        let ty = statement.ty.value();
        let size = self.size_of(ty);
        let variable = self.variable_address(mangled);

        self.emit_expression(&statement.value);

        if statement.allocate {
            self.call_runtime("calloc", vec![
                RuntimeArgument::Immediate(1),
                RuntimeArgument::Immediate(size.max(1) as i64),
            ]);
            self.extend(check_allocation());
            self.add(Amd64Instruction::call(GC_PUSH));
            self.add(Amd64Instruction::mov(Amd64Operand::qword(variable), Amd64Register::Rax));
            self.copy(Amd64Address::new(Amd64Register::Rax), Amd64Address::rsp(0), size);
        } else {
            self.copy(variable, Amd64Address::rsp(0), size);
        }

        self.add_rsp(align_up(size, 16));
    }

    fn emit_mut(&mut self, target: &Ranged<VariableReference>, value: &Ranged<Expression>) {
        let size = self.size_of(target.resolved_type());
        let slot = align_up(size, 16);

        let temporary = self.emit_place(target);
        self.emit_expression(value);

        self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Operand::qword(Amd64Address::rsp(slot))));
        self.copy(Amd64Address::new(Amd64Register::Rax), Amd64Address::rsp(0), size);
        self.add_rsp(slot + 16 + temporary);
    }

    fn emit_return(&mut self, value: Option<&Ranged<Expression>>) {
        if let Some(value) = value {
            let ty = value.ty.resolved();
            let size = self.size_of(ty);
            let destination = Amd64Address::rbp(self.frame.return_displacement());

            self.emit_expression(value);
            self.copy(destination.clone(), Amd64Address::rsp(0), size);
            self.add_rsp(align_up(size, 16));

            if ty.is_pointer() || ty.is_array() {
                self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Operand::qword(destination)));
                self.add(Amd64Instruction::call(GC_RELEASE));
            }
        }

        self.exit_frames(self.open_frames - self.body_frames);
        self.add(Amd64Instruction::jmp(self.exit_label));
    }

    fn emit_for(&mut self, statement: &ForStatement) {
        let Some(mangled) = &statement.mangled else {
            panic!("ICE: iterator `{}` was never declared", statement.iterator.value());
        };

        let iterator = self.variable_address(mangled);
        let check = self.next_label();
        let step = self.next_label();
        let end = self.next_label();

        self.emit_expression(&statement.from);
        self.pop_rax();
        self.add(Amd64Instruction::mov(Amd64Operand::qword(iterator.clone()), Amd64Register::Rax));

        self.add(Amd64Instruction::Label(check));
        self.emit_expression(&statement.until);
        self.add(Amd64Instruction::mov(Amd64Register::Rcx, Amd64Operand::qword(Amd64Address::rsp(0))));
        self.add_rsp(16);

        // `i < until` as `i <= until - 1`, where the minimum bound never runs.
        self.add(Amd64Instruction::Dec(Amd64Register::Rcx.into()));
        self.add(Amd64Instruction::jcc(Amd64ConditionCode::Overflow, end));
        self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Operand::qword(iterator.clone())));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Cmp, Amd64Register::Rax, Amd64Register::Rcx));
        self.add(Amd64Instruction::jcc(Amd64ConditionCode::Greater, end));

        self.emit_block(&statement.body, Some(LoopLabels {
            continue_label: step,
            break_label: end,
            frame_depth: self.open_frames,
        }));

        self.add(Amd64Instruction::Label(step));
        self.add(Amd64Instruction::Inc(Amd64Operand::qword(iterator)));
        self.add(Amd64Instruction::jmp(check));
        self.add(Amd64Instruction::Label(end));
    }

    /// Evaluates a `bool` condition and sets ZF when it is false.
    fn emit_condition(&mut self, condition: &Ranged<Expression>) {
        self.emit_expression(condition);
        self.add(Amd64Instruction::Movzx {
            dst: Amd64Register::Rax,
            src: Amd64Operand::memory(OperandSize::Byte, Amd64Address::rsp(0)),
        });
        self.add_rsp(16);
        self.add(Amd64Instruction::arithmetic(
            ArithmeticOperation::Test,
            Amd64Operand::reg32(Amd64Register::Rax),
            Amd64Operand::reg32(Amd64Register::Rax),
        ));
    }

    fn exit_frames(&mut self, count: usize) {
        for _ in 0..count {
            self.add(Amd64Instruction::call(GC_EXIT));
        }
    }
}

/// Small emission helpers shared by the statement, expression and call code.
impl FunctionGenerator<'_, '_> {
    pub(super) fn add(&mut self, instruction: Amd64Instruction) {
        self.instructions.push(instruction);
    }

    pub(super) fn extend(&mut self, instructions: impl IntoIterator<Item = Amd64Instruction>) {
        self.instructions.extend(instructions);
    }

    pub(super) fn next_label(&mut self) -> Label {
        self.session.next_label()
    }

    pub(super) fn sub_rsp(&mut self, bytes: usize) {
        if bytes != 0 {
            self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Sub, Amd64Register::Rsp, bytes as i64));
        }
    }

    pub(super) fn add_rsp(&mut self, bytes: usize) {
        if bytes != 0 {
            self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Add, Amd64Register::Rsp, bytes as i64));
        }
    }

    /// Pushes `rax` as a new 16-byte slot.
    pub(super) fn push_rax(&mut self) {
        self.sub_rsp(16);
        self.add(Amd64Instruction::mov(Amd64Operand::qword(Amd64Address::rsp(0)), Amd64Register::Rax));
    }

    /// Pops the top 16-byte slot into `rax`.
    pub(super) fn pop_rax(&mut self) {
        self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Operand::qword(Amd64Address::rsp(0))));
        self.add_rsp(16);
    }

    pub(super) fn call_runtime(&mut self, symbol: &str, arguments: Vec<RuntimeArgument>) {
        let instructions = runtime_call(&self.session.platform, symbol, arguments);
        self.extend(instructions);
    }

    pub(super) fn layout_of(&self, ty: &Type) -> LayoutRecord {
        match self.session.layouts.layout_of(ty) {
            Ok(layout) => layout,
            Err(e) => panic!("ICE: no layout for `{ty}`: {e}"),
        }
    }

    pub(super) fn size_of(&self, ty: &Type) -> usize {
        self.layout_of(ty).size
    }

    pub(super) fn variable_address(&self, mangled: &str) -> Amd64Address {
        match self.function.variables.find(mangled) {
            Some((variable, VariableArea::Parameters)) => Amd64Address::rbp(self.frame.parameter_displacement(variable.offset())),
            Some((variable, VariableArea::Locals)) => Amd64Address::rbp(self.frame.local_displacement(variable.offset())),
            None => panic!("ICE: `{mangled}` is not a stack variable of `{}`", self.function.name.value()),
        }
    }

    /// Copies `size` bytes in the widest chunks possible, using `r11`.
    pub(super) fn copy(&mut self, destination: Amd64Address, source: Amd64Address, size: usize) {
        let mut offset = 0;

        while offset < size {
            let chunk = [8, 4, 2, 1].into_iter()
                .find(|chunk| size - offset >= *chunk)
                .and_then(OperandSize::from_bytes)
                .unwrap_or(OperandSize::Byte);

            let scratch = Amd64Operand::reg(Amd64Register::R11, chunk);
            self.add(Amd64Instruction::mov(scratch.clone(), Amd64Operand::memory(chunk, source.offset(offset))));
            self.add(Amd64Instruction::mov(Amd64Operand::memory(chunk, destination.offset(offset)), scratch));

            offset += chunk.bytes();
        }
    }

    /// Fills a slot of `size` bytes (a multiple of 8) at `destination` with zeroes.
    pub(super) fn zero(&mut self, destination: Amd64Address, size: usize) {
        for offset in (0..size).step_by(8) {
            self.add(Amd64Instruction::mov(Amd64Operand::qword(destination.offset(offset)), 0));
        }
    }

    /// Moves the `slot` bytes on top of the stack up over the `drop` bytes
    /// below them. Copies from the high end since the areas may overlap.
    pub(super) fn collapse(&mut self, slot: usize, drop: usize) {
        if drop == 0 {
            return;
        }

        for offset in (0..slot).step_by(8).rev() {
            self.add(Amd64Instruction::mov(Amd64Register::R11, Amd64Operand::qword(Amd64Address::rsp(offset))));
            self.add(Amd64Instruction::mov(Amd64Operand::qword(Amd64Address::rsp(offset + drop)), Amd64Register::R11));
        }

        self.add_rsp(drop);
    }

    /// Loads an integer, pointer or `bool` value of type `ty` into `register`,
    /// extending it to 64 bits.
    pub(super) fn load_integer(&mut self, register: Amd64Register, address: Amd64Address, ty: &Type) {
        let size = self.size_of(ty);
        self.load_sized(register, address, size, ty.is_plain(Type::I32));
    }

    pub(super) fn load_sized(&mut self, register: Amd64Register, address: Amd64Address, size: usize, signed: bool) {
        let instruction = match (size, signed) {
            (1, _) => Amd64Instruction::Movzx { dst: register, src: Amd64Operand::memory(OperandSize::Byte, address) },
            (2, _) => Amd64Instruction::Movzx { dst: register, src: Amd64Operand::memory(OperandSize::Word, address) },
            (4, true) => Amd64Instruction::Movsxd { dst: register, src: Amd64Operand::memory(OperandSize::Dword, address) },
            (4, false) => Amd64Instruction::mov(Amd64Operand::reg32(register), Amd64Operand::memory(OperandSize::Dword, address)),
            _ => Amd64Instruction::mov(register, Amd64Operand::qword(address)),
        };

        self.add(instruction);
    }
}

#[must_use]
pub(super) fn function_symbol(name: &str) -> BorString {
    BorString::new(format!("fn_{name}"))
}

fn expect_loop(loop_labels: Option<LoopLabels>) -> LoopLabels {
    match loop_labels {
        Some(labels) => labels,
        None => panic!("ICE: loop control outside of a loop"),
    }
}
