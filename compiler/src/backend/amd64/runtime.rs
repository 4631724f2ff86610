// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The routines every program carries: the region collector, the traps and
//! the C entry point.
//!
//! The collector keeps a stack of heap pointers in `gc$data`. A frame starts
//! with the marker `-1`; leaving the frame frees everything above the marker.
//! Entries set to `0` were collected by hand and are skipped.
//!
//! A returned pointer moves to the caller's frame: `gc$release` detaches it
//! from the callee's frame into `gc$moved`, and `gc$adopt` pushes it again
//! once the call is done.

use borzoi::BorString;

use crate::{CallingConvention, Platform};

use super::{
    Amd64Address,
    Amd64ConditionCode,
    Amd64Instruction,
    Amd64Operand,
    Amd64Register,
    ArithmeticOperation,
    Assembly,
    DataItem,
    JumpTarget,
    Label,
    OperandSize,
};

pub const GC_PUSH: &str = "gc$push";
pub const GC_ENTER: &str = "gc$enter";
pub const GC_EXIT: &str = "gc$exit";
pub const GC_RELEASE: &str = "gc$release";
pub const GC_COLLECT: &str = "gc$collect";
pub const GC_ADOPT: &str = "gc$adopt";

pub const ERROR_OUT_OF_MEMORY: &str = "err$oom";
pub const ERROR_BOUNDS: &str = "err$bounds";

pub const EXIT_CODE_OUT_OF_MEMORY: i64 = 12;
pub const EXIT_CODE_BOUNDS: i64 = 13;

const GC_DATA: &str = "gc$data";
const GC_LEN: &str = "gc$len";
const GC_CAP: &str = "gc$cap";
const GC_MOVED: &str = "gc$moved";

const GC_INITIAL_CAPACITY: i64 = 16;
const GC_MARKER: i64 = -1;

/// The C functions the generated code relies on.
pub const C_RUNTIME: [&str; 4] = ["calloc", "realloc", "free", "exit"];

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeArgument {
    Register(Amd64Register),
    Memory(Amd64Address),
    Immediate(i64),
}

impl RuntimeArgument {
    fn into_operand(self) -> Amd64Operand {
        match self {
            Self::Register(register) => Amd64Operand::reg64(register),
            Self::Memory(address) => Amd64Operand::qword(address),
            Self::Immediate(value) => Amd64Operand::Immediate(value),
        }
    }
}

/// Calls the C function `symbol` with integer arguments, assuming an aligned
/// stack. The sources must not be argument registers themselves.
#[must_use]
pub fn runtime_call(platform: &Platform, symbol: &str, arguments: Vec<RuntimeArgument>) -> Vec<Amd64Instruction> {
    let symbol = BorString::new(symbol);
    let registers: &[Amd64Register] = match platform.calling_convention() {
        CallingConvention::MicrosoftX64 => &Amd64Register::MICROSOFT_ARGUMENTS,
        CallingConvention::SystemV => &Amd64Register::SYSTEM_V_ARGUMENTS,
    };

    let mut instructions = Vec::new();

    for (argument, register) in arguments.into_iter().zip(registers) {
        debug_assert!(
            !matches!(argument, RuntimeArgument::Register(source) if registers.contains(&source)),
            "argument source {argument:?} is an argument register"
        );

        instructions.push(Amd64Instruction::mov(*register, argument.into_operand()));
    }

    if platform.is_windows() {
        instructions.push(Amd64Instruction::arithmetic(ArithmeticOperation::Sub, Amd64Register::Rsp, 32));
        instructions.push(Amd64Instruction::call(symbol.clone()));
        instructions.push(Amd64Instruction::arithmetic(ArithmeticOperation::Add, Amd64Register::Rsp, 32));
    } else {
        instructions.push(Amd64Instruction::call(symbol.clone()));
    }

    instructions
}

/// `test rax, rax` followed by a jump to the out-of-memory trap.
#[must_use]
pub fn check_allocation() -> [Amd64Instruction; 2] {
    [
        Amd64Instruction::arithmetic(ArithmeticOperation::Test, Amd64Register::Rax, Amd64Register::Rax),
        Amd64Instruction::jcc(Amd64ConditionCode::Equal, JumpTarget::Symbol(ERROR_OUT_OF_MEMORY.into())),
    ]
}

/// Emits the collector state and routines, the traps and `main` into
/// `assembly`. `next_label` hands out program-unique labels.
pub fn emit_runtime(assembly: &mut Assembly, platform: &Platform, main_return_size: Option<usize>, mut next_label: impl FnMut() -> Label) {
    for name in C_RUNTIME {
        assembly.add_extern(name);
    }

    for label in [GC_DATA, GC_LEN, GC_CAP, GC_MOVED] {
        assembly.add_bss(DataItem::Reserve { label: label.into(), quads: 1 });
    }

    let mut emitter = RuntimeEmitter {
        platform,
        instructions: Vec::new(),
    };

    emitter.emit_entry_point(main_return_size);
    emitter.emit_push(next_label());
    emitter.emit_enter();
    emitter.emit_exit(next_label(), next_label());
    emitter.emit_release(next_label());
    emitter.emit_adopt(next_label());
    emitter.emit_collect(next_label(), next_label());
    emitter.emit_trap(ERROR_OUT_OF_MEMORY, EXIT_CODE_OUT_OF_MEMORY);
    emitter.emit_trap(ERROR_BOUNDS, EXIT_CODE_BOUNDS);

    assembly.extend_text(emitter.instructions);
}

struct RuntimeEmitter<'p> {
    platform: &'p Platform,
    instructions: Vec<Amd64Instruction>,
}

impl RuntimeEmitter<'_> {
    fn add(&mut self, instruction: Amd64Instruction) {
        self.instructions.push(instruction);
    }

    fn symbol(&mut self, name: &str) {
        self.add(Amd64Instruction::Symbol(BorString::new(name)));
    }

    fn call_c(&mut self, symbol: &str, arguments: Vec<RuntimeArgument>) {
        let instructions = runtime_call(self.platform, symbol, arguments);
        self.instructions.extend(instructions);
    }

    fn prologue(&mut self) {
        self.add(Amd64Instruction::Push(Amd64Register::Rbp));
        self.add(Amd64Instruction::mov(Amd64Register::Rbp, Amd64Register::Rsp));
    }

    fn epilogue(&mut self) {
        self.add(Amd64Instruction::mov(Amd64Register::Rsp, Amd64Register::Rbp));
        self.add(Amd64Instruction::Pop(Amd64Register::Rbp));
        self.add(Amd64Instruction::Ret);
    }

    fn state(name: &str) -> Amd64Operand {
        Amd64Operand::qword(Amd64Address::symbol(BorString::new(name)))
    }

    /// The C `main`, calling `fn_main` and turning its result into the exit
    /// code. `rsi` and `rdi` are callee-saved under the Microsoft convention
    /// and used freely by the generated code.
    fn emit_entry_point(&mut self, return_size: Option<usize>) {
        self.add(Amd64Instruction::Comment("entry point".into()));
        self.symbol("main");
        self.prologue();
        self.add(Amd64Instruction::Push(Amd64Register::Rsi));
        self.add(Amd64Instruction::Push(Amd64Register::Rdi));

        let return_size = return_size.unwrap_or(0);
        if return_size != 0 {
            self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Sub, Amd64Register::Rsp, 16));
        }

        self.add(Amd64Instruction::call("fn_main"));

        let result = Amd64Address::rsp(0);
        match return_size {
            0 => self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Xor, Amd64Operand::reg32(Amd64Register::Rax), Amd64Operand::reg32(Amd64Register::Rax))),
            1 => self.add(Amd64Instruction::Movzx { dst: Amd64Register::Rax, src: Amd64Operand::memory(OperandSize::Byte, result) }),
            4 => self.add(Amd64Instruction::Movsxd { dst: Amd64Register::Rax, src: Amd64Operand::memory(OperandSize::Dword, result) }),
            _ => self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Operand::qword(result))),
        }

        self.add(Amd64Instruction::Lea { dst: Amd64Register::Rsp, address: Amd64Address::rbp(-16) });
        self.add(Amd64Instruction::Pop(Amd64Register::Rdi));
        self.add(Amd64Instruction::Pop(Amd64Register::Rsi));
        self.add(Amd64Instruction::Pop(Amd64Register::Rbp));
        self.add(Amd64Instruction::Ret);
    }

    /// Appends `rax` to the collector stack, growing it when full. Keeps `rax`.
    fn emit_push(&mut self, store: Label) {
        use Amd64Register::*;

        self.symbol(GC_PUSH);
        self.prologue();
        self.add(Amd64Instruction::Push(Rax));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Sub, Rsp, 8));

        self.add(Amd64Instruction::mov(Rcx, Self::state(GC_LEN)));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Cmp, Rcx, Self::state(GC_CAP)));
        self.add(Amd64Instruction::jcc(Amd64ConditionCode::Below, store));

        self.add(Amd64Instruction::mov(Rdx, Self::state(GC_CAP)));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Add, Rdx, Rdx));
        self.add(Amd64Instruction::mov(R10, GC_INITIAL_CAPACITY));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Test, Rdx, Rdx));
        self.add(Amd64Instruction::CMov { condition: Amd64ConditionCode::Equal, dst: Rdx, src: R10.into() });
        self.add(Amd64Instruction::mov(Self::state(GC_CAP), Rdx));

        self.add(Amd64Instruction::mov(R11, Rdx));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::IMul, R11, 8));
        self.add(Amd64Instruction::mov(R10, Self::state(GC_DATA)));
        self.call_c("realloc", vec![RuntimeArgument::Register(R10), RuntimeArgument::Register(R11)]);
        self.instructions.extend(check_allocation());
        self.add(Amd64Instruction::mov(Self::state(GC_DATA), Rax));

        self.add(Amd64Instruction::Label(store));
        self.add(Amd64Instruction::mov(Rcx, Self::state(GC_DATA)));
        self.add(Amd64Instruction::mov(Rdx, Self::state(GC_LEN)));
        self.add(Amd64Instruction::mov(Rax, Amd64Operand::qword(Amd64Address::rbp(-8))));
        self.add(Amd64Instruction::mov(Amd64Operand::qword(Amd64Address::new(Rcx).with_index(Rdx, 8)), Rax));
        self.add(Amd64Instruction::Inc(Self::state(GC_LEN)));
        self.epilogue();
    }

    fn emit_enter(&mut self) {
        self.symbol(GC_ENTER);
        self.prologue();
        self.add(Amd64Instruction::mov(Amd64Register::Rax, GC_MARKER));
        self.add(Amd64Instruction::call(GC_PUSH));
        self.epilogue();
    }

    /// Frees every entry down to and including the nearest marker.
    fn emit_exit(&mut self, next: Label, done: Label) {
        use Amd64Register::*;

        self.symbol(GC_EXIT);
        self.prologue();

        self.add(Amd64Instruction::Label(next));
        self.add(Amd64Instruction::mov(Rcx, Self::state(GC_LEN)));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Test, Rcx, Rcx));
        self.add(Amd64Instruction::jcc(Amd64ConditionCode::Equal, done));
        self.add(Amd64Instruction::Dec(Rcx.into()));
        self.add(Amd64Instruction::mov(Self::state(GC_LEN), Rcx));
        self.add(Amd64Instruction::mov(Rdx, Self::state(GC_DATA)));
        self.add(Amd64Instruction::mov(Rax, Amd64Operand::qword(Amd64Address::new(Rdx).with_index(Rcx, 8))));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Cmp, Rax, GC_MARKER));
        self.add(Amd64Instruction::jcc(Amd64ConditionCode::Equal, done));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Test, Rax, Rax));
        self.add(Amd64Instruction::jcc(Amd64ConditionCode::Equal, next));
        self.add(Amd64Instruction::mov(R10, Rax));
        self.call_c("free", vec![RuntimeArgument::Register(R10)]);
        self.add(Amd64Instruction::jmp(next));

        self.add(Amd64Instruction::Label(done));
        self.epilogue();
    }

    /// Pops `rax` without freeing it, but only when it is the newest entry.
    /// The popped pointer is left in `gc$moved`, which is zero otherwise.
    fn emit_release(&mut self, done: Label) {
        use Amd64Register::*;

        self.symbol(GC_RELEASE);
        self.add(Amd64Instruction::mov(Self::state(GC_MOVED), 0));
        self.add(Amd64Instruction::mov(Rcx, Self::state(GC_LEN)));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Test, Rcx, Rcx));
        self.add(Amd64Instruction::jcc(Amd64ConditionCode::Equal, done));
        self.add(Amd64Instruction::mov(Rdx, Self::state(GC_DATA)));
        self.add(Amd64Instruction::arithmetic(
            ArithmeticOperation::Cmp,
            Rax,
            Amd64Operand::qword(Amd64Address::new(Rdx).with_index(Rcx, 8).with_displacement(-8)),
        ));
        self.add(Amd64Instruction::jcc(Amd64ConditionCode::NotEqual, done));
        self.add(Amd64Instruction::Dec(Self::state(GC_LEN)));
        self.add(Amd64Instruction::mov(Self::state(GC_MOVED), Rax));
        self.add(Amd64Instruction::Label(done));
        self.add(Amd64Instruction::Ret);
    }

    /// Pushes the pointer released by the last return into the current
    /// frame. Keeps the stack as `gc$push` expects it by tail-calling it.
    fn emit_adopt(&mut self, done: Label) {
        use Amd64Register::*;

        self.symbol(GC_ADOPT);
        self.add(Amd64Instruction::mov(Rax, Self::state(GC_MOVED)));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Test, Rax, Rax));
        self.add(Amd64Instruction::jcc(Amd64ConditionCode::Equal, done));
        self.add(Amd64Instruction::mov(Self::state(GC_MOVED), 0));
        self.add(Amd64Instruction::jmp(JumpTarget::Symbol(GC_PUSH.into())));
        self.add(Amd64Instruction::Label(done));
        self.add(Amd64Instruction::Ret);
    }

    /// Replaces the newest entry equal to `rax` with a tombstone, then frees
    /// `rax`.
    fn emit_collect(&mut self, search: Label, free: Label) {
        use Amd64Register::*;

        self.symbol(GC_COLLECT);
        self.prologue();
        self.add(Amd64Instruction::mov(Rcx, Self::state(GC_LEN)));
        self.add(Amd64Instruction::mov(Rdx, Self::state(GC_DATA)));

        self.add(Amd64Instruction::Label(search));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Test, Rcx, Rcx));
        self.add(Amd64Instruction::jcc(Amd64ConditionCode::Equal, free));
        self.add(Amd64Instruction::Dec(Rcx.into()));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Cmp, Rax, Amd64Operand::qword(Amd64Address::new(Rdx).with_index(Rcx, 8))));
        self.add(Amd64Instruction::jcc(Amd64ConditionCode::NotEqual, search));
        self.add(Amd64Instruction::mov(Amd64Operand::qword(Amd64Address::new(Rdx).with_index(Rcx, 8)), 0));

        self.add(Amd64Instruction::Label(free));
        self.add(Amd64Instruction::mov(R10, Rax));
        self.call_c("free", vec![RuntimeArgument::Register(R10)]);
        self.epilogue();
    }

    fn emit_trap(&mut self, name: &str, exit_code: i64) {
        self.symbol(name);
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::And, Amd64Register::Rsp, -16));
        self.call_c("exit", vec![RuntimeArgument::Immediate(exit_code)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime_text(platform: Platform, main_return_size: Option<usize>) -> String {
        let mut assembly = Assembly::new(platform.clone());
        let mut counter = 0;
        emit_runtime(&mut assembly, &platform, main_return_size, || {
            counter += 1;
            Label(counter)
        });
        assembly.to_string()
    }

    #[test]
    fn declares_state_and_routines() {
        let text = runtime_text(Platform::linux(), Some(8));

        for needle in ["extern calloc\n", "extern free\n", "gc$data: resq 1", "gc$push:\n", "gc$enter:\n", "gc$exit:\n", "gc$release:\n", "gc$adopt:\n", "gc$collect:\n", "gc$moved: resq 1", "err$oom:\n", "err$bounds:\n", "main:\n"] {
            assert!(text.contains(needle), "missing {needle:?} in\n{text}");
        }

        assert!(text.contains("mov rdi, 12\n"), "{text}");
        assert!(text.contains("mov rax, qword [rsp]\n"), "{text}");
    }

    #[test]
    fn released_pointers_are_adopted_by_the_caller() {
        let text = runtime_text(Platform::linux(), None);

        assert!(text.contains("    dec qword [rel gc$len]\n    mov qword [rel gc$moved], rax\n"), "{text}");
        assert!(text.contains("gc$adopt:\n    mov rax, qword [rel gc$moved]\n"), "{text}");
        assert!(text.contains("    mov qword [rel gc$moved], 0\n    jmp gc$push\n"), "{text}");
    }

    #[test]
    fn windows_calls_reserve_shadow_space() {
        let text = runtime_text(Platform::windows(), None);

        assert!(text.contains("mov rcx, 13\n    sub rsp, 32\n    call exit\n"), "{text}");
        assert!(text.contains("xor eax, eax\n"), "{text}");
    }

    #[test]
    fn runtime_call_uses_the_argument_registers() {
        let instructions = runtime_call(&Platform::linux(), "calloc", vec![
            RuntimeArgument::Register(Amd64Register::Rax),
            RuntimeArgument::Immediate(8),
        ]);

        let text: Vec<_> = instructions.iter().map(|x| x.to_string()).collect();
        assert_eq!(text, ["mov rdi, rax", "mov rsi, 8", "call calloc"]);
    }
}
