// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Expressions are evaluated onto the stack: every value occupies a slot of
//! its size rounded up to 16 bytes, starting at `[rsp]`.

use borzoi::{
    align_up,
    AccessorKind,
    BinaryExpression,
    BinaryOperator,
    ConstructorExpression,
    Expression,
    ExpressionKind,
    Ranged,
    SymbolKind,
    Type,
    UnaryOperator,
    VariableReference,
};

use super::{
    code_generator::FunctionGenerator,
    runtime::{check_allocation, RuntimeArgument, ERROR_BOUNDS, GC_PUSH, GC_RELEASE},
    Amd64Address,
    Amd64ConditionCode,
    Amd64Instruction,
    Amd64Operand,
    Amd64Register,
    ArithmeticOperation,
    FloatPrecision,
    JumpTarget,
    SseOperation,
    XmmRegister,
};

impl FunctionGenerator<'_, '_> {
    /// Pushes the value of `expression` as a new slot.
    pub(super) fn emit_expression(&mut self, expression: &Expression) {
        let ty = expression.ty.resolved();

        match &expression.kind {
            ExpressionKind::Integer(literal) => {
                let bits = match float_precision(ty) {
                    Some(FloatPrecision::Single) => i64::from((literal.value as f32).to_bits()),
                    Some(FloatPrecision::Double) => (literal.value as f64).to_bits() as i64,
                    None => literal.value as i64,
                };
                self.push_immediate(bits);
            }

            ExpressionKind::Float(value) => {
                let bits = match float_precision(ty) {
                    Some(FloatPrecision::Single) => i64::from((*value as f32).to_bits()),
                    _ => value.to_bits() as i64,
                };
                self.push_immediate(bits);
            }

            ExpressionKind::Boolean(value) => self.push_immediate(i64::from(*value)),

            ExpressionKind::Null => {
                self.sub_rsp(16);
                self.zero(Amd64Address::rsp(0), 16);
            }

            ExpressionKind::String(value) => self.emit_string(value.as_bytes()),

            ExpressionKind::Variable(variable) => self.emit_variable(variable),

            ExpressionKind::Parenthesized(inner) => self.emit_expression(inner),

            ExpressionKind::ArrayLiteral(elements) => self.emit_array_literal(elements, ty),

            ExpressionKind::ArrayAllocation(count) => self.emit_array_allocation(count, ty),

            ExpressionKind::AddressOf(variable) => {
                let temporary = self.emit_place(variable);
                debug_assert_eq!(temporary, 0, "address taken of a call result");
            }

            ExpressionKind::Unary { operator, operand } => self.emit_unary(*operator.value(), operand),

            ExpressionKind::Binary(expression) => self.emit_binary(expression),

            ExpressionKind::Conversion { expression, target } => {
                self.emit_expression(expression);
                self.emit_conversion(expression.ty.resolved(), target.value());
            }

            ExpressionKind::Constructor(constructor) => self.emit_constructor(constructor, ty),
        }
    }

    fn push_immediate(&mut self, value: i64) {
        self.add(Amd64Instruction::mov(Amd64Register::Rax, value));
        self.push_rax();
    }

    /// Heap-allocates the `{ptr, len}` array of `n` elements of `element_size`
    /// bytes into `rax` and registers it with the collector.
    fn allocate_array(&mut self, count: RuntimeArgument, element_size: usize) {
        self.call_runtime("calloc", vec![count, RuntimeArgument::Immediate(element_size.max(1) as i64)]);
        self.extend(check_allocation());
        self.add(Amd64Instruction::call(GC_PUSH));
    }

    fn emit_string(&mut self, bytes: &[u8]) {
        let label = self.session.add_string(bytes);
        let length = bytes.len() as i64;

        self.allocate_array(RuntimeArgument::Immediate(length.max(1)), 1);
        self.push_rax();
        self.add(Amd64Instruction::mov(Amd64Operand::qword(Amd64Address::rsp(8)), length));

        if length != 0 {
            self.add(Amd64Instruction::mov(Amd64Register::Rdi, Amd64Register::Rax));
            self.add(Amd64Instruction::Lea { dst: Amd64Register::Rsi, address: Amd64Address::symbol(label) });
            self.add(Amd64Instruction::mov(Amd64Register::Rcx, length));
            self.add(Amd64Instruction::RepMovsb);
        }
    }

    fn emit_array_literal(&mut self, elements: &[Ranged<Expression>], ty: &Type) {
        if elements.is_empty() {
            self.sub_rsp(16);
            self.zero(Amd64Address::rsp(0), 16);
            return;
        }

        let element_size = self.size_of(&ty.without_last_modifier());
        let slot = align_up(element_size, 16);

        self.allocate_array(RuntimeArgument::Immediate(elements.len() as i64), element_size);
        self.push_rax();
        self.add(Amd64Instruction::mov(Amd64Operand::qword(Amd64Address::rsp(8)), elements.len() as i64));

        for (index, element) in elements.iter().enumerate() {
            self.emit_expression(element);
            self.add(Amd64Instruction::mov(Amd64Register::R10, Amd64Operand::qword(Amd64Address::rsp(slot))));
            self.copy(Amd64Address::new(Amd64Register::R10).offset(index * element_size), Amd64Address::rsp(0), element_size);
            self.add_rsp(slot);
        }
    }

    fn emit_array_allocation(&mut self, count: &Expression, ty: &Type) {
        let element_size = self.size_of(&ty.without_last_modifier());

        // The slot of the count becomes the array, with the count as length.
        self.emit_expression(count);
        self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Operand::qword(Amd64Address::rsp(0))));
        self.add(Amd64Instruction::mov(Amd64Operand::qword(Amd64Address::rsp(8)), Amd64Register::Rax));
        self.add(Amd64Instruction::mov(Amd64Register::R10, 1));
        self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Test, Amd64Register::Rax, Amd64Register::Rax));
        self.add(Amd64Instruction::CMov {
            condition: Amd64ConditionCode::Equal,
            dst: Amd64Register::Rax,
            src: Amd64Operand::reg64(Amd64Register::R10),
        });

        self.allocate_array(RuntimeArgument::Register(Amd64Register::Rax), element_size);
        self.add(Amd64Instruction::mov(Amd64Operand::qword(Amd64Address::rsp(0)), Amd64Register::Rax));
    }

    /// Pushes the value a variable reference denotes.
    fn emit_variable(&mut self, variable: &VariableReference) {
        let binding = variable.binding();

        if let [call] = variable.accessors.as_slice() {
            if let AccessorKind::Call(arguments) = &call.kind {
                self.emit_call(binding, arguments, call.ty.resolved());
                return;
            }
        }

        let size = self.size_of(variable.resolved_type());
        let slot = align_up(size, 16);

        let temporary = self.emit_place(variable);
        self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Operand::qword(Amd64Address::rsp(0))));
        self.sub_rsp(slot);
        self.copy(Amd64Address::rsp(0), Amd64Address::new(Amd64Register::Rax), size);
        self.collapse(slot, 16 + temporary);
    }

    /// Pushes the address a variable reference denotes, returning the size of
    /// the call result kept below that address, if the chain starts with one.
    pub(super) fn emit_place(&mut self, variable: &VariableReference) -> usize {
        let binding = variable.binding();
        let mut accessors = variable.accessors.iter();
        let mut running = variable.base_ty.resolved().clone();

        let temporary = match binding.kind {
            SymbolKind::Parameter | SymbolKind::Local | SymbolKind::Iterator => {
                let address = self.variable_address(&binding.mangled);
                self.add(Amd64Instruction::Lea { dst: Amd64Register::Rax, address });
                self.push_rax();
                0
            }

            SymbolKind::Embed => {
                let address = Amd64Address::symbol(format!("emb${}", binding.mangled));
                self.add(Amd64Instruction::Lea { dst: Amd64Register::Rax, address });
                self.push_rax();
                0
            }

            SymbolKind::Function | SymbolKind::ForeignFunction => {
                let Some(AccessorKind::Call(arguments)) = accessors.next().map(|x| &x.kind) else {
                    panic!("ICE: function `{}` referenced without a call", binding.mangled);
                };

                running = variable.accessors[0].ty.resolved().clone();
                self.emit_call(binding, arguments, &running);

                self.add(Amd64Instruction::Lea { dst: Amd64Register::Rax, address: Amd64Address::rsp(0) });
                self.push_rax();
                align_up(self.size_of(&running), 16)
            }
        };

        for accessor in accessors {
            match &accessor.kind {
                AccessorKind::Member(name) => {
                    let layout = self.layout_of(&running);
                    let Some(member) = layout.member(name.value()) else {
                        panic!("ICE: `{running}` has no member `{}`", name.value());
                    };

                    if member.offset != 0 {
                        self.add(Amd64Instruction::arithmetic(
                            ArithmeticOperation::Add,
                            Amd64Operand::qword(Amd64Address::rsp(0)),
                            member.offset as i64,
                        ));
                    }
                }

                AccessorKind::Dereference => {
                    self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Operand::qword(Amd64Address::rsp(0))));
                    self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Operand::qword(Amd64Address::new(Amd64Register::Rax))));
                    self.add(Amd64Instruction::mov(Amd64Operand::qword(Amd64Address::rsp(0)), Amd64Register::Rax));
                }

                AccessorKind::Index(index) => {
                    let element_size = self.size_of(&running.without_last_modifier());

                    self.emit_expression(index);
                    self.add(Amd64Instruction::mov(Amd64Register::Rcx, Amd64Operand::qword(Amd64Address::rsp(0))));
                    self.add_rsp(16);

                    // The place slot holds the address of the `{ptr, len}` record.
                    self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Operand::qword(Amd64Address::rsp(0))));
                    self.add(Amd64Instruction::arithmetic(
                        ArithmeticOperation::Cmp,
                        Amd64Register::Rcx,
                        Amd64Operand::qword(Amd64Address::new(Amd64Register::Rax).offset(8)),
                    ));
                    self.add(Amd64Instruction::jcc(Amd64ConditionCode::AboveOrEqual, JumpTarget::Symbol(ERROR_BOUNDS.into())));

                    self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Operand::qword(Amd64Address::new(Amd64Register::Rax))));
                    self.add(Amd64Instruction::arithmetic(ArithmeticOperation::IMul, Amd64Register::Rcx, element_size as i64));
                    self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Add, Amd64Register::Rax, Amd64Register::Rcx));
                    self.add(Amd64Instruction::mov(Amd64Operand::qword(Amd64Address::rsp(0)), Amd64Register::Rax));
                }

                AccessorKind::Call(..) => panic!("ICE: call in the middle of an accessor chain of `{}`", variable.name.value()),
            }

            running = accessor.ty.resolved().clone();
        }

        temporary
    }

    fn emit_unary(&mut self, operator: UnaryOperator, operand: &Expression) {
        let ty = operand.ty.resolved();
        self.emit_expression(operand);

        let top = Amd64Operand::qword(Amd64Address::rsp(0));

        match operator {
            UnaryOperator::Not if ty.is_plain(Type::BOOL) => {
                self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Xor, top, 1));
            }

            UnaryOperator::Not => self.add(Amd64Instruction::Not(top)),

            UnaryOperator::Negate => match float_precision(ty) {
                Some(FloatPrecision::Single) => self.add(Amd64Instruction::Btc {
                    dst: Amd64Operand::memory(FloatPrecision::Single.operand_size(), Amd64Address::rsp(0)),
                    bit: 31,
                }),
                Some(FloatPrecision::Double) => self.add(Amd64Instruction::Btc { dst: top, bit: 63 }),
                None => self.add(Amd64Instruction::Neg(top)),
            },

            UnaryOperator::ManualRelease => {
                self.add(Amd64Instruction::mov(Amd64Register::Rax, top));
                self.add(Amd64Instruction::call(GC_RELEASE));
            }
        }
    }

    fn emit_binary(&mut self, expression: &BinaryExpression) {
        let operator = *expression.operator.value();
        let lhs_ty = expression.lhs.ty.resolved();
        let rhs_ty = expression.rhs.ty.resolved();

        self.emit_expression(&expression.lhs);
        self.emit_expression(&expression.rhs);

        if let Some(precision) = float_precision(lhs_ty) {
            self.emit_float_binary(operator, precision);
            return;
        }

        self.load_integer(Amd64Register::Rax, Amd64Address::rsp(16), lhs_ty);
        self.load_integer(Amd64Register::Rcx, Amd64Address::rsp(0), rhs_ty);
        self.add_rsp(16);

        let unsigned = !lhs_ty.is_plain(Type::INT) && !lhs_ty.is_plain(Type::I32);

        match operator {
            BinaryOperator::Add => self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Add, Amd64Register::Rax, Amd64Register::Rcx)),
            BinaryOperator::Subtract => self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Sub, Amd64Register::Rax, Amd64Register::Rcx)),
            BinaryOperator::Multiply => self.add(Amd64Instruction::arithmetic(ArithmeticOperation::IMul, Amd64Register::Rax, Amd64Register::Rcx)),
            BinaryOperator::And => self.add(Amd64Instruction::arithmetic(ArithmeticOperation::And, Amd64Register::Rax, Amd64Register::Rcx)),
            BinaryOperator::Or => self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Or, Amd64Register::Rax, Amd64Register::Rcx)),
            BinaryOperator::Xor => self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Xor, Amd64Register::Rax, Amd64Register::Rcx)),

            BinaryOperator::Divide => self.emit_division(unsigned),

            BinaryOperator::Modulo => {
                self.emit_division(unsigned);
                self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Register::Rdx));
            }

            BinaryOperator::FlooredModulo => {
                // The remainder takes the sign of the divisor, so a nonzero
                // remainder of the other sign is moved by one divisor.
                let done = self.next_label();
                self.emit_division(unsigned);
                self.add(Amd64Instruction::mov(Amd64Register::Rax, Amd64Register::Rdx));
                self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Test, Amd64Register::Rdx, Amd64Register::Rdx));
                self.add(Amd64Instruction::jcc(Amd64ConditionCode::Equal, done));
                self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Xor, Amd64Register::Rdx, Amd64Register::Rcx));
                self.add(Amd64Instruction::jcc(Amd64ConditionCode::GreaterOrEqual, done));
                self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Add, Amd64Register::Rax, Amd64Register::Rcx));
                self.add(Amd64Instruction::Label(done));
            }

            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::Less
            | BinaryOperator::LessOrEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterOrEqual => {
                self.add(Amd64Instruction::arithmetic(ArithmeticOperation::Cmp, Amd64Register::Rax, Amd64Register::Rcx));
                self.set_from_condition(operator, unsigned);
            }
        }

        self.add(Amd64Instruction::mov(Amd64Operand::qword(Amd64Address::rsp(0)), Amd64Register::Rax));
    }

    fn emit_division(&mut self, unsigned: bool) {
        if unsigned {
            self.add(Amd64Instruction::arithmetic(
                ArithmeticOperation::Xor,
                Amd64Operand::reg32(Amd64Register::Rdx),
                Amd64Operand::reg32(Amd64Register::Rdx),
            ));
            self.add(Amd64Instruction::Div { rhs: Amd64Operand::reg64(Amd64Register::Rcx) });
        } else {
            self.add(Amd64Instruction::Cqo);
            self.add(Amd64Instruction::IDiv { rhs: Amd64Operand::reg64(Amd64Register::Rcx) });
        }
    }

    /// Sets `rax` to 1 when the flags satisfy the comparison, else to 0.
    fn set_from_condition(&mut self, operator: BinaryOperator, unsigned: bool) {
        let Some(condition) = Amd64ConditionCode::for_comparison(operator, unsigned) else {
            panic!("ICE: `{operator}` is not a comparison");
        };

        let done = self.next_label();
        self.add(Amd64Instruction::mov(Amd64Register::Rax, 1));
        self.add(Amd64Instruction::jcc(condition, done));
        self.add(Amd64Instruction::mov(Amd64Register::Rax, 0));
        self.add(Amd64Instruction::Label(done));
    }

    /// Like `set_from_condition` after `ucomis`, but an unordered result
    /// (a NaN operand) only satisfies `!=`.
    fn set_from_float_condition(&mut self, operator: BinaryOperator) {
        let Some(condition) = Amd64ConditionCode::for_comparison(operator, true) else {
            panic!("ICE: `{operator}` is not a comparison");
        };

        let done = self.next_label();
        let unordered = i64::from(operator == BinaryOperator::NotEqual);
        self.add(Amd64Instruction::mov(Amd64Register::Rax, unordered));
        self.add(Amd64Instruction::jcc(Amd64ConditionCode::Parity, done));
        self.add(Amd64Instruction::mov(Amd64Register::Rax, 1));
        self.add(Amd64Instruction::jcc(condition, done));
        self.add(Amd64Instruction::mov(Amd64Register::Rax, 0));
        self.add(Amd64Instruction::Label(done));
    }

    fn emit_float_binary(&mut self, operator: BinaryOperator, precision: FloatPrecision) {
        let lhs = XmmRegister::new(0);
        let rhs = XmmRegister::new(1);

        self.add(Amd64Instruction::MovFloat { precision, dst: lhs.into(), src: Amd64Address::rsp(16).into() });
        self.add(Amd64Instruction::MovFloat { precision, dst: rhs.into(), src: Amd64Address::rsp(0).into() });
        self.add_rsp(16);

        let operation = match operator {
            BinaryOperator::Add => SseOperation::Add,
            BinaryOperator::Subtract => SseOperation::Sub,
            BinaryOperator::Multiply => SseOperation::Mul,
            BinaryOperator::Divide => SseOperation::Div,

            _ if operator.is_comparison() => {
                // ucomis sets the flags like an unsigned comparison.
                self.add(Amd64Instruction::Ucomis { precision, lhs, rhs });
                self.set_from_float_condition(operator);
                self.add(Amd64Instruction::mov(Amd64Operand::qword(Amd64Address::rsp(0)), Amd64Register::Rax));
                return;
            }

            _ => panic!("ICE: `{operator}` on floating-point operands"),
        };

        self.add(Amd64Instruction::SseArithmetic { operation, precision, dst: lhs, src: rhs });
        self.add(Amd64Instruction::MovFloat { precision, dst: Amd64Address::rsp(0).into(), src: lhs.into() });
    }

    /// Converts the value in the top slot from `from` to `to` in place.
    fn emit_conversion(&mut self, from: &Type, to: &Type) {
        let xmm0 = XmmRegister::new(0);
        let top = Amd64Address::rsp(0);

        match (float_precision(from), float_precision(to)) {
            (None, None) => {
                self.load_integer(Amd64Register::Rax, top.clone(), from);
                self.add(Amd64Instruction::mov(Amd64Operand::qword(top), Amd64Register::Rax));
            }

            (None, Some(precision)) => {
                self.load_integer(Amd64Register::Rax, top.clone(), from);
                self.add(Amd64Instruction::CvtIntToFloat { precision, dst: xmm0, src: Amd64Register::Rax });
                self.add(Amd64Instruction::MovFloat { precision, dst: top.into(), src: xmm0.into() });
            }

            (Some(precision), None) => {
                self.add(Amd64Instruction::MovFloat { precision, dst: xmm0.into(), src: top.clone().into() });
                self.add(Amd64Instruction::CvtFloatToInt { precision, dst: Amd64Register::Rax, src: xmm0 });
                self.add(Amd64Instruction::mov(Amd64Operand::qword(top), Amd64Register::Rax));
            }

            (Some(from), Some(to)) if from == to => (),

            (Some(from), Some(to)) => {
                self.add(Amd64Instruction::MovFloat { precision: from, dst: xmm0.into(), src: top.clone().into() });
                self.add(Amd64Instruction::CvtFloat { from, dst: xmm0, src: xmm0 });
                self.add(Amd64Instruction::MovFloat { precision: to, dst: top.into(), src: xmm0.into() });
            }
        }
    }

    fn emit_constructor(&mut self, constructor: &ConstructorExpression, ty: &Type) {
        let layout = self.layout_of(ty);
        let area = align_up(layout.size, 16);

        self.sub_rsp(area);
        self.zero(Amd64Address::rsp(0), area);

        for (argument, member) in constructor.arguments.iter().zip(&layout.members) {
            let size = self.size_of(&member.ty);
            let slot = align_up(size, 16);

            self.emit_expression(&argument.value);
            self.copy(Amd64Address::rsp(slot + member.offset), Amd64Address::rsp(0), size);
            self.add_rsp(slot);
        }
    }
}

#[must_use]
pub(super) fn float_precision(ty: &Type) -> Option<FloatPrecision> {
    if ty.is_plain(Type::DOUBLE) {
        Some(FloatPrecision::Double)
    } else if ty.is_plain(Type::FLOAT) {
        Some(FloatPrecision::Single)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use borzoi::{parse_source_code, SemanticAnalyzer, SourceCode};
    use rstest::rstest;

    use crate::{backend::amd64::{Assembly, CodeGenerator}, Platform};

    fn generate(source: &str) -> Assembly {
        _ = env_logger::builder().is_test(true).filter(None, log::LevelFilter::max()).try_init();

        let source_code = SourceCode::new_test(source.to_string());
        let output = parse_source_code(&source_code);
        assert!(!output.has_errors(), "{:#?} {:#?}", output.lexer_errors, output.parse_diagnostics);

        let mut tree = output.tree;
        let mut analyzer = SemanticAnalyzer::new(".");
        analyzer.analyze_tree(&mut tree);
        let (model, diagnostics) = analyzer.into_parts();
        assert!(diagnostics.is_empty(), "{diagnostics:#?}");

        CodeGenerator::generate(&Platform::linux(), &model, &mut tree)
    }

    fn contains_line(assembly: &Assembly, line: &str) -> bool {
        assembly.text().iter().any(|x| x.to_string() == line)
    }

    #[test]
    fn string_literals_are_copied_from_read_only_data() {
        let assembly = generate(r#"
            fn main() {
                let byte[] text = "hi"
            }
        "#);

        let text = assembly.to_string();
        assert!(text.contains("section .rodata\nalign 8\nstr$0: db 104, 105\n"), "{text}");
        assert!(contains_line(&assembly, "lea rsi, [rel str$0]"));
        assert!(contains_line(&assembly, "rep movsb"));
        assert!(contains_line(&assembly, "mov qword [rsp + 8], 2"));
    }

    #[test]
    fn indexing_checks_bounds() {
        let assembly = generate(r#"
            fn main() int {
                let int[] values = [1, 2, 3]
                ret values[1]
            }
        "#);

        assert!(contains_line(&assembly, "cmp rcx, qword [rax + 8]"));
        assert!(contains_line(&assembly, "jae err$bounds"));
        assert!(contains_line(&assembly, "imul rcx, 8"));
    }

    #[test]
    fn member_access_offsets_the_place() {
        let assembly = generate(r#"
            type Pair { byte a, int b }

            fn main() int {
                let Pair pair = Pair!{ 1, 2 }
                ret pair.b
            }
        "#);

        assert!(contains_line(&assembly, "add qword [rsp], 8"));
    }

    #[rstest]
    #[case("int", "1 / 2", "idiv rcx")]
    #[case("byte", "1 -> byte / 2 -> byte", "div rcx")]
    #[case("int", "7 %% 2", "xor rdx, rcx")]
    #[case("bool", "1 -> int < 2 -> int", "jl _L")]
    #[case("bool", "1 -> int > 2 -> int", "jg _L")]
    #[case("bool", "1 < 2", "jb _L")]
    #[case("bool", "1 -> byte < 2 -> byte", "jb _L")]
    #[case("double", "1.5 * 2.0", "mulsd xmm0, xmm1")]
    #[case("bool", "1.5 <= 2.0", "jbe _L")]
    #[case("float", "1.5 -> float", "cvtsd2ss xmm0, xmm0")]
    #[case("int", "1.5 -> int", "cvttsd2si rax, xmm0")]
    #[case("double", "-1.5", "btc qword [rsp], 63")]
    #[case("bool", "not true", "xor qword [rsp], 1")]
    fn operators(#[case] ty: &str, #[case] expression: &str, #[case] expected: &str) {
        let assembly = generate(&format!("fn main() {{ let {ty} value = {expression} }}"));

        assert!(
            assembly.text().iter().any(|x| x.to_string().starts_with(expected)),
            "`{expected}` missing from:\n{assembly}"
        );
    }

    #[rstest]
    #[case("1.5 == 2.0", "mov rax, 0")]
    #[case("1.5 < 2.0", "mov rax, 0")]
    #[case("1.5 != 2.0", "mov rax, 1")]
    fn float_comparisons_check_for_nan(#[case] expression: &str, #[case] unordered: &str) {
        let assembly = generate(&format!("fn main() {{ let bool value = {expression} }}"));
        let lines: Vec<String> = assembly.text().iter().map(|x| x.to_string()).collect();

        let parity = lines.iter().position(|x| x.starts_with("jp _L")).unwrap();
        assert!(lines[parity - 2].starts_with("ucomisd"), "{assembly}");
        assert_eq!(lines[parity - 1], unordered);
        assert_eq!(lines[parity + 1], "mov rax, 1");
    }

    #[test]
    fn array_allocation_uses_the_count_as_length() {
        let assembly = generate("fn main() { let int[] values = *4 }");

        assert!(contains_line(&assembly, "cmove rax, r10"));
        assert!(contains_line(&assembly, "mov rsi, 8"));
        assert!(contains_line(&assembly, "mov rdi, rax"));
    }
}
