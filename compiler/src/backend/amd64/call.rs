// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use borzoi::{align_up, Binding, Expression, ForeignFunctionDeclaration, ForeignParameter, Ranged, SymbolKind, Type};

use crate::CallingConvention;

use super::{
    calling_convention::{
        plan_foreign_call,
        ArgumentPlacement,
        ForeignArgument,
        PointerPlacement,
        RegisterSlot,
        ReturnPlacement,
        ValueShape,
    },
    code_generator::{function_symbol, FunctionGenerator},
    runtime::GC_ADOPT,
    Amd64Address,
    Amd64Instruction,
    Amd64Operand,
    Amd64Register,
    FloatPrecision,
    XmmRegister,
};

impl FunctionGenerator<'_, '_> {
    /// Pushes the result slot of calling `binding`. Void calls push nothing.
    pub(super) fn emit_call(&mut self, binding: &Binding, arguments: &[Ranged<Expression>], return_type: &Type) {
        let tree = self.session.tree;

        match binding.kind {
            SymbolKind::Function => {
                self.emit_internal_call(&binding.mangled, arguments);

                if return_type.is_pointer() || return_type.is_array() {
                    self.add(Amd64Instruction::call(GC_ADOPT));
                }
            }

            SymbolKind::ForeignFunction => {
                let Some(function) = tree.foreign_function(&binding.mangled) else {
                    panic!("ICE: foreign function `{}` is not declared", binding.mangled);
                };
                self.emit_foreign_call(function, arguments, return_type);
            }

            _ => panic!("ICE: call of non-function `{}`", binding.mangled),
        }
    }

    /// Calls a Borzoi function: the caller reserves the return slot above the
    /// argument area, and the callee addresses both relative to `rbp`.
    fn emit_internal_call(&mut self, name: &str, arguments: &[Ranged<Expression>]) {
        let tree = self.session.tree;
        let (Some(callee), Some(frame)) = (tree.function(name), self.session.frames.get(name).copied()) else {
            panic!("ICE: function `{name}` is not declared");
        };

        self.sub_rsp(frame.return_slot_size());
        self.sub_rsp(frame.arguments_size);

        for (argument, parameter) in arguments.iter().zip(&callee.variables.parameters) {
            let size = self.size_of(&parameter.ty);
            let slot = align_up(size, 16);

            self.emit_expression(argument);
            self.copy(Amd64Address::rsp(slot + parameter.offset()), Amd64Address::rsp(0), size);
            self.add_rsp(slot);
        }

        self.add(Amd64Instruction::call(function_symbol(name)));
        self.add_rsp(frame.arguments_size);
    }

    fn emit_foreign_call(&mut self, function: &ForeignFunctionDeclaration, arguments: &[Ranged<Expression>], return_type: &Type) {
        let fixed = function.parameters.iter()
            .filter(|x| matches!(x, ForeignParameter::Typed { .. }))
            .count();

        let return_shape = if return_type.is_void() {
            None
        } else {
            Some(ValueShape::new(return_type, &self.layout_of(return_type)))
        };
        let result_slot = align_up(self.size_of(return_type), 16);
        self.sub_rsp(result_slot);

        let mut foreign_arguments = Vec::with_capacity(arguments.len());
        let mut slots = Vec::with_capacity(arguments.len());

        for (index, argument) in arguments.iter().enumerate() {
            let ty = argument.ty.resolved();
            let variadic = index >= fixed;

            self.emit_expression(argument);

            let shape = if variadic && ty.is_plain(Type::FLOAT) {
                // C promotes variadic floats to double.
                let xmm0 = XmmRegister::new(0);
                self.add(Amd64Instruction::MovFloat { precision: FloatPrecision::Single, dst: xmm0.into(), src: Amd64Address::rsp(0).into() });
                self.add(Amd64Instruction::CvtFloat { from: FloatPrecision::Single, dst: xmm0, src: xmm0 });
                self.add(Amd64Instruction::MovFloat { precision: FloatPrecision::Double, dst: Amd64Address::rsp(0).into(), src: xmm0.into() });
                ValueShape::double()
            } else {
                ValueShape::new(ty, &self.layout_of(ty))
            };

            slots.push(align_up(self.size_of(ty), 16));
            foreign_arguments.push(ForeignArgument { shape, variadic });
        }

        let convention = self.session.platform.calling_convention();
        let plan = plan_foreign_call(convention, &foreign_arguments, return_shape.as_ref());
        let area = plan.area_size();
        let slots_size: usize = slots.iter().sum();

        self.sub_rsp(area);

        // The slot of the last argument sits right above the call area.
        let mut slot_offset = area + slots_size;
        for ((placement, argument), slot) in plan.arguments.iter().zip(&foreign_arguments).zip(&slots) {
            slot_offset -= slot;
            self.place_argument(placement, &argument.shape, Amd64Address::rsp(slot_offset), plan.stack_size);
        }

        match &plan.return_value {
            ReturnPlacement::Hidden(register) => {
                self.add(Amd64Instruction::Lea { dst: *register, address: Amd64Address::rsp(area + slots_size) });
            }
            ReturnPlacement::Void | ReturnPlacement::Registers(..) => (),
        }

        if convention == CallingConvention::SystemV {
            self.add(Amd64Instruction::mov(Amd64Operand::reg32(Amd64Register::Rax), plan.vector_registers as i64));
        }

        self.add(Amd64Instruction::call(function.link_name().clone()));

        if let ReturnPlacement::Registers(registers) = &plan.return_value {
            let precision = return_shape.as_ref().and_then(|x| x.float);

            for (index, register) in registers.iter().enumerate() {
                let destination = Amd64Address::rsp(area + slots_size + index * 8);

                match register {
                    RegisterSlot::General(register) => {
                        self.add(Amd64Instruction::mov(Amd64Operand::qword(destination), *register));
                    }

                    RegisterSlot::Vector(register) => self.add(Amd64Instruction::MovFloat {
                        precision: precision.unwrap_or(FloatPrecision::Double),
                        dst: destination.into(),
                        src: (*register).into(),
                    }),
                }
            }
        }

        self.add_rsp(area + slots_size);
    }

    fn place_argument(&mut self, placement: &ArgumentPlacement, shape: &ValueShape, source: Amd64Address, stack_size: usize) {
        match placement {
            ArgumentPlacement::Registers(registers) => {
                let single = registers.len() == 1;

                for (index, register) in registers.iter().enumerate() {
                    let source = source.offset(index * 8);

                    match register {
                        RegisterSlot::General(register) if single => {
                            let signed = shape.size == 4 && shape.float.is_none();
                            self.load_sized(*register, source, shape.size, signed);
                        }

                        RegisterSlot::General(register) => {
                            self.add(Amd64Instruction::mov(*register, Amd64Operand::qword(source)));
                        }

                        RegisterSlot::Vector(register) => self.add(Amd64Instruction::MovFloat {
                            precision: match shape.float {
                                Some(precision) if single => precision,
                                _ => FloatPrecision::Double,
                            },
                            dst: (*register).into(),
                            src: source.into(),
                        }),
                    }
                }
            }

            ArgumentPlacement::Duplicated { vector, general } => {
                self.add(Amd64Instruction::MovFloat {
                    precision: FloatPrecision::Double,
                    dst: (*vector).into(),
                    src: source.clone().into(),
                });
                self.add(Amd64Instruction::mov(*general, Amd64Operand::qword(source)));
            }

            ArgumentPlacement::Stack { offset } => {
                self.copy(Amd64Address::rsp(*offset), source, align_up(shape.size, 8));
            }

            ArgumentPlacement::Reference { copy_offset, pointer } => {
                let copy = Amd64Address::rsp(stack_size + copy_offset);
                self.copy(copy.clone(), source, shape.size);

                match pointer {
                    PointerPlacement::Register(register) => {
                        self.add(Amd64Instruction::Lea { dst: *register, address: copy });
                    }

                    PointerPlacement::Stack { offset } => {
                        self.add(Amd64Instruction::Lea { dst: Amd64Register::Rax, address: copy });
                        self.add(Amd64Instruction::mov(Amd64Operand::qword(Amd64Address::rsp(*offset)), Amd64Register::Rax));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use borzoi::{parse_source_code, SemanticAnalyzer, SourceCode};
    use pretty_assertions::assert_eq;

    use crate::{backend::amd64::{Assembly, CodeGenerator}, Platform};

    fn generate(source: &str, platform: Platform) -> Assembly {
        _ = env_logger::builder().is_test(true).filter(None, log::LevelFilter::max()).try_init();

        let source_code = SourceCode::new_test(source.to_string());
        let output = parse_source_code(&source_code);
        assert!(!output.has_errors(), "{:#?} {:#?}", output.lexer_errors, output.parse_diagnostics);

        let mut tree = output.tree;
        let mut analyzer = SemanticAnalyzer::new(".");
        analyzer.analyze_tree(&mut tree);
        let (model, diagnostics) = analyzer.into_parts();
        assert!(diagnostics.is_empty(), "{diagnostics:#?}");

        CodeGenerator::generate(&platform, &model, &mut tree)
    }

    /// The lines from the first one starting with `from` up to the first one
    /// equal to `to`.
    fn section(assembly: &Assembly, from: &str, to: &str) -> Vec<String> {
        let lines: Vec<String> = assembly.text().iter().map(|x| x.to_string()).collect();
        let start = lines.iter().position(|x| x.starts_with(from)).unwrap();
        let end = start + lines[start..].iter().position(|x| x == to).unwrap();
        lines[start..=end].to_vec()
    }

    const ABS: &str = r#"
        cfn abs from labs(int value) int
        fn main() {
            call abs(7)
        }
    "#;

    #[test]
    fn foreign_call_on_linux() {
        let assembly = generate(ABS, Platform::linux());
        assert!(assembly.externs().iter().any(|x| x == "labs"));

        assert_eq!(section(&assembly, "; fn main", "call labs")[5..], [
            "sub rsp, 16",
            "mov rax, 7",
            "sub rsp, 16",
            "mov qword [rsp], rax",
            "mov rdi, qword [rsp]",
            "mov eax, 0",
            "call labs",
        ]);
    }

    #[test]
    fn foreign_call_on_windows_reserves_shadow_space() {
        let assembly = generate(ABS, Platform::windows());
        let lines = section(&assembly, "; fn main", "call labs");

        assert_eq!(lines[lines.len() - 3..], [
            "sub rsp, 32",
            "mov rcx, qword [rsp + 32]",
            "call labs",
        ]);
    }

    #[test]
    fn internal_call_reserves_return_and_arguments() {
        let assembly = generate(r#"
            fn twice(int value) int {
                ret value * 2
            }

            fn main() {
                call twice(4)
            }
        "#, Platform::linux());

        let lines = section(&assembly, "; fn main", "call fn_twice");
        assert_eq!(lines[lines.len() - 9..], [
            "sub rsp, 16",
            "sub rsp, 16",
            "mov rax, 4",
            "sub rsp, 16",
            "mov qword [rsp], rax",
            "mov r11, qword [rsp]",
            "mov qword [rsp + 16], r11",
            "add rsp, 16",
            "call fn_twice",
        ]);
    }

    #[test]
    fn returned_arrays_move_into_the_callers_frame() {
        let assembly = generate(r#"
            fn make() int[] {
                ret *4
            }

            fn main() {
                let int[] values = make()
            }
        "#, Platform::linux());

        assert!(!section(&assembly, "; fn make", "call gc$release").is_empty());

        let lines: Vec<String> = assembly.text().iter().map(|x| x.to_string()).collect();
        let call = lines.iter().position(|x| x == "call fn_make").unwrap();
        assert_eq!(lines[call + 1], "call gc$adopt");
    }

    #[test]
    fn foreign_pointer_results_are_not_adopted() {
        let assembly = generate(r#"
            cfn malloc(int size) byte@
            fn main() {
                call malloc(8)
            }
        "#, Platform::linux());

        let lines: Vec<String> = assembly.text().iter().map(|x| x.to_string()).collect();
        assert!(!lines.contains(&"call gc$adopt".to_string()));
    }

    #[test]
    fn variadic_floats_are_promoted() {
        let assembly = generate(r#"
            cfn printf(byte@ format, *) i32
            fn main() {
                call printf(null, 1.5 -> float)
            }
        "#, Platform::linux());

        let lines: Vec<String> = assembly.text().iter().map(|x| x.to_string()).collect();
        assert!(lines.contains(&"cvtss2sd xmm0, xmm0".to_string()));
        assert!(lines.contains(&"mov eax, 1".to_string()));
    }
}
