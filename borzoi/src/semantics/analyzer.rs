// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{collections::HashSet, path::PathBuf};

use log::{debug, trace};

use crate::*;
use super::*;

/// The semantic state the code generator needs after analysis.
#[derive(Debug)]
pub struct SemanticModel {
    pub layouts: LayoutRegistry,
    pub symbols: SymbolTable,
}

#[derive(Debug)]
pub struct SemanticAnalyzer {
    layouts: LayoutRegistry,
    symbols: SymbolTable,
    known_types: HashSet<BorString>,
    diagnostics: Vec<SemanticDiagnostic>,
    base_directory: PathBuf,
}

struct FunctionContext<'a> {
    return_type: &'a Ranged<Type>,
    locals: &'a mut Vec<StackVariable>,
    loop_depth: usize,
}

impl SemanticAnalyzer {
    /// `base_directory` is the directory embedded files are resolved against.
    #[must_use]
    pub fn new(base_directory: impl Into<PathBuf>) -> Self {
        let known_types = [Type::INT, Type::I32, Type::BYTE, Type::BOOL, Type::DOUBLE, Type::FLOAT, Type::VOID]
            .into_iter()
            .map(BorString::new_static)
            .collect();

        Self {
            layouts: LayoutRegistry::new(),
            symbols: SymbolTable::new(),
            known_types,
            diagnostics: Vec::new(),
            base_directory: base_directory.into(),
        }
    }

    /// Annotates `tree` in place: every expression receives its type, every
    /// name its mangled binding and every function its stack variables.
    pub fn analyze_tree(&mut self, tree: &mut ParseTree) {
        self.analyze_records(&tree.records);

        for function in &tree.functions {
            self.declare_function(function);
        }

        for function in &tree.foreign_functions {
            self.declare_foreign_function(function);
        }

        for embed in &mut tree.embeds {
            self.declare_embed(embed);
        }

        self.check_entry_point(tree);

        for function in &mut tree.functions {
            self.analyze_function(function);
        }

        debug!("Analyzed {} with {} symbols and {} diagnostics", tree.module_name(), self.symbols.len(), self.diagnostics.len());
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[SemanticDiagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn into_parts(self) -> (SemanticModel, Vec<SemanticDiagnostic>) {
        let model = SemanticModel {
            layouts: self.layouts,
            symbols: self.symbols,
        };

        (model, self.diagnostics)
    }

    fn emit(&mut self, diagnostic: SemanticDiagnostic) {
        trace!("Semantic diagnostic at {}: {diagnostic}", diagnostic.range());
        self.diagnostics.push(diagnostic);
    }

    fn report<T>(&mut self, range: FileRange, kind: SemanticDiagnosticKind) -> Option<T> {
        self.emit(SemanticDiagnostic::new(range, kind));
        None
    }

    fn analyze_records(&mut self, records: &[RecordDeclaration]) {
        for record in records {
            self.known_types.insert(record.name.value().clone());
        }

        for record in records {
            for member in &record.members {
                self.check_type_exists(&member.ty);
            }
        }

        let Err(errors) = self.layouts.register_records(records) else {
            return;
        };

        for (index, error) in errors {
            let record = &records[index];

            let diagnostic = match error {
                LayoutError::DuplicateType { name } => {
                    let other = records.iter()
                        .enumerate()
                        .find(|(idx, x)| *idx != index && x.name.value() == &name)
                        .map(|(_, x)| SemanticRelatedInformation::new(x.name.range(), SemanticRelatedMessage::FirstDeclaredHere { name: name.clone() }));

                    SemanticDiagnostic::new(record.name.range(), SemanticDiagnosticKind::AlreadyExists { name })
                        .with_related(other)
                }

                // Reported while checking the member types.
                LayoutError::UnknownType { .. } => continue,

                LayoutError::NotMaterializable { ty } => {
                    SemanticDiagnostic::new(record.name.range(), SemanticDiagnosticKind::UnknownType { ty })
                }

                LayoutError::Cycle { name } => {
                    SemanticDiagnostic::new(record.name.range(), SemanticDiagnosticKind::CantFigureTypes { name })
                }
            };

            self.emit(diagnostic);
        }
    }

    fn check_type_exists(&mut self, ty: &Ranged<Type>) -> bool {
        if ty.name().is_some_and(|name| self.known_types.contains(name)) {
            return true;
        }

        self.emit(SemanticDiagnostic::new(ty.range(), SemanticDiagnosticKind::UnknownType { ty: ty.value().clone() }));
        false
    }

    /// Declares `symbol`, reporting a clash with an existing symbol.
    fn declare(&mut self, symbol: Symbol) -> bool {
        let range = symbol.range;
        let name = symbol.name.clone();

        let related = match self.symbols.declare(symbol) {
            Ok(..) => return true,
            Err(existing) => SemanticRelatedInformation::new(existing.range, SemanticRelatedMessage::FirstDeclaredHere {
                name: existing.name.clone(),
            }),
        };

        self.emit(SemanticDiagnostic::new(range, SemanticDiagnosticKind::AlreadyExists { name }).with_related(related));
        false
    }

    fn declare_function(&mut self, function: &FunctionDeclaration) {
        for parameter in &function.parameters {
            self.check_type_exists(&parameter.ty);
        }

        self.check_type_exists(&function.return_type);

        self.declare(Symbol {
            name: function.name.value().clone(),
            mangled: function.name.value().clone(),
            ty: function.signature(),
            range: function.name.range(),
            kind: SymbolKind::Function,
        });
    }

    fn declare_foreign_function(&mut self, function: &ForeignFunctionDeclaration) {
        let last = function.parameters.len().saturating_sub(1);

        for (idx, parameter) in function.parameters.iter().enumerate() {
            match parameter {
                ForeignParameter::Typed { ty, .. } => {
                    self.check_type_exists(ty);
                }

                ForeignParameter::Variadic(range) => {
                    if idx != last {
                        self.emit(SemanticDiagnostic::new(*range, SemanticDiagnosticKind::InvalidVarargPosition));
                    }
                }
            }
        }

        self.check_type_exists(&function.return_type);

        self.declare(Symbol {
            name: function.name.value().clone(),
            mangled: function.name.value().clone(),
            ty: function.signature(),
            range: function.name.range(),
            kind: SymbolKind::ForeignFunction,
        });
    }

    fn declare_embed(&mut self, embed: &mut EmbedDeclaration) {
        let path = self.base_directory.join(embed.path.as_str());

        if path.is_file() {
            embed.resolved_path = Some(path);
        } else {
            self.emit(SemanticDiagnostic::new(embed.path.range(), SemanticDiagnosticKind::EmbedNotFound { path }));
        }

        self.declare(Symbol {
            name: embed.name.value().clone(),
            mangled: embed.name.value().clone(),
            ty: Type::byte_array(),
            range: embed.name.range(),
            kind: SymbolKind::Embed,
        });
    }

    fn check_entry_point(&mut self, tree: &ParseTree) {
        let Some(main) = tree.function("main") else {
            self.emit(SemanticDiagnostic::new(FileRange::default(), SemanticDiagnosticKind::NoEntryPoint));
            return;
        };

        let return_type = main.return_type.value();
        if !main.parameters.is_empty() || !(return_type.is_void() || return_type.is_integer()) {
            let related = SemanticRelatedInformation::new(main.name.range(), SemanticRelatedMessage::FunctionDeclaredHere {
                name: main.name.value().clone(),
            });

            self.emit(SemanticDiagnostic::new(main.name.range(), SemanticDiagnosticKind::InvalidEntryPoint).with_related(related));
        }
    }

    fn analyze_function(&mut self, function: &mut FunctionDeclaration) {
        let FunctionDeclaration { name, parameters, return_type, body, variables, .. } = function;
        let scope = ScopePath::function(name.value().clone());

        variables.parameters.clear();
        variables.locals.clear();

        for parameter in parameters.iter() {
            let mangled = scope.mangle(parameter.name.value());

            self.declare(Symbol {
                name: parameter.name.value().clone(),
                mangled: mangled.clone(),
                ty: parameter.ty.value().clone(),
                range: parameter.name.range(),
                kind: SymbolKind::Parameter,
            });

            // Kept even when the name clashes, so parameter positions keep
            // lining up with the arguments.
            variables.parameters.push(StackVariable::new(parameter.ty.value().clone(), mangled));
        }

        let mut context = FunctionContext {
            return_type,
            locals: &mut variables.locals,
            loop_depth: 0,
        };

        self.analyze_block(&scope, body, &mut context);

        if !return_type.is_void() && !body.ends_in_return() {
            let related = SemanticRelatedInformation::new(return_type.range(), SemanticRelatedMessage::ReturnTypeDeclaredHere {
                ty: return_type.value().clone(),
            });

            let kind = SemanticDiagnosticKind::NoReturn {
                name: name.value().clone(),
                ty: return_type.value().clone(),
            };

            self.emit(SemanticDiagnostic::new(name.range(), kind).with_related(related));
        }
    }

    fn analyze_block(&mut self, scope: &ScopePath, block: &mut Block, ctx: &mut FunctionContext<'_>) {
        let mut counters = SegmentCounters::default();

        for statement in &mut block.statements {
            _ = self.analyze_statement(scope, &mut counters, statement, ctx);
        }
    }

    fn analyze_statement(
        &mut self,
        scope: &ScopePath,
        counters: &mut SegmentCounters,
        statement: &mut Statement,
        ctx: &mut FunctionContext<'_>,
    ) -> Option<()> {
        let range = statement.range;

        match &mut statement.kind {
            StatementKind::Let(let_statement) => self.analyze_let(scope, let_statement, ctx),

            StatementKind::Mut { target, value } => {
                if target.ends_in_call() {
                    return self.report(target.range(), SemanticDiagnosticKind::MutDestinationAcc);
                }

                let ty = self.infer_variable(scope, target.value_mut()).into_valid()?;
                let actual = self.infer_type(scope, value, &ty).into_valid()?;

                if actual != ty {
                    return self.report(value.range(), SemanticDiagnosticKind::TypeMismatch { expected: ty, actual });
                }

                Some(())
            }

            StatementKind::Call(expression) => {
                if !expression.is_call() {
                    return self.report(expression.range(), SemanticDiagnosticKind::NotACall);
                }

                self.infer_type(scope, expression, &Type::Invalid).into_valid()?;
                Some(())
            }

            StatementKind::Collect(expression) => {
                let ty = self.infer_type(scope, expression, &Type::Invalid).into_valid()?;

                if !ty.is_pointer() && !ty.is_array() {
                    return self.report(expression.range(), SemanticDiagnosticKind::NotPointerType { ty });
                }

                Some(())
            }

            StatementKind::Return(None) => {
                if !ctx.return_type.is_void() {
                    let related = SemanticRelatedInformation::new(ctx.return_type.range(), SemanticRelatedMessage::ReturnTypeDeclaredHere {
                        ty: ctx.return_type.value().clone(),
                    });

                    let kind = SemanticDiagnosticKind::ReturnEmpty { expected: ctx.return_type.value().clone() };
                    self.emit(SemanticDiagnostic::new(range, kind).with_related(related));
                    return None;
                }

                Some(())
            }

            StatementKind::Return(Some(value)) => {
                if ctx.return_type.is_void() {
                    return self.report(value.range(), SemanticDiagnosticKind::ReturnValueInVoid);
                }

                let expected = ctx.return_type.value();
                let actual = self.infer_type(scope, value, expected).into_valid()?;

                if actual != *expected {
                    let expected = expected.clone();
                    return self.report(value.range(), SemanticDiagnosticKind::RetTypeMismatch { expected, actual });
                }

                Some(())
            }

            StatementKind::Break => self.check_in_loop(range, "break", ctx),
            StatementKind::Continue => self.check_in_loop(range, "continue", ctx),

            StatementKind::If { condition, then_block, else_block } => {
                let index = counters.next(SegmentKind::If);
                let condition = self.check_condition(scope, condition);

                self.analyze_block(&scope.child(SegmentKind::If, index), then_block, ctx);

                if let Some(else_block) = else_block {
                    self.analyze_block(&scope.child(SegmentKind::Else, index), else_block, ctx);
                }

                condition
            }

            StatementKind::While { condition, body } => {
                let index = counters.next(SegmentKind::While);
                let condition = self.check_condition(scope, condition);

                ctx.loop_depth += 1;
                self.analyze_block(&scope.child(SegmentKind::While, index), body, ctx);
                ctx.loop_depth -= 1;

                condition
            }

            StatementKind::DoWhile { body, condition } => {
                let index = counters.next(SegmentKind::Do);

                ctx.loop_depth += 1;
                self.analyze_block(&scope.child(SegmentKind::Do, index), body, ctx);
                ctx.loop_depth -= 1;

                self.check_condition(scope, condition)
            }

            StatementKind::For(for_statement) => {
                let index = counters.next(SegmentKind::For);
                let for_scope = scope.child(SegmentKind::For, index);

                let from = self.check_int(scope, &mut for_statement.from);
                let until = self.check_int(scope, &mut for_statement.until);

                let mangled = for_scope.mangle(for_statement.iterator.value());
                self.declare(Symbol {
                    name: for_statement.iterator.value().clone(),
                    mangled: mangled.clone(),
                    ty: Type::int(),
                    range: for_statement.iterator.range(),
                    kind: SymbolKind::Iterator,
                });

                for_statement.mangled = Some(mangled.clone());
                ctx.locals.push(StackVariable::new(Type::int(), mangled));

                ctx.loop_depth += 1;
                self.analyze_block(&for_scope, &mut for_statement.body, ctx);
                ctx.loop_depth -= 1;

                from.and(until)
            }

            StatementKind::Block(block) => {
                let index = counters.next(SegmentKind::Block);
                self.analyze_block(&scope.child(SegmentKind::Block, index), block, ctx);
                Some(())
            }
        }
    }

    fn analyze_let(&mut self, scope: &ScopePath, statement: &mut LetStatement, ctx: &mut FunctionContext<'_>) -> Option<()> {
        if !self.check_type_exists(&statement.ty) {
            return None;
        }

        let declared = statement.ty.value().clone();
        let value = self.infer_type(scope, &mut statement.value, &declared);

        let variable_type = if statement.allocate {
            declared.with_modifier(TypeModifier::Pointer)
        } else {
            declared.clone()
        };

        let mangled = scope.mangle(statement.name.value());
        let declared_ok = self.declare(Symbol {
            name: statement.name.value().clone(),
            mangled: mangled.clone(),
            ty: variable_type.clone(),
            range: statement.name.range(),
            kind: SymbolKind::Local,
        });

        if !declared_ok {
            return None;
        }

        statement.mangled = Some(mangled.clone());
        ctx.locals.push(StackVariable::new(variable_type, mangled));

        let actual = value.into_valid()?;
        if actual != declared {
            return self.report(statement.value.range(), SemanticDiagnosticKind::LetTypeMismatch { expected: declared, actual });
        }

        Some(())
    }

    fn check_in_loop(&mut self, range: FileRange, keyword: &'static str, ctx: &FunctionContext<'_>) -> Option<()> {
        if ctx.loop_depth == 0 {
            return self.report(range, SemanticDiagnosticKind::NotInLoop { keyword });
        }

        Some(())
    }

    fn check_condition(&mut self, scope: &ScopePath, condition: &mut Ranged<Expression>) -> Option<()> {
        self.check_exact(scope, condition, Type::bool())
    }

    fn check_int(&mut self, scope: &ScopePath, expression: &mut Ranged<Expression>) -> Option<()> {
        self.check_exact(scope, expression, Type::int())
    }

    fn check_exact(&mut self, scope: &ScopePath, expression: &mut Ranged<Expression>, expected: Type) -> Option<()> {
        let actual = self.infer_type(scope, expression, &expected).into_valid()?;

        if actual != expected {
            return self.report(expression.range(), SemanticDiagnosticKind::TypeMismatch { expected, actual });
        }

        Some(())
    }

    /// Infers the type of `expression` using `hint` as the expected type,
    /// where [`Type::Invalid`] means no expectation. The result is stored in
    /// the annotation of the node and returned; failures have reported
    /// exactly one diagnostic and yield [`Type::Invalid`].
    pub fn infer_type(&mut self, scope: &ScopePath, expression: &mut Ranged<Expression>, hint: &Type) -> Type {
        let range = expression.range();

        let ty = match &mut expression.value_mut().kind {
            ExpressionKind::Integer(integer) => integer_literal_type(integer, hint),

            ExpressionKind::Float(..) => {
                if hint.is_floating_point() {
                    hint.clone()
                } else {
                    Type::double()
                }
            }

            ExpressionKind::Boolean(..) => Type::bool(),

            ExpressionKind::String(..) => Type::byte_array(),

            ExpressionKind::Null => {
                if hint.is_pointer() || hint.is_array() {
                    hint.clone()
                } else {
                    self.report(range, SemanticDiagnosticKind::NullWithoutPointerHint).unwrap_or(Type::Invalid)
                }
            }

            ExpressionKind::Variable(variable) => self.infer_variable(scope, variable),

            ExpressionKind::Parenthesized(inner) => self.infer_type(scope, inner, hint),

            ExpressionKind::ArrayLiteral(elements) => {
                self.infer_array_literal(scope, range, elements, hint).unwrap_or(Type::Invalid)
            }

            ExpressionKind::ArrayAllocation(size) => {
                self.infer_array_allocation(scope, range, size, hint).unwrap_or(Type::Invalid)
            }

            ExpressionKind::AddressOf(target) => {
                if target.contains_call() {
                    self.report(range, SemanticDiagnosticKind::InvalidPointerTarget).unwrap_or(Type::Invalid)
                } else {
                    self.infer_variable(scope, target.value_mut()).with_modifier(TypeModifier::Pointer)
                }
            }

            ExpressionKind::Unary { operator, operand } => {
                self.infer_unary(scope, *operator.value(), operand, hint).unwrap_or(Type::Invalid)
            }

            ExpressionKind::Binary(binary) => {
                self.infer_binary(scope, binary, hint).unwrap_or(Type::Invalid)
            }

            ExpressionKind::Conversion { expression, target } => {
                self.infer_conversion(scope, range, expression, target).unwrap_or(Type::Invalid)
            }

            ExpressionKind::Constructor(constructor) => {
                self.infer_constructor(scope, range, constructor).unwrap_or(Type::Invalid)
            }
        };

        expression.value_mut().ty.set(ty.clone());
        ty
    }

    fn infer_variable(&mut self, scope: &ScopePath, variable: &mut VariableReference) -> Type {
        self.infer_variable_chain(scope, variable).unwrap_or(Type::Invalid)
    }

    fn infer_variable_chain(&mut self, scope: &ScopePath, variable: &mut VariableReference) -> Option<Type> {
        let name = variable.name.value().clone();
        let name_range = variable.name.range();

        let Some(symbol) = self.symbols.resolve(scope, &name) else {
            variable.base_ty.set(Type::Invalid);
            return self.report(name_range, SemanticDiagnosticKind::VariableDoesntExist { name });
        };

        let base = symbol.ty.clone();
        variable.binding = Some(Binding {
            mangled: symbol.mangled.clone(),
            kind: symbol.kind,
        });
        variable.base_ty.set(base.clone());

        let called = matches!(variable.accessors.first().map(|x| &x.kind), Some(AccessorKind::Call(..)));
        if base.is_function() && !called {
            return self.report(name_range, SemanticDiagnosticKind::FunctionNotCalled { name });
        }

        let mut running = base;

        for accessor in &mut variable.accessors {
            let range = accessor.range();

            let next = match &mut accessor.value_mut().kind {
                AccessorKind::Call(arguments) => {
                    let Some(function) = running.function().cloned() else {
                        return self.report(range, SemanticDiagnosticKind::CantAccess { ty: running, access: "call".into() });
                    };

                    let expected = function.parameters.len();
                    let actual = arguments.len();
                    let count_matches = if function.variadic { actual >= expected } else { actual == expected };

                    if !count_matches {
                        return self.report(range, SemanticDiagnosticKind::FnCallArgsCount {
                            name,
                            expected,
                            actual,
                            variadic: function.variadic,
                        });
                    }

                    for (position, argument) in arguments.iter_mut().enumerate() {
                        let Some(parameter) = function.parameters.get(position) else {
                            self.infer_type(scope, argument, &Type::Invalid).into_valid()?;
                            continue;
                        };

                        let actual = self.infer_type(scope, argument, parameter).into_valid()?;
                        if actual != *parameter {
                            return self.report(argument.range(), SemanticDiagnosticKind::FnCallArgType {
                                position: position + 1,
                                expected: parameter.clone(),
                                actual,
                            });
                        }
                    }

                    running.without_last_modifier()
                }

                AccessorKind::Index(index) => {
                    if !running.is_array() {
                        return self.report(range, SemanticDiagnosticKind::CantAccess { ty: running, access: "index".into() });
                    }

                    self.check_int(scope, index)?;
                    running.without_last_modifier()
                }

                AccessorKind::Dereference => {
                    if !running.is_pointer() {
                        return self.report(range, SemanticDiagnosticKind::CantAccess { ty: running, access: "dereference".into() });
                    }

                    running.without_last_modifier()
                }

                AccessorKind::Member(member) => {
                    let member_type = running.name()
                        .filter(|_| running.modifiers().is_empty())
                        .and_then(|name| self.layouts.get(name))
                        .and_then(|layout| layout.member(member.value()))
                        .map(|member| member.ty.clone());

                    match member_type {
                        Some(ty) => ty,
                        None => {
                            let access = BorString::new(format!("access member `{}` of", member.value()));
                            return self.report(range, SemanticDiagnosticKind::CantAccess { ty: running, access });
                        }
                    }
                }
            };

            accessor.value_mut().ty.set(next.clone());
            running = next;
        }

        Some(running)
    }

    fn infer_array_literal(&mut self, scope: &ScopePath, range: FileRange, elements: &mut [Ranged<Expression>], hint: &Type) -> Option<Type> {
        let length = elements.len() as u64;

        let Some((first, rest)) = elements.split_first_mut() else {
            if hint.is_array() {
                return Some(hint.clone());
            }

            if hint.is_valid() {
                return Some(hint.with_modifier(TypeModifier::Array(ArrayLength::Dynamic)));
            }

            return self.report(range, SemanticDiagnosticKind::EmptyArrayWithoutHint);
        };

        let element_hint = if hint.is_array() {
            hint.without_last_modifier()
        } else {
            Type::Invalid
        };

        let element_type = self.infer_type(scope, first, &element_hint).into_valid()?;

        for element in rest {
            let actual = self.infer_type(scope, element, &element_type).into_valid()?;

            if actual != element_type {
                return self.report(element.range(), SemanticDiagnosticKind::TypeMismatchMany { expected: element_type, actual });
            }
        }

        Some(element_type.with_modifier(TypeModifier::Array(ArrayLength::Fixed(length))))
    }

    fn infer_array_allocation(&mut self, scope: &ScopePath, range: FileRange, size: &mut Ranged<Expression>, hint: &Type) -> Option<Type> {
        match hint.last_modifier() {
            Some(TypeModifier::Array(ArrayLength::Dynamic)) => {
                self.check_int(scope, size)?;
                Some(hint.clone())
            }

            Some(TypeModifier::Array(ArrayLength::Fixed(..))) => {
                self.report(range, SemanticDiagnosticKind::DynamicToFixedArray { ty: hint.clone() })
            }

            _ => self.report(range, SemanticDiagnosticKind::ArrayAllocationWithoutHint),
        }
    }

    fn infer_unary(&mut self, scope: &ScopePath, operator: UnaryOperator, operand: &mut Ranged<Expression>, hint: &Type) -> Option<Type> {
        let ty = self.infer_type(scope, operand, hint).into_valid()?;

        let defined = match operator {
            UnaryOperator::Not => ty.is_plain(Type::INT) || ty.is_plain(Type::BOOL),
            UnaryOperator::Negate => ty.is_numeric(),
            UnaryOperator::ManualRelease => {
                if !ty.is_pointer() && !ty.is_array() {
                    return self.report(operand.range(), SemanticDiagnosticKind::NotPointerType { ty });
                }

                true
            }
        };

        if !defined {
            return self.report(operand.range(), SemanticDiagnosticKind::UnaryOperatorUndefined { operator, ty });
        }

        Some(ty)
    }

    fn infer_binary(&mut self, scope: &ScopePath, binary: &mut BinaryExpression, hint: &Type) -> Option<Type> {
        let no_hint = Type::Invalid;
        let hint = if hint.is_plain(Type::BOOL) { &no_hint } else { hint };

        let lhs = self.infer_type(scope, &mut binary.lhs, hint).into_valid()?;
        let rhs = self.infer_type(scope, &mut binary.rhs, &lhs).into_valid()?;

        if lhs != rhs {
            return self.report(binary.rhs.range(), SemanticDiagnosticKind::TypeMismatch { expected: lhs, actual: rhs });
        }

        let operator = *binary.operator.value();
        let defined = if operator.is_logical() {
            lhs.is_plain(Type::BOOL)
        } else if operator.is_comparison() {
            lhs.is_numeric() || lhs.is_plain(Type::BOOL)
        } else if lhs.is_floating_point() {
            operator.is_floating_arithmetic()
        } else {
            lhs.is_integer() && operator.is_integer_arithmetic()
        };

        if !defined {
            return self.report(binary.operator.range(), SemanticDiagnosticKind::BinaryOperatorUndefined { operator, ty: lhs });
        }

        if operator.is_logical() || operator.is_comparison() {
            Some(Type::bool())
        } else {
            Some(lhs)
        }
    }

    fn infer_conversion(&mut self, scope: &ScopePath, range: FileRange, expression: &mut Ranged<Expression>, target: &Ranged<Type>) -> Option<Type> {
        if !self.check_type_exists(target) {
            return None;
        }

        let from = self.infer_type(scope, expression, &Type::Invalid).into_valid()?;
        let to = target.value().clone();

        if from != to && !is_valid_conversion(&from, &to) {
            return self.report(range, SemanticDiagnosticKind::InvalidConversion { from, to });
        }

        Some(to)
    }

    fn infer_constructor(&mut self, scope: &ScopePath, range: FileRange, constructor: &mut ConstructorExpression) -> Option<Type> {
        let ty = Type::new(constructor.ty.value().clone());

        let Some(layout) = self.layouts.get(constructor.ty.value()).cloned() else {
            return self.report(constructor.ty.range(), SemanticDiagnosticKind::UnknownType { ty });
        };

        let named = constructor.arguments.iter().filter(|x| x.name.is_some()).count();
        if named != 0 && named != constructor.arguments.len() {
            return self.report(range, SemanticDiagnosticKind::ConstructorArgumentsFormat);
        }

        if named != 0 {
            for argument in &constructor.arguments {
                let Some(name) = &argument.name else { continue };

                if layout.member(name.value()).is_none() {
                    let member = name.value().clone();
                    return self.report(name.range(), SemanticDiagnosticKind::ConstructorUnknownMember { ty, member });
                }
            }

            let covered = layout.members.iter().all(|member| {
                constructor.arguments.iter()
                    .filter(|x| x.name.as_ref().is_some_and(|name| *name.value() == member.name))
                    .count() == 1
            });

            if !covered || constructor.arguments.len() != layout.members.len() {
                let kind = SemanticDiagnosticKind::ConstructorNotEnoughArgs {
                    ty,
                    expected: layout.members.len(),
                    actual: constructor.arguments.len(),
                };
                return self.report(range, kind);
            }

            constructor.arguments.sort_by_key(|argument| {
                layout.members.iter().position(|member| argument.name.as_ref().is_some_and(|name| *name.value() == member.name))
            });
        } else if constructor.arguments.len() != layout.members.len() {
            let kind = SemanticDiagnosticKind::ConstructorNotEnoughArgs {
                ty,
                expected: layout.members.len(),
                actual: constructor.arguments.len(),
            };
            return self.report(range, kind);
        }

        for (argument, member) in constructor.arguments.iter_mut().zip(&layout.members) {
            let actual = self.infer_type(scope, &mut argument.value, &member.ty).into_valid()?;

            if actual != member.ty {
                let expected = member.ty.clone();
                return self.report(argument.value.range(), SemanticDiagnosticKind::TypeMismatch { expected, actual });
            }
        }

        Some(ty)
    }
}

/// Picks the type of an integer literal: the hint when the literal can take
/// it, otherwise the narrowest candidate.
#[must_use]
pub fn integer_literal_type(integer: &IntegerLiteral, hint: &Type) -> Type {
    let candidates = integer_literal_candidates(integer);

    if hint.is_valid() && candidates.contains(hint) {
        return hint.clone();
    }

    candidates.into_iter().next().unwrap_or_else(Type::int)
}

fn integer_literal_candidates(integer: &IntegerLiteral) -> Vec<Type> {
    match integer.radix {
        IntegerRadix::Decimal => {
            let mut candidates = Vec::with_capacity(5);

            if integer.value <= u8::MAX as u64 {
                candidates.push(Type::byte());
            }

            if integer.value <= i32::MAX as u64 {
                candidates.push(Type::i32());
            }

            candidates.extend([Type::int(), Type::float(), Type::double()]);
            candidates
        }

        IntegerRadix::Hexadecimal { digits } => match digits {
            0..=2 => vec![Type::byte(), Type::i32(), Type::int()],
            3..=8 => vec![Type::i32(), Type::int()],
            _ => vec![Type::int()],
        },
    }
}

/// The explicit `->` conversions between distinct primitive types.
#[must_use]
pub fn is_valid_conversion(from: &Type, to: &Type) -> bool {
    if from.is_integer() {
        return to.is_numeric();
    }

    if from.is_floating_point() {
        return to.is_floating_point() || to.is_plain(Type::INT) || to.is_plain(Type::I32);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(IntegerLiteral::decimal(5), Type::Invalid, Type::byte())]
    #[case(IntegerLiteral::decimal(5), Type::double(), Type::double())]
    #[case(IntegerLiteral::decimal(5), Type::int(), Type::int())]
    #[case(IntegerLiteral::decimal(256), Type::Invalid, Type::i32())]
    #[case(IntegerLiteral::decimal(300), Type::byte(), Type::i32())]
    #[case(IntegerLiteral::decimal(1 << 40), Type::i32(), Type::int())]
    #[case(IntegerLiteral::decimal(7), Type::bool(), Type::byte())]
    #[case(IntegerLiteral { value: 0xff, radix: IntegerRadix::Hexadecimal { digits: 2 } }, Type::Invalid, Type::byte())]
    #[case(IntegerLiteral { value: 0xff, radix: IntegerRadix::Hexadecimal { digits: 4 } }, Type::byte(), Type::i32())]
    #[case(IntegerLiteral { value: 1, radix: IntegerRadix::Hexadecimal { digits: 9 } }, Type::Invalid, Type::int())]
    #[case(IntegerLiteral { value: 1, radix: IntegerRadix::Hexadecimal { digits: 1 } }, Type::double(), Type::byte())]
    fn integer_literals(#[case] integer: IntegerLiteral, #[case] hint: Type, #[case] expected: Type) {
        assert_eq!(integer_literal_type(&integer, &hint), expected);
    }

    #[rstest]
    #[case(Type::int(), Type::byte(), true)]
    #[case(Type::byte(), Type::double(), true)]
    #[case(Type::double(), Type::i32(), true)]
    #[case(Type::float(), Type::double(), true)]
    #[case(Type::double(), Type::byte(), false)]
    #[case(Type::bool(), Type::int(), false)]
    #[case(Type::byte_array(), Type::int(), false)]
    fn conversions(#[case] from: Type, #[case] to: Type, #[case] expected: bool) {
        assert_eq!(is_valid_conversion(&from, &to), expected);
    }
}
