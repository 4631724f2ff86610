// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::path::Path;

use borzoi::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use temp_dir::TempDir;

fn analyze_in(directory: &Path, input: &str) -> (ParseTree, Vec<SemanticDiagnostic>) {
    _ = env_logger::builder().is_test(true).filter(None, log::LevelFilter::max()).try_init();

    let source_code = SourceCode::new_test(input.to_string());
    let output = parse_source_code(&source_code);
    assert!(!output.has_errors(), "parse errors: {:#?} {:#?}", output.lexer_errors, output.parse_diagnostics);

    let mut tree = output.tree;
    let mut analyzer = SemanticAnalyzer::new(directory);
    analyzer.analyze_tree(&mut tree);

    let (_, diagnostics) = analyzer.into_parts();
    (tree, diagnostics)
}

fn analyze(input: &str) -> (ParseTree, Vec<SemanticDiagnostic>) {
    analyze_in(Path::new("."), input)
}

fn local_names(function: &FunctionDeclaration) -> Vec<&str> {
    function.variables.locals.iter().map(|x| x.mangled_name.as_str()).collect()
}

#[rstest]
#[case("already-exists", "fn main() {\n let int x = 1\n let int x = 2\n }")]
#[case("unknown-type", "fn main() { let Foo x = 1 }")]
#[case("let-type-mismatch", "fn main() { let int x = true }")]
#[case("variable-doesnt-exist", "fn main() { mut y = 1 }")]
#[case("no-return", "fn f() int { } fn main() {}")]
#[case("return-empty", "fn f() int { ret } fn main() {}")]
#[case("return-value-in-void", "fn main() { ret 1 }")]
#[case("ret-type-mismatch", "fn f() int { ret true } fn main() {}")]
#[case("type-mismatch", "fn main() { if 1 { } }")]
#[case("type-mismatch-many", "fn main() { let int[] xs = [1, true] }")]
#[case("binary-operator-undefined", "fn main() { let bool b = true + false }")]
#[case("unary-operator-undefined", "fn main() { let double d = not 1.0 }")]
#[case("no-entry-point", "fn f() {}")]
#[case("invalid-entry-point", "fn main(int a) {}")]
#[case("cant-access", "fn main() {\n let int x = 1\n let int y = x[0]\n }")]
#[case("fn-call-args-count", "fn f(int a) {} fn main() { call f() }")]
#[case("fn-call-arg-type", "fn f(int a) {} fn main() { call f(true) }")]
#[case("function-not-called", "fn f() int { ret 1 } fn main() { let int x = f }")]
#[case("dynamic-to-fixed-array", "fn main() { let int[4] xs = *4 }")]
#[case("array-allocation-without-hint", "fn main() { let int x = *4 }")]
#[case("empty-array-without-hint", "fn main() { collect [] }")]
#[case("null-without-pointer-hint", "fn main() { let int x = null }")]
#[case("invalid-vararg-position", "cfn printf(*, byte[] format) i32 fn main() {}")]
#[case("constructor-arguments-format", "type P { int x, int y } fn main() { let P p = P!{x = 1, 2} }")]
#[case("constructor-not-enough-args", "type P { int x, int y } fn main() { let P p = P!{1} }")]
#[case("constructor-unknown-member", "type P { int x, int y } fn main() { let P p = P!{x = 1, z = 2} }")]
#[case("cant-figure-types", "type A { B b } type B { A a } fn main() {}")]
#[case("not-pointer-type", "fn main() {\n let int x = 1\n collect x\n }")]
#[case("invalid-pointer-target", "fn f() int { ret 1 } fn main() { let int@ p = @f() }")]
#[case("mut-destination-acc", "fn f() int { ret 1 } fn main() { mut f() = 2 }")]
#[case("invalid-conversion", "fn main() {\n let bool b = true\n let int x = b -> int\n }")]
#[case("not-in-loop", "fn main() { break }")]
#[case("not-a-call", "fn main() {\n let int x = 1\n call x\n }")]
fn reports(#[case] expected: &str, #[case] input: &str) {
    let (_, diagnostics) = analyze(input);

    assert!(!diagnostics.is_empty(), "expected `{expected}` for {input:?}");
    assert_eq!(diagnostics[0].kind().name(), expected, "{diagnostics:#?}");
    assert!(diagnostics.iter().all(|x| x.kind().name() == expected), "{diagnostics:#?}");
}

#[test]
fn accepts_a_complete_program() {
    let (tree, diagnostics) = analyze(r#"
        cfn printf(byte[] format, *) i32
        type Point { int x, int y }

        fn sum(int[] values) int {
            let int total = 0
            for i from 0 until 3 {
                mut total = total + values[i]
            }
            ret total
        }

        fn main() int {
            let int[] xs = [1, 2, 3]
            let Point p = Point!{y = 2, x = 1}
            let double d = 5
            let@ int boxed = 4
            mut boxed@ = p.x + p.y
            if sum(xs) == 6 {
                let byte b = 0xff
                call printf("%d\n", b)
            } else {
                ret 1
            }
            while false {
                continue
            }
            ret boxed@ - 3
        }
    "#);

    assert_eq!(diagnostics.len(), 0, "{diagnostics:#?}");
    assert_eq!(local_names(&tree.functions[0]), ["sum$total", "sum$for0$i"]);
    assert_eq!(local_names(&tree.functions[1]), ["main$xs", "main$p", "main$d", "main$boxed", "main$if0$b"]);
    assert_eq!(tree.functions[0].variables.parameters[0].mangled_name, "sum$values");
}

#[test]
fn named_constructor_arguments_follow_member_order() {
    let (tree, diagnostics) = analyze("type P { int x, int y } fn main() { let P p = P!{y = 2, x = 1} }");
    assert_eq!(diagnostics.len(), 0, "{diagnostics:#?}");

    let StatementKind::Let(statement) = &tree.functions[0].body.statements[0].kind else {
        panic!("expected a let statement");
    };

    let ExpressionKind::Constructor(constructor) = &statement.value.kind else {
        panic!("expected a constructor");
    };

    let names: Vec<_> = constructor.arguments.iter()
        .map(|x| x.name.as_ref().map(|name| name.as_str()))
        .collect();
    assert_eq!(names, [Some("x"), Some("y")]);
}

#[test]
fn nested_scopes_shadow_and_end() {
    let (_, diagnostics) = analyze(r#"
        fn main() {
            let int x = 1
            if true {
                let int x = 2
                let int y = x
            }
            mut y = 3
        }
    "#);

    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    assert_eq!(diagnostics[0].kind().name(), "variable-doesnt-exist");
}

#[test]
fn literals_take_the_expected_type() {
    let (tree, diagnostics) = analyze("fn main() {\n let double d = 5\n let i32 n = 300\n let byte b = 0x7f\n }");
    assert_eq!(diagnostics.len(), 0, "{diagnostics:#?}");

    let types: Vec<String> = tree.functions[0].variables.locals.iter().map(|x| x.ty.to_string()).collect();
    assert_eq!(types, ["double", "i32", "byte"]);
}

#[test]
fn else_shares_the_index_of_its_if() {
    let (tree, diagnostics) = analyze(r#"
        fn main() {
            if true {
                let int a = 1
            } else {
                let int b = 2
            }
            if false {
                let int c = 3
            }
        }
    "#);

    assert_eq!(diagnostics.len(), 0, "{diagnostics:#?}");
    assert_eq!(local_names(&tree.functions[0]), ["main$if0$a", "main$else0$b", "main$if1$c"]);
}

#[test]
fn duplicate_points_at_first_declaration() {
    let (_, diagnostics) = analyze("fn main() {} fn main() {}");

    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    assert_eq!(diagnostics[0].kind().name(), "already-exists");
    assert_eq!(diagnostics[0].related_info().len(), 1);
    assert!(diagnostics[0].related_info()[0].range() < diagnostics[0].range());
}

#[test]
fn embed_resolves_against_base_directory() {
    let directory = TempDir::new().unwrap();
    std::fs::write(directory.child("data.bin"), b"hello").unwrap();

    let (tree, diagnostics) = analyze_in(directory.path(), r#"
        embed "data.bin" as data
        fn main() int {
            ret data[0] -> int
        }
    "#);

    assert_eq!(diagnostics.len(), 0, "{diagnostics:#?}");
    assert_eq!(tree.embeds[0].resolved_path.as_deref(), Some(directory.child("data.bin").as_path()));
}

#[test]
fn embed_missing_file() {
    let directory = TempDir::new().unwrap();
    let (tree, diagnostics) = analyze_in(directory.path(), "embed \"nope.bin\" as data fn main() {}");

    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    assert_eq!(diagnostics[0].kind().name(), "embed-not-found");
    assert!(tree.embeds[0].resolved_path.is_none());
}

#[test]
fn variadic_arguments_are_unchecked() {
    let (_, diagnostics) = analyze(r#"
        cfn printf(byte[] format, *) i32
        fn main() {
            call printf("%d %f\n", 1, 2.5)
        }
    "#);

    assert_eq!(diagnostics.len(), 0, "{diagnostics:#?}");
}

#[test]
fn variadic_requires_fixed_parameters() {
    let (_, diagnostics) = analyze(r#"
        cfn printf(byte[] format, *) i32
        fn main() {
            call printf()
        }
    "#);

    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    assert_eq!(diagnostics[0].to_string(), "Function `printf` takes 1 or more arguments, but 0 were given");
}
