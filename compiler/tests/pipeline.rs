// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::collections::HashMap;

use borzoi::SourceCode;
use borzoi_compiler::{build, compile, is_program_available, run_executable, Assembly, CompileOptions, Platform, PipelineError, RunOutcome};
use pretty_assertions::assert_eq;
use rstest::rstest;
use temp_dir::TempDir;

#[rstest]
#[case::return_value("fn main() int { ret 123 }", 123)]
#[case::void_main("fn main() { let int x = 4 }", 0)]
#[case::call("fn one() int { ret 1 } fn main() int { ret one() + 2 }", 3)]
#[case::recursion(r#"
    fn fib(int n) int {
        if n < 2 { ret n }
        ret fib(n - 1) + fib(n - 2)
    }

    fn main() int { ret fib(10) }
"#, 55)]
#[case::for_loop(r#"
    fn main() int {
        let int sum = 0
        for i from 0 until 5 { mut sum = sum + i }
        ret sum
    }
"#, 10)]
#[case::while_break(r#"
    fn main() int {
        let int i = 0
        while true {
            mut i = i + 1
            if i == 5 { break }
        }
        ret i
    }
"#, 5)]
#[case::do_while_continue(r#"
    fn main() int {
        let int i = 0
        let int odd = 0
        do {
            mut i = i + 1
            if i % 2 == 0 { continue }
            mut odd = odd + 1
        } while i < 9
        ret odd
    }
"#, 5)]
#[case::floored_modulo("fn main() int { ret -7 %% 3 + 10 }", 12)]
#[case::truncated_modulo("fn main() int { ret -7 % 3 + 10 }", 9)]
#[case::records(r#"
    type Point { int x, int y }

    fn scale(Point p, int factor) Point {
        ret Point!{ y = p.y * factor, x = p.x * factor }
    }

    fn main() int {
        let Point p = scale(Point!{ 3, 4 }, 2)
        ret p.x * p.y
    }
"#, 48)]
#[case::arrays(r#"
    fn main() int {
        let int[] values = [5, 6, 7]
        mut values[1] = 20
        ret values[0] + values[1] + values[2]
    }
"#, 32)]
#[case::array_allocation(r#"
    fn main() int {
        let byte[] buffer = *7
        mut buffer[6] = 9 -> byte
        ret buffer[6] -> int + buffer[0] -> int
    }
"#, 9)]
#[case::out_of_bounds("fn main() int { let int[] values = [1, 2] ret values[2] }", 13)]
#[case::heap_variable(r#"
    fn main() int {
        let@ int boxed = 41
        mut boxed@ = boxed@ + 1
        ret boxed@
    }
"#, 42)]
#[case::address_of(r#"
    fn set(int@ target) { mut target@ = 8 }

    fn main() int {
        let int value = 1
        call set(@value)
        ret value
    }
"#, 8)]
#[case::doubles("fn main() int { let double d = 2.5 ret (d * 4.0) -> int }", 10)]
#[case::floats("fn main() int { let float f = 1.5 ret (f + f -> float) -> int }", 3)]
#[case::foreign_call("cfn abs from labs(int value) int fn main() int { ret abs(-7) }", 7)]
#[case::linked_library(r#"
    link "m"
    cfn ldexp(double x, i32 exponent) double

    fn main() int { ret ldexp(3.0, 2) -> int }
"#, 12)]
#[case::variadic_call(r#"
    cfn printf(byte@ format, *) i32

    fn main() int {
        let byte[] format = "%d %.1f\0"
        ret printf(@format[0], 5, 1.5 -> float) -> int
    }
"#, 5)]
#[case::string_length(r#"
    fn main() int {
        let byte[] text = "hello"
        ret text[4] -> int
    }
"#, 111)]
#[case::collection_frames(r#"
    fn make(int n) int[] {
        ret *n
    }

    fn main() int {
        let int total = 0
        for i from 0 until 20000 {
            let int[] values = make(64)
            mut values[63] = 1
            mut total = total + values[63]
        }
        ret total % 256
    }
"#, 20000 % 256)]
#[case::manual_collection(r#"
    fn main() int {
        let int[] values = *4
        collect values
        ret 0
    }
"#, 0)]
// The generated code targets x86-64 and is linked with the host's `gcc`.
#[cfg_attr(not(all(target_arch = "x86_64", target_os = "linux")), ignore)]
fn programs(#[case] code: &str, #[case] expected: i32) {
    let Some(outcome) = build_and_run(code) else { return };

    assert_eq!(outcome.abnormal_exit, None);
    assert_eq!(outcome.exit_code, Some(expected));
}

#[test]
fn diagnostics_prevent_building() {
    let dir = TempDir::new().unwrap();
    let path = dir.child("main.bz");
    std::fs::write(&path, "fn main() int { ret true }").unwrap();

    let options = CompileOptions::new(&path, Platform::host_platform());
    let result = build(&path, &options);

    assert!(matches!(result, Err(PipelineError::Diagnostics(ref diagnostics)) if diagnostics.len() == 1), "{result:?}");
    assert!(!options.nasm_path().exists());
}

#[test]
#[cfg_attr(not(all(target_arch = "x86_64", target_os = "linux")), ignore)]
fn intermediate_files_are_removed() {
    if !tools_available() {
        return;
    }

    let dir = TempDir::new().unwrap();
    let path = dir.child("main.bz");
    std::fs::write(&path, "fn main() {}").unwrap();

    let options = CompileOptions::new(&path, Platform::host_platform());
    build(&path, &options).unwrap();

    assert!(options.output.exists());
    assert!(!options.nasm_path().exists());
    assert!(!options.object_path().exists());
}

#[rstest]
#[case::early_return(r#"
    fn find(int[] values, int needle) int {
        for i from 0 until 4 {
            if values[i] == needle { ret i }
        }
        ret -1
    }

    fn main() int {
        let int[] values = [1, 2, 3, 4]
        ret find(values, 3)
    }
"#)]
#[case::break_and_continue(r#"
    fn main() int {
        let int i = 0
        while true {
            let int[] scratch = *2
            mut i = i + 1
            if i < 3 { continue }
            do {
                let int[] inner = *1
                if i == 5 { break }
                mut i = i + 1
            } while true
            if i >= 5 { break }
        }
        ret i
    }
"#)]
#[case::returned_arrays(r#"
    fn make(int n) int[] {
        if n == 0 { ret *1 }
        let int[] values = *n
        ret values
    }

    fn main() int {
        let int[] values = make(3)
        ret values[2]
    }
"#)]
#[case::manual_body(r#"
    fn raw() int &&{
        ret 4
    }

    fn main() int { ret raw() }
"#)]
fn frames_balance_on_every_path(#[case] code: &str, #[values(Platform::linux(), Platform::windows())] platform: Platform) {
    let assembly = generate(code, &platform);
    let lines = text_of(&assembly);

    let starts: Vec<usize> = lines.iter()
        .enumerate()
        .filter(|(_, line)| line.starts_with("fn_") && line.ends_with(':'))
        .map(|(index, _)| index)
        .collect();
    assert!(!starts.is_empty());

    for (n, start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(lines.len());
        check_frame_depths(&lines[*start..end]);
    }
}

#[test]
fn loops_and_indexing_reference_the_traps() {
    let assembly = generate(r#"
        fn main() int {
            let int[] values = [1, 2]
            let int total = 0
            for i from 0 until 2 { mut total = total + values[i] }
            ret total
        }
    "#, &Platform::linux());
    let lines = text_of(&assembly);

    assert!(lines.iter().any(|x| x.starts_with("jo _L")), "for loop has no overflow guard");
    assert!(lines.iter().any(|x| x == "jae err$bounds"));
    assert!(lines.iter().any(|x| x == "err$bounds:"));

    let trap = lines.iter().position(|x| x == "err$bounds:").unwrap();
    assert_eq!(lines[trap + 1..trap + 4], ["and rsp, -16", "mov rdi, 13", "call exit"]);
}

#[test]
fn returned_arrays_are_adopted_once_per_call() {
    let assembly = generate(r#"
        fn make() byte[] { ret "abc" }

        fn main() int {
            let byte[] a = make()
            call make()
            ret a[0] -> int
        }
    "#, &Platform::linux());
    let lines = text_of(&assembly);

    let calls = lines.iter().filter(|x| *x == "call fn_make").count();
    let adopts: Vec<usize> = lines.iter().enumerate()
        .filter(|(_, x)| *x == "call gc$adopt")
        .map(|(index, _)| index)
        .collect();

    assert_eq!(calls, 2);
    assert_eq!(adopts.len(), 2);
    for index in adopts {
        assert_eq!(lines[index - 1], "call fn_make");
    }
}

fn generate(code: &str, platform: &Platform) -> Assembly {
    let _ = env_logger::builder().is_test(true).filter(None, log::LevelFilter::max()).try_init();

    let compilation = compile(&SourceCode::new_test(code.to_string()), platform);
    assert!(compilation.is_success(), "{:#?}", compilation.diagnostics);
    compilation.assembly.unwrap()
}

fn text_of(assembly: &Assembly) -> Vec<String> {
    assembly.text().iter().map(|x| x.to_string()).collect()
}

/// Follows every branch of one function and checks that each label is
/// reached with the same number of open collector frames, and that none are
/// open at `ret`.
fn check_frame_depths(lines: &[String]) {
    let labels: HashMap<&str, usize> = lines.iter()
        .enumerate()
        .filter_map(|(index, line)| line.strip_suffix(':').map(|label| (label, index)))
        .collect();

    let mut seen: HashMap<usize, i32> = HashMap::new();
    let mut pending = vec![(0, 0)];

    while let Some((mut index, mut depth)) = pending.pop() {
        loop {
            let Some(line) = lines.get(index) else {
                panic!("{} runs past its end", lines[0]);
            };

            if let Some(previous) = seen.insert(index, depth) {
                assert_eq!(previous, depth, "{} reaches `{line}` with different frame depths", lines[0]);
                break;
            }

            match line.as_str() {
                "call gc$enter" => depth += 1,
                "call gc$exit" => {
                    depth -= 1;
                    assert!(depth >= 0, "{} leaves a frame it never entered", lines[0]);
                }
                "ret" => {
                    assert_eq!(depth, 0, "{} returns with open frames", lines[0]);
                    break;
                }
                _ => (),
            }

            if let Some(target) = line.strip_prefix("jmp ") {
                match labels.get(target) {
                    Some(target) => {
                        index = *target;
                        continue;
                    }
                    None => break,
                }
            }

            if let Some((_, target)) = line.strip_prefix('j').and_then(|x| x.split_once(' ')) {
                if let Some(target) = labels.get(target) {
                    pending.push((*target, depth));
                }
            }

            index += 1;
        }
    }
}

fn tools_available() -> bool {
    let available = is_program_available("nasm") && is_program_available("gcc");
    if !available {
        eprintln!("nasm or gcc is missing, skipping");
    }
    available
}

fn build_and_run(code: &str) -> Option<RunOutcome> {
    let _ = env_logger::builder().is_test(true).filter(None, log::LevelFilter::max()).try_init();

    if !tools_available() {
        return None;
    }

    let dir = TempDir::new().unwrap();
    let path = dir.child("main.bz");
    std::fs::write(&path, code).unwrap();

    let mut options = CompileOptions::new(&path, Platform::host_platform());
    options.keep_files = true;

    if let Err(e) = build(&path, &options) {
        panic!("build failed: {e}\n{e:#?}");
    }

    println!("Running executable {}", options.output.display());
    Some(run_executable(&options.output).unwrap())
}
