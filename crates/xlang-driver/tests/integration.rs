//! Integration tests for the `xlang` binary.
//!
//! Each test writes a small X program into a scratch directory and runs the
//! compiled binary on it.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const COUNT: &str = r#"
    count(n: Int) -> Int {
        if n < 1 { return 0 }
        return n + count(n - 1)
    }

    main() -> Int { return count(10) }
"#;

fn xlang_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_xlang"))
}

fn write_source(dir: &TempDir, source: &str) -> PathBuf {
    let path = dir.path().join("input.x");
    fs::write(&path, source).expect("Failed to write test input");
    path
}

fn xlang(args: &[&str], input: &Path) -> Output {
    Command::new(xlang_binary())
        .arg(args[0])
        .arg(input)
        .args(&args[1..])
        .output()
        .expect("Failed to run xlang")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_check_accepts_valid_program() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, COUNT);

    let output = xlang(&["check"], &input);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Check passed"));
}

#[test]
fn test_check_reports_lowering_error_code() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "main() -> Int { return missing }");

    let output = xlang(&["check"], &input);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("E2001"), "stderr: {}", err);
    assert!(err.contains("missing"), "stderr: {}", err);
}

#[test]
fn test_parse_errors_are_reported() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "main() -> Int { return 1 + }");

    let output = xlang(&["parse"], &input);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("E1000"));
}

#[test]
fn test_lex_lists_tokens_and_flags_errors() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "x: Int = 1 !");

    let output = xlang(&["lex", "--positions"], &input);
    assert!(!output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Identifier"));
    assert!(out.contains("IntLiteral"));
    assert!(stderr(&output).contains("E0001"));
}

#[test]
fn test_emit_ir_to_stdout() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, COUNT);

    let output = xlang(&["compile", "--emit", "ir"], &input);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let ir = stdout(&output);
    assert!(ir.contains("count(%arg0 n: i32) -> i32"));
    assert!(ir.contains("icmp slt"));
    assert!(ir.contains("call func0"));
}

#[test]
fn test_emit_object_file() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, COUNT);
    let object = dir.path().join("count.o");

    let output = Command::new(xlang_binary())
        .arg("compile")
        .arg(&input)
        .arg("-o")
        .arg(&object)
        .output()
        .expect("Failed to run xlang");
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let bytes = fs::read(&object).expect("object file should exist");
    assert!(!bytes.is_empty());
}

#[test]
fn test_object_file_defaults_next_to_input() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, COUNT);

    let output = xlang(&["compile"], &input);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(dir.path().join("input.o").exists());
}

#[test]
fn test_run_prints_result() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, COUNT);

    let output = xlang(&["run"], &input);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "55");
}

#[test]
fn test_run_custom_entry_with_arguments() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "sub(a: Int, b: Int) -> Int { return a - b }");

    let output = xlang(&["run", "--entry", "sub", "4", "-3"], &input);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "7");
}

#[test]
fn test_run_reports_runtime_errors() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "main() -> Int { z: Int = 0; return 1 / z }");

    let output = xlang(&["run"], &input);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Runtime error"));
}

#[test]
fn test_forward_declarations_flag() {
    let dir = TempDir::new().unwrap();
    let input = write_source(
        &dir,
        r#"
        even(n: Int) -> Int { if n == 0 { return 1 } return odd(n - 1) }
        odd(n: Int) -> Int { if n == 0 { return 0 } return even(n - 1) }
        main() -> Int { return even(10) }
        "#,
    );

    let output = xlang(&["check"], &input);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("E2001"));

    let output = xlang(&["run", "--forward-decls"], &input);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "1");
}

#[test]
fn test_deny_redeclaration_flag() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "main() -> Int { x: Int = 1; x: Int = 2; return x }");

    let output = xlang(&["run"], &input);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "2");

    let output = xlang(&["check", "--deny-redeclaration"], &input);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("E2008"));
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.x");

    let output = xlang(&["check"], &missing);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Error reading"));
}
