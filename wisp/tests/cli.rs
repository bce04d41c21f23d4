//! End-to-end tests driving the compiled `wisp` binary: argv handling and
//! the exit-code table.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_wisp"))
}

#[test]
fn successful_file_run_exits_zero_and_prints_result() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "1 + 2 * 3").unwrap();
    let output = Command::new(bin_path()).arg(file.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "7");
}

#[test]
fn compile_error_exits_65() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "1 +").unwrap();
    let output = Command::new(bin_path()).arg(file.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(65));
}

#[test]
fn runtime_error_exits_70() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "true + 1").unwrap();
    let output = Command::new(bin_path()).arg(file.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(70));
}

#[test]
fn unreadable_file_exits_74() {
    let output = Command::new(bin_path())
        .arg("/nonexistent/path/to/nowhere.wisp")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(74));
}

#[test]
fn too_many_arguments_exits_64() {
    let output = Command::new(bin_path())
        .args(["one", "two"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn disassemble_flag_prints_header_before_result() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "1 + 2").unwrap();
    let output = Command::new(bin_path())
        .args(["--disassemble"])
        .arg(file.path())
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=="));
    assert!(stdout.trim_end().ends_with('3'));
}
