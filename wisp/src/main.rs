//! REPL and single-file driver for wisp.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use wisp_compiler::{compile, disassemble, Chunk};
use wisp_core::StringPool;
use wisp_vm::{Vm, VmError};

const EXIT_OK: u8 = 0;
const EXIT_USAGE: u8 = 64;
const EXIT_COMPILE_ERROR: u8 = 65;
const EXIT_RUNTIME_ERROR: u8 = 70;
const EXIT_FILE_UNREADABLE: u8 = 74;

#[derive(Parser)]
#[command(name = "wisp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bytecode compiler and VM for the wisp expression language", long_about = None)]
struct Cli {
    /// Source file to compile and interpret once. Omit for an interactive REPL.
    path: Option<PathBuf>,

    /// Extra positional arguments, accepted only to produce the usage error.
    #[arg(hide = true)]
    extra: Vec<PathBuf>,

    /// Print the disassembled bytecode before interpreting.
    #[arg(long)]
    disassemble: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if !cli.extra.is_empty() {
        eprintln!("usage: wisp [--disassemble] [path]");
        return ExitCode::from(EXIT_USAGE);
    }

    match cli.path {
        None => run_repl(cli.disassemble),
        Some(path) => run_file(&path, cli.disassemble),
    }
}

fn run_repl(disassemble: bool) -> ExitCode {
    let mut pool = StringPool::new();
    let mut rl = DefaultEditor::new().expect("failed to initialize line editor");

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                run_line(line.as_bytes(), &mut pool, disassemble);
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(err) => {
                eprintln!("readline error: {err}");
                break;
            }
        }
    }
    ExitCode::from(EXIT_OK)
}

/// Compile and interpret one line of REPL input, printing the result or the
/// error kind. Each line is an independent compilation; a bad line never
/// poisons the ones that follow it.
fn run_line(source: &[u8], pool: &mut StringPool, disassemble: bool) {
    let mut chunk = Chunk::new();
    let mut diagnostics = std::io::stderr();

    if compile(source, &mut chunk, pool, &mut diagnostics).is_err() {
        println!("compile error");
        return;
    }

    if disassemble {
        print!("{}", wisp_compiler::disassemble(&chunk, "repl"));
    }

    let mut vm = Vm::new();
    match vm.interpret(&chunk, pool, &mut diagnostics) {
        Ok(value) => println!("{value}"),
        Err(_) => println!("runtime error"),
    }
}

fn run_file(path: &PathBuf, disassemble_flag: bool) -> ExitCode {
    let source = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("wisp: cannot read {}: {err}", path.display());
            return ExitCode::from(EXIT_FILE_UNREADABLE);
        }
    };

    let mut chunk = Chunk::new();
    let mut pool = StringPool::new();
    let mut diagnostics = std::io::stderr();

    if compile(&source, &mut chunk, &mut pool, &mut diagnostics).is_err() {
        return ExitCode::from(EXIT_COMPILE_ERROR);
    }

    if disassemble_flag {
        print!("{}", disassemble(&chunk, &path.display().to_string()));
    }

    let mut vm = Vm::new();
    match vm.interpret(&chunk, &mut pool, &mut diagnostics) {
        Ok(value) => {
            println!("{value}");
            ExitCode::from(EXIT_OK)
        }
        Err(VmError::Runtime(_)) | Err(VmError::OutOfMemory) => ExitCode::from(EXIT_RUNTIME_ERROR),
    }
}

