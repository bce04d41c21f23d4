//! Scanner, chunk container, and single-pass Pratt compiler.
//!
//! # Modules
//!
//! - `scanner`: byte-oriented lexical analyzer.
//! - `opcode`: the bytecode instruction set.
//! - `chunk`: bytecode + constant pool + line table.
//! - `compiler`: the Pratt parser that emits bytecode into a `Chunk`.
//! - `error`: `CompileError`.
//! - `disasm`: developer-facing bytecode dump, not part of the contract.

pub mod chunk;
pub mod compiler;
pub mod disasm;
pub mod error;
pub mod opcode;
pub mod scanner;

pub use chunk::Chunk;
pub use compiler::compile;
pub use disasm::disassemble;
pub use error::CompileError;
pub use opcode::OpCode;
pub use scanner::{Scanner, Token, TokenKind};
