//! Human-readable bytecode dump. A developer aid, not part of the
//! compile/interpret contract — nothing in this crate or `wisp-vm` depends
//! on its output.

use std::fmt::Write as _;

use crate::chunk::Chunk;
use crate::opcode::OpCode;

/// Render every instruction in `chunk` as `<offset> <line> <mnemonic> [operand]`.
pub fn disassemble(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {name} ==");
    let mut offset = 0;
    while offset < chunk.code().len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }
    out
}

fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let _ = write!(out, "{offset:04} ");
    if offset > 0 && chunk.line_at(offset) == chunk.line_at(offset - 1) {
        let _ = write!(out, "   | ");
    } else {
        let _ = write!(out, "{:4} ", chunk.line_at(offset));
    }

    let byte = chunk.code()[offset];
    match OpCode::from_byte(byte) {
        Some(OpCode::Constant) => {
            let index = chunk.code()[offset + 1] as usize;
            let _ = writeln!(
                out,
                "{:<16} {:4} '{}'",
                "CONSTANT",
                index,
                chunk.constants()[index]
            );
            offset + 2
        }
        Some(op) => {
            let _ = writeln!(out, "{}", mnemonic(op));
            offset + 1
        }
        None => {
            let _ = writeln!(out, "UNKNOWN {byte}");
            offset + 1
        }
    }
}

fn mnemonic(op: OpCode) -> &'static str {
    match op {
        OpCode::Constant => "CONSTANT",
        OpCode::Nil => "NIL",
        OpCode::True => "TRUE",
        OpCode::False => "FALSE",
        OpCode::Not => "NOT",
        OpCode::Equal => "EQUAL",
        OpCode::Greater => "GREATER",
        OpCode::Less => "LESS",
        OpCode::Add => "ADD",
        OpCode::Subtract => "SUBTRACT",
        OpCode::Negate => "NEGATE",
        OpCode::Multiply => "MULTIPLY",
        OpCode::Divide => "DIVIDE",
        OpCode::Return => "RETURN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use wisp_core::StringPool;

    #[test]
    fn dumps_one_line_per_instruction_plus_header() {
        let mut chunk = Chunk::new();
        let mut pool = StringPool::new();
        let mut diag = Vec::new();
        compile(b"1 + 2", &mut chunk, &mut pool, &mut diag).unwrap();
        let dump = disassemble(&chunk, "test");
        assert!(dump.starts_with("== test ==\n"));
        assert_eq!(dump.lines().count(), 1 + 4); // header + CONSTANT,CONSTANT,ADD,RETURN
    }
}
