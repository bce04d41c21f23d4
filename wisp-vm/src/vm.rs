//! Stack-based interpreter: decodes one [`wisp_compiler::Chunk`] and
//! evaluates it to a single [`Value`].

use std::io::Write;

use wisp_compiler::{Chunk, OpCode};
use wisp_core::{StringPool, Value};

use crate::error::VmError;

const STACK_CAPACITY: usize = 256;

pub struct Vm {
    stack: [Value; STACK_CAPACITY],
    stack_top: usize,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Vm {
            stack: [Value::Nil; STACK_CAPACITY],
            stack_top: 0,
        }
    }

    fn reset_stack(&mut self) {
        self.stack_top = 0;
    }

    fn push(&mut self, value: Value) {
        debug_assert!(
            self.stack_top < STACK_CAPACITY,
            "operand stack overflow: no recursive calls exist in this fragment"
        );
        self.stack[self.stack_top] = value;
        self.stack_top += 1;
    }

    fn pop(&mut self) -> Value {
        debug_assert!(self.stack_top > 0, "operand stack underflow");
        self.stack_top -= 1;
        self.stack[self.stack_top]
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack_top - 1 - distance]
    }

    /// Interpret `chunk` to completion, resetting the instruction pointer
    /// and operand stack first. Every runtime string the `Add` opcode
    /// allocates is interned through `pool`, which must outlive the
    /// returned `Value` if it holds a string reference.
    pub fn interpret(
        &mut self,
        chunk: &Chunk,
        pool: &mut StringPool,
        diagnostics: &mut dyn Write,
    ) -> Result<Value, VmError> {
        self.reset_stack();
        let mut ip: usize = 0;
        let code = chunk.code();

        loop {
            let instruction_line = chunk.line_at(ip);
            let op = OpCode::from_byte(code[ip])
                .unwrap_or_else(|| panic!("invalid opcode byte {} at offset {ip}", code[ip]));
            ip += 1;
            tracing::trace!(?op, ip, "dispatch");

            match op {
                OpCode::Constant => {
                    let index = code[ip] as usize;
                    ip += 1;
                    self.push(chunk.constants()[index]);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()));
                }
                OpCode::Negate => {
                    if !self.peek(0).is_number() {
                        return Err(self.runtime_error(
                            "Operand must be a number.",
                            instruction_line,
                            diagnostics,
                        ));
                    }
                    let n = self.pop().as_number().unwrap();
                    self.push(Value::Number(-n));
                }
                OpCode::Add => {
                    if self.peek(0).is_string() && self.peek(1).is_string() {
                        let b = self.pop();
                        let a = self.pop();
                        let (a_bytes, b_bytes) =
                            unsafe { (a.as_string_bytes(), b.as_string_bytes()) };
                        let ptr = pool.intern_concat(a_bytes, b_bytes);
                        self.push(Value::Object(ptr));
                    } else if self.peek(0).is_number() && self.peek(1).is_number() {
                        let b = self.pop().as_number().unwrap();
                        let a = self.pop().as_number().unwrap();
                        self.push(Value::Number(a + b));
                    } else {
                        return Err(self.runtime_error(
                            "Operands must be two numbers or two strings.",
                            instruction_line,
                            diagnostics,
                        ));
                    }
                }
                OpCode::Subtract | OpCode::Multiply | OpCode::Divide | OpCode::Greater
                | OpCode::Less => {
                    if !self.peek(0).is_number() || !self.peek(1).is_number() {
                        return Err(self.runtime_error(
                            "Operands must be numbers.",
                            instruction_line,
                            diagnostics,
                        ));
                    }
                    let b = self.pop().as_number().unwrap();
                    let a = self.pop().as_number().unwrap();
                    match op {
                        OpCode::Subtract => self.push(Value::Number(a - b)),
                        OpCode::Multiply => self.push(Value::Number(a * b)),
                        OpCode::Divide => self.push(Value::Number(a / b)),
                        OpCode::Greater => self.push(Value::Bool(a > b)),
                        OpCode::Less => self.push(Value::Bool(a < b)),
                        _ => unreachable!(),
                    }
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a.equals(&b)));
                }
                OpCode::Return => {
                    return Ok(self.pop());
                }
            }
        }
    }

    /// `<message> [line L] in script`, written to the diagnostic sink; `L`
    /// is the line associated with the byte immediately before the
    /// instruction pointer at the moment of failure.
    fn runtime_error(&mut self, message: &str, line: u32, diagnostics: &mut dyn Write) -> VmError {
        let _ = writeln!(diagnostics, "{message} [line {line}] in script");
        tracing::debug!(line, message, "runtime error");
        self.reset_stack();
        VmError::Runtime(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wisp_compiler::compile;

    fn run(source: &str) -> Result<Value, VmError> {
        let mut chunk = Chunk::new();
        let mut pool = StringPool::new();
        let mut diag = Vec::new();
        wisp_compiler::compile(source.as_bytes(), &mut chunk, &mut pool, &mut diag)
            .expect("expected successful compile");
        let mut vm = Vm::new();
        vm.interpret(&chunk, &mut pool, &mut diag)
    }

    #[test]
    fn arithmetic_precedence() {
        let value = run("1 + 2 * 3").unwrap();
        assert!(value.equals(&Value::Number(7.0)));
    }

    #[test]
    fn grouping_and_unary_minus() {
        let value = run("(-1 + 2) * 3 - -4").unwrap();
        assert!(value.equals(&Value::Number(7.0)));
    }

    #[test]
    fn comparison_and_boolean_chain() {
        let value = run("!(5 - 4 >= 3 * 2 == !nil)").unwrap();
        assert!(value.equals(&Value::Bool(true)));
    }

    #[test]
    fn nil_equals_nil() {
        assert!(run("nil == nil").unwrap().equals(&Value::Bool(true)));
    }

    #[test]
    fn string_concatenation() {
        let mut chunk = Chunk::new();
        let mut pool = StringPool::new();
        let mut diag = Vec::new();
        compile(
            br#""hello" + " " + "world""#,
            &mut chunk,
            &mut pool,
            &mut diag,
        )
        .unwrap();
        let mut vm = Vm::new();
        let value = vm.interpret(&chunk, &mut pool, &mut diag).unwrap();
        assert!(value.is_string());
        assert_eq!(unsafe { value.as_string_bytes() }, b"hello world");
    }

    #[test]
    fn string_equality_by_content() {
        assert!(run(r#""hello" == "hello""#)
            .unwrap()
            .equals(&Value::Bool(true)));
    }

    #[test]
    fn adding_bool_to_number_is_a_runtime_error() {
        let err = run("true + 1").unwrap_err();
        assert!(matches!(err, VmError::Runtime(_)));
    }

    #[test]
    fn negating_a_bool_is_a_runtime_error() {
        let err = run("-false").unwrap_err();
        match err {
            VmError::Runtime(msg) => assert_eq!(msg, "Operand must be a number."),
            _ => panic!("expected a runtime error"),
        }
    }

    #[test]
    fn stack_has_exactly_one_value_after_return() {
        let mut chunk = Chunk::new();
        let mut pool = StringPool::new();
        let mut diag = Vec::new();
        compile(b"1 < 2 == 3 >= 4", &mut chunk, &mut pool, &mut diag).unwrap();
        let mut vm = Vm::new();
        vm.interpret(&chunk, &mut pool, &mut diag).unwrap();
        assert_eq!(vm.stack_top, 0, "Return should leave the stack empty after popping the result");
    }
}
