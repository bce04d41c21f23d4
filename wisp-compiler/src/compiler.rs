//! Single-pass Pratt parser: walks tokens from the [`Scanner`] and emits
//! bytecode directly into a [`Chunk`] — there is no intermediate AST.

use std::io::Write;

use wisp_core::{StringPool, Value};

use crate::chunk::Chunk;
use crate::error::CompileError;
use crate::opcode::OpCode;
use crate::scanner::{Scanner, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment,
    Conditional,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    /// One step above this precedence; used to enforce left-associativity
    /// when a binary operator recurses into its right-hand operand.
    fn one_above(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Conditional,
            Conditional => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call => Primary,
            Primary => panic!("cannot climb precedence past Primary"),
        }
    }
}

#[derive(Clone, Copy)]
enum Prefix {
    Grouping,
    Unary,
    Number,
    StringLit,
    Literal,
}

#[derive(Clone, Copy)]
enum Infix {
    Binary,
}

struct Rule {
    prefix: Option<Prefix>,
    infix: Option<Infix>,
    precedence: Precedence,
}

/// The parse rule table from spec §4.2, expressed as a dispatch function
/// rather than a table of function pointers (permitted by the spec's design
/// notes when the host can't cheaply build const fn-pointer tables).
fn rule_for(kind: TokenKind) -> Rule {
    use TokenKind::*;
    match kind {
        LeftParen => Rule {
            prefix: Some(Prefix::Grouping),
            infix: None,
            precedence: Precedence::None,
        },
        Minus => Rule {
            prefix: Some(Prefix::Unary),
            infix: Some(Infix::Binary),
            precedence: Precedence::Term,
        },
        Plus => Rule {
            prefix: None,
            infix: Some(Infix::Binary),
            precedence: Precedence::Term,
        },
        Slash | Star => Rule {
            prefix: None,
            infix: Some(Infix::Binary),
            precedence: Precedence::Factor,
        },
        Bang => Rule {
            prefix: Some(Prefix::Unary),
            infix: None,
            precedence: Precedence::None,
        },
        BangEqual | EqualEqual => Rule {
            prefix: None,
            infix: Some(Infix::Binary),
            precedence: Precedence::Equality,
        },
        Less | LessEqual | Greater | GreaterEqual => Rule {
            prefix: None,
            infix: Some(Infix::Binary),
            precedence: Precedence::Comparison,
        },
        Number => Rule {
            prefix: Some(Prefix::Number),
            infix: None,
            precedence: Precedence::None,
        },
        String => Rule {
            prefix: Some(Prefix::StringLit),
            infix: None,
            precedence: Precedence::None,
        },
        True | False | Nil => Rule {
            prefix: Some(Prefix::Literal),
            infix: None,
            precedence: Precedence::None,
        },
        _ => Rule {
            prefix: None,
            infix: None,
            precedence: Precedence::None,
        },
    }
}

struct Compiler<'src, 'sink> {
    scanner: Scanner<'src>,
    previous: Token<'src>,
    current: Token<'src>,
    chunk: &'sink mut Chunk,
    pool: &'sink mut StringPool,
    diagnostics: &'sink mut dyn Write,
    had_error: bool,
    panic_mode: bool,
}

/// Compile `source` into `chunk`, interning any string literals through
/// `pool`. Diagnostics are written as plain text lines to `diagnostics`.
pub fn compile(
    source: &[u8],
    chunk: &mut Chunk,
    pool: &mut StringPool,
    diagnostics: &mut dyn Write,
) -> Result<(), CompileError> {
    let scanner = Scanner::new(source);
    // Placeholder token, overwritten by the first `advance()` before
    // anything reads `previous`/`current`.
    let placeholder = Token {
        kind: TokenKind::Eof,
        line: 1,
        lexeme: &[],
    };
    let mut compiler = Compiler {
        scanner,
        previous: placeholder,
        current: placeholder,
        chunk,
        pool,
        diagnostics,
        had_error: false,
        panic_mode: false,
    };
    compiler.advance();

    compiler.expression();
    compiler.consume(TokenKind::Eof, "Expect end of expression.");
    let return_line = compiler.previous.line;
    compiler.emit_opcode_at(OpCode::Return, return_line);

    if compiler.had_error {
        Err(CompileError)
    } else {
        Ok(())
    }
}

impl<'src, 'sink> Compiler<'src, 'sink> {
    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.next_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            self.error_at_current_tok();
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, min_prec: Precedence) {
        self.advance();
        let prefix = rule_for(self.previous.kind).prefix;
        let Some(prefix) = prefix else {
            self.error_at_previous("Expect expression.");
            return;
        };
        self.apply_prefix(prefix);

        while rule_for(self.current.kind).precedence >= min_prec {
            self.advance();
            let infix = rule_for(self.previous.kind)
                .infix
                .expect("infix dispatch requested for a token with no infix rule");
            self.apply_infix(infix);
        }
    }

    fn apply_prefix(&mut self, prefix: Prefix) {
        match prefix {
            Prefix::Grouping => self.grouping(),
            Prefix::Unary => self.unary(),
            Prefix::Number => self.number(),
            Prefix::StringLit => self.string(),
            Prefix::Literal => self.literal(),
        }
    }

    fn apply_infix(&mut self, infix: Infix) {
        match infix {
            Infix::Binary => self.binary(),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self) {
        let operator = self.previous.kind;
        let line = self.previous.line;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_opcode_at(OpCode::Negate, line),
            TokenKind::Bang => self.emit_opcode_at(OpCode::Not, line),
            _ => unreachable!("unary() invoked for non-unary operator"),
        }
    }

    fn binary(&mut self) {
        let operator = self.previous.kind;
        let line = self.previous.line;
        let rule = rule_for(operator);
        self.parse_precedence(rule.precedence.one_above());
        match operator {
            TokenKind::Plus => self.emit_opcode_at(OpCode::Add, line),
            TokenKind::Minus => self.emit_opcode_at(OpCode::Subtract, line),
            TokenKind::Star => self.emit_opcode_at(OpCode::Multiply, line),
            TokenKind::Slash => self.emit_opcode_at(OpCode::Divide, line),
            TokenKind::EqualEqual => self.emit_opcode_at(OpCode::Equal, line),
            TokenKind::BangEqual => {
                self.emit_opcode_at(OpCode::Equal, line);
                self.emit_opcode_at(OpCode::Not, line);
            }
            TokenKind::Greater => self.emit_opcode_at(OpCode::Greater, line),
            TokenKind::GreaterEqual => {
                self.emit_opcode_at(OpCode::Less, line);
                self.emit_opcode_at(OpCode::Not, line);
            }
            TokenKind::Less => self.emit_opcode_at(OpCode::Less, line),
            TokenKind::LessEqual => {
                self.emit_opcode_at(OpCode::Greater, line);
                self.emit_opcode_at(OpCode::Not, line);
            }
            _ => unreachable!("binary() invoked for non-binary operator"),
        }
    }

    fn number(&mut self) {
        let text = self.previous.lexeme_str();
        let value: f64 = text
            .parse()
            .expect("scanner only produces well-formed number lexemes");
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self) {
        let bytes = self.previous.lexeme;
        let ptr = self.pool.intern(bytes);
        self.emit_constant(Value::Object(ptr));
    }

    fn literal(&mut self) {
        let line = self.previous.line;
        match self.previous.kind {
            TokenKind::Nil => self.emit_opcode_at(OpCode::Nil, line),
            TokenKind::True => self.emit_opcode_at(OpCode::True, line),
            TokenKind::False => self.emit_opcode_at(OpCode::False, line),
            _ => unreachable!("literal() invoked for a non-literal token"),
        }
    }

    fn emit_opcode_at(&mut self, op: OpCode, line: u32) {
        self.chunk.write_opcode(op, line);
    }

    fn emit_constant(&mut self, value: Value) {
        let line = self.previous.line;
        if self.chunk.emit_constant(value, line).is_none() {
            self.error_at_previous("Too many constants in one chunk.");
        }
    }

    fn error_at_current_tok(&mut self) {
        // Error tokens carry their diagnostic in place of a lexeme; there is
        // no real lexeme to locate, so this is not an "at end" diagnostic.
        let message = self.current.lexeme_str().into_owned();
        self.report_bare(self.current.line, &message);
    }

    fn error_at_current(&mut self, message: &str) {
        let line = self.current.line;
        let lexeme = if self.current.kind == TokenKind::Eof {
            None
        } else {
            Some(self.current.lexeme_str().into_owned())
        };
        self.report(line, lexeme, message);
    }

    fn error_at_previous(&mut self, message: &str) {
        let line = self.previous.line;
        let lexeme = if self.previous.kind == TokenKind::Eof {
            None
        } else {
            Some(self.previous.lexeme_str().into_owned())
        };
        self.report(line, lexeme, message);
    }

    /// `[line L] Error at '<lexeme>': <message>` (or `at end` for EOF).
    /// Panic mode suppresses every diagnostic after the first to avoid
    /// cascades; `had_error` is always set regardless.
    fn report(&mut self, line: u32, lexeme: Option<String>, message: &str) {
        let where_ = match lexeme {
            Some(text) => format!("at '{text}'"),
            None => "at end".to_string(),
        };
        self.emit_diagnostic(line, &format!(" {where_}: {message}"));
    }

    /// `[line L] Error: <message>`, with no `at` clause — used for scanner
    /// error tokens, which carry a message in place of a real lexeme.
    fn report_bare(&mut self, line: u32, message: &str) {
        self.emit_diagnostic(line, &format!(": {message}"));
    }

    fn emit_diagnostic(&mut self, line: u32, suffix: &str) {
        self.had_error = true;
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        let _ = writeln!(self.diagnostics, "[line {line}] Error{suffix}");
        tracing::debug!(line, suffix, "compile error reported");
    }
}

#[cfg(test)]
mod byte_count_tests {
    use super::*;
    use wisp_core::StringPool;

    fn emitted_len(source: &str) -> usize {
        let mut chunk = Chunk::new();
        let mut pool = StringPool::new();
        let mut diag = Vec::new();
        compile(source.as_bytes(), &mut chunk, &mut pool, &mut diag).unwrap();
        chunk.code().len()
    }

    #[test]
    fn emitted_byte_counts_match_spec_table() {
        assert_eq!(emitted_len("1 + 2 * (3 + 4)"), 12);
        assert_eq!(emitted_len("(-1 + 2) * 3 - -4"), 14);
        assert_eq!(emitted_len("true"), 2);
        assert_eq!(emitted_len("nil"), 2);
        assert_eq!(emitted_len("1 < 2 == 3 >= 4"), 13);
        assert_eq!(emitted_len("\"hello compiler\""), 3);
    }
}

#[cfg(test)]
mod diagnostic_tests {
    use super::*;
    use wisp_core::StringPool;

    #[test]
    fn unexpected_character_is_not_mislabeled_at_end() {
        let mut chunk = Chunk::new();
        let mut pool = StringPool::new();
        let mut diag = Vec::new();
        let result = compile(b"1 ~ 2", &mut chunk, &mut pool, &mut diag);
        assert!(result.is_err());
        let message = String::from_utf8(diag).unwrap();
        assert!(
            !message.contains("at end"),
            "scanner error token must not be reported as end-of-input: {message}"
        );
        assert!(message.starts_with("[line 1] Error: "));
    }
}
