use std::fmt;

/// The compiler failed. Every individual diagnostic was already written to
/// the caller-supplied sink as it was discovered (panic-mode coalesces a
/// cascade of follow-on errors into silence after the first); this type is
/// just the closed-world signal that compilation as a whole did not
/// produce a usable chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileError;

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compilation failed")
    }
}

impl std::error::Error for CompileError {}
