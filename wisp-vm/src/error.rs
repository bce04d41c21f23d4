use std::fmt;

/// The two ways `interpret` can fail. `CompileError` lives in `wisp-compiler`
/// and is never seen here: if compilation fails, the VM is never invoked
/// for that chunk (spec §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// A value-type mismatch during instruction dispatch. Fatal: the VM
    /// stops executing the chunk, there is no recovery.
    Runtime(String),
    /// An allocation failure during execution. Propagated unchanged.
    OutOfMemory,
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::Runtime(message) => write!(f, "{message}"),
            VmError::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

impl std::error::Error for VmError {}
