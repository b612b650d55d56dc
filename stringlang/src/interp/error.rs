//! Runtime errors for the interpreter
//!
//! Only fatal conditions are errors. Soft failures (bad index, malformed
//! dynamic call, failed `eval`) evaluate to the empty value instead.

use std::fmt;

/// Fatal runtime error during interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Call of a name that is neither a user function nor a native
    UndefinedFunction,
    /// Call nesting exceeded the interpreter's depth limit
    StackOverflow,
}

impl RuntimeError {
    pub fn undefined_function(name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::UndefinedFunction,
            message: format!("function {name} not found"),
        }
    }

    pub fn stack_overflow(depth: usize) -> Self {
        RuntimeError {
            kind: ErrorKind::StackOverflow,
            message: format!("stack overflow: call depth exceeded {depth}"),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error: {}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;
