//! Tree-walking interpreter for stringlang
//!
//! Every value is a string. Evaluation is single-threaded; the
//! [`driver`] runs it on a worker thread with a wall-clock limit.

mod cancel;
pub mod driver;
mod env;
mod error;
mod eval;
pub mod natives;
mod value;

pub use cancel::{CancelReason, CancelToken};
pub use driver::{EvalError, eval_with_timeout};
pub use env::{Budget, Environment, FRAME_OVERHEAD, NativeFn, Natives};
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::{MAX_CALL_DEPTH, call_function, eval, eval_block, eval_program};
pub use value::Value;
