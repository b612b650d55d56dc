//! Time-limited evaluation on a worker thread

use super::cancel::CancelReason;
use super::env::Environment;
use super::error::RuntimeError;
use super::eval::eval_program;
use super::value::Value;
use crate::ast::Program;
use crossbeam::channel::{self, RecvTimeoutError};
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Why a time-limited evaluation produced no value
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("evaluation timed out after {}ms", .duration.as_millis())]
    Timeout { duration: Duration },

    #[error("evaluation panicked: {message}")]
    Panicked { message: String },
}

/// Evaluate `program` in `env`, giving up after `timeout`.
///
/// On timeout the cancel token is raised and the worker is joined; it stops
/// at its next call or loop iteration. Bindings made before that stay in
/// `env`. Memory-budget cancellation is not an error: the program's value
/// is whatever evaluation had produced when it stopped.
pub fn eval_with_timeout(
    env: &mut Environment,
    program: &Program,
    timeout: Duration,
) -> Result<Value, EvalError> {
    let token = env.reset_cancellation();
    let (tx, rx) = channel::bounded(1);

    thread::scope(|scope| {
        let worker = scope.spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| eval_program(program, env)));
            // The receiver is gone only if the caller already gave up.
            let _ = tx.send(result);
        });

        let outcome = match rx.recv_timeout(timeout) {
            Ok(Ok(result)) => result.map_err(EvalError::from),
            Ok(Err(payload)) => Err(EvalError::Panicked {
                message: panic_message(payload.as_ref()),
            }),
            Err(RecvTimeoutError::Timeout) => {
                token.cancel(CancelReason::Timeout);
                tracing::debug!(?timeout, "evaluation timed out, waiting for worker");
                Err(EvalError::Timeout { duration: timeout })
            }
            Err(RecvTimeoutError::Disconnected) => Err(EvalError::Panicked {
                message: "worker exited without a result".to_string(),
            }),
        };
        let _ = worker.join();
        outcome
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;
    use crate::parser::parse_source;

    fn program(source: &str) -> Program {
        parse_source("test.sl", source).expect("parse")
    }

    #[test]
    fn test_completes_within_limit() {
        let mut env = Environment::default();
        let value = eval_with_timeout(&mut env, &program(r#"x = "a" + "b""#), Duration::from_secs(5))
            .unwrap();
        assert_eq!(value, "ab");
        assert_eq!(env.get("x"), "ab");
    }

    #[test]
    fn test_infinite_loop_times_out() {
        let mut env = Environment::default();
        let started = std::time::Instant::now();
        let err = eval_with_timeout(
            &mut env,
            &program(r#"while ("true") { x = "spin" }"#),
            Duration::from_millis(100),
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(env.cancel_token().reason(), Some(CancelReason::Timeout));
        // work done before cancellation is kept
        assert_eq!(env.get("x"), "spin");
    }

    #[test]
    fn test_runtime_error_is_reported() {
        let mut env = Environment::default();
        let err = eval_with_timeout(&mut env, &program("missing()"), Duration::from_secs(5))
            .unwrap_err();
        match err {
            EvalError::Runtime(e) => assert_eq!(e.kind, ErrorKind::UndefinedFunction),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_environment_is_reusable_after_timeout() {
        let mut env = Environment::default();
        let spin = program(r#"while ("true") { "" }"#);
        assert!(eval_with_timeout(&mut env, &spin, Duration::from_millis(50)).is_err());
        let value = eval_with_timeout(&mut env, &program(r#""again""#), Duration::from_secs(5))
            .unwrap();
        assert_eq!(value, "again");
    }

    #[test]
    fn test_timeout_message() {
        let err = EvalError::Timeout {
            duration: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "evaluation timed out after 1500ms");
    }
}
