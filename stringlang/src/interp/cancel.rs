//! Cooperative cancellation shared by one top-level evaluation

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Why an evaluation was asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Timeout,
    OutOfMemory,
    ExternalExit,
}

impl CancelReason {
    fn code(self) -> u8 {
        match self {
            CancelReason::Timeout => 1,
            CancelReason::OutOfMemory => 2,
            CancelReason::ExternalExit => 3,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(CancelReason::Timeout),
            2 => Some(CancelReason::OutOfMemory),
            3 => Some(CancelReason::ExternalExit),
            _ => None,
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Timeout => write!(f, "timeout"),
            CancelReason::OutOfMemory => write!(f, "out of memory"),
            CancelReason::ExternalExit => write!(f, "external exit"),
        }
    }
}

const NOT_CANCELLED: u8 = 0;

/// A shared cancelled flag plus the reason it was raised.
///
/// Clones observe the same flag. The first reason raised wins and the flag
/// stays set; the evaluator polls it at call entry and loop iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicU8>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Returns false if it was already raised.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.0
            .compare_exchange(NOT_CANCELLED, reason.code(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire) != NOT_CANCELLED
    }

    pub fn reason(&self) -> Option<CancelReason> {
        CancelReason::from_code(self.0.load(Ordering::Acquire))
    }
}
