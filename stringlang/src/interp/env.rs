//! Environment for variable bindings

use super::cancel::{CancelReason, CancelToken};
use super::natives;
use super::Value;
use crate::ast::FnDecl;
use std::collections::HashMap;
use std::sync::Arc;

/// Native function type
pub type NativeFn = fn(&[Value]) -> Value;

/// Native functions by name
pub type Natives = HashMap<String, NativeFn>;

/// Bytes charged against the budget for every call frame
pub const FRAME_OVERHEAD: i64 = 8 * 1024;

/// Memory a frame's variables may occupy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    Unlimited,
    Limited(i64),
}

impl Budget {
    /// Any negative size means unlimited
    pub fn from_signed(max: i64) -> Self {
        if max < 0 { Budget::Unlimited } else { Budget::Limited(max) }
    }
}

/// One call frame: variables plus the tables shared by the whole call tree
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variable bindings of this frame
    vars: HashMap<String, Value>,
    /// Native functions (read-only)
    natives: Arc<Natives>,
    /// User-defined functions
    functions: Arc<HashMap<String, Arc<FnDecl>>>,
    /// Positional program arguments
    args: Arc<[Value]>,
    budget: Budget,
    cancel: CancelToken,
    /// Call depth of this frame (0 for the root)
    depth: usize,
}

impl Environment {
    /// Create a root environment with the default natives
    pub fn new(args: Vec<Value>) -> Self {
        Self::with_natives(args, natives::default_natives())
    }

    pub fn with_natives(args: Vec<Value>, natives: Natives) -> Self {
        Environment {
            vars: HashMap::new(),
            natives: Arc::new(natives),
            functions: Arc::new(HashMap::new()),
            args: args.into(),
            budget: Budget::Unlimited,
            cancel: CancelToken::new(),
            depth: 0,
        }
    }

    /// A fresh frame for a function call.
    ///
    /// Shares function tables, arguments and the cancel token. The budget
    /// shrinks by this frame's footprint plus [`FRAME_OVERHEAD`].
    pub fn child(&self) -> Self {
        let budget = match self.budget {
            Budget::Unlimited => Budget::Unlimited,
            Budget::Limited(max) => {
                Budget::Limited(max - self.footprint() as i64 - FRAME_OVERHEAD)
            }
        };
        Environment {
            vars: HashMap::new(),
            natives: Arc::clone(&self.natives),
            functions: Arc::clone(&self.functions),
            args: Arc::clone(&self.args),
            budget,
            cancel: self.cancel.clone(),
            depth: self.depth + 1,
        }
    }

    /// Variable value; unbound names read as the empty value
    pub fn get(&self, name: &str) -> Value {
        self.vars.get(name).cloned().unwrap_or_default()
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Positional argument; out of range reads as the empty value
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or_default()
    }

    /// Set the memory budget in bytes; negative means unlimited
    pub fn set_max_footprint(&mut self, max: i64) {
        self.budget = Budget::from_signed(max);
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// Bytes held by this frame's variable names and values
    pub fn footprint(&self) -> usize {
        self.vars.iter().map(|(k, v)| k.len() + v.footprint()).sum()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn native(&self, name: &str) -> Option<NativeFn> {
        self.natives.get(name).copied()
    }

    pub fn function(&self, name: &str) -> Option<Arc<FnDecl>> {
        self.functions.get(name).cloned()
    }

    /// Declare or replace a user function
    pub fn register_function(&mut self, decl: FnDecl) {
        Arc::make_mut(&mut self.functions).insert(decl.name.clone(), Arc::new(decl));
    }

    /// Whether `name` resolves as a call target without any variable
    pub fn is_function_name(&self, name: &str) -> bool {
        self.functions.contains_key(name)
            || self.natives.contains_key(name)
            || name == natives::EVAL
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Install a fresh cancel token for a new top-level evaluation
    pub fn reset_cancellation(&mut self) -> CancelToken {
        self.cancel = CancelToken::new();
        self.cancel.clone()
    }

    /// Poll point for loops and calls.
    ///
    /// Raises `OutOfMemory` when the frame is over budget; returns whether
    /// evaluation should stop.
    pub fn check_exit(&self) -> bool {
        if let Budget::Limited(max) = self.budget {
            let used = self.footprint() as i64;
            if used > max {
                if self.cancel.cancel(CancelReason::OutOfMemory) {
                    tracing::debug!(used, max, depth = self.depth, "memory budget exceeded");
                }
                return true;
            }
        }
        self.cancel.is_cancelled()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
