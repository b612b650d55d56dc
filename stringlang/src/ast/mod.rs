//! Abstract Syntax Tree definitions

mod expr;
mod span;
pub mod vars;

pub use expr::*;
pub use span::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A program: function declarations followed by a top-level block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub funcs: Vec<FnDecl>,
    pub body: Block,
}

/// Named function declaration: fun name(params) { body }
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
}

impl FnDecl {
    /// Declaration used to invoke a lambda through the regular call path
    pub fn from_lambda(lambda: &Lambda) -> Self {
        FnDecl {
            name: "temp_lambda".to_string(),
            params: lambda.params.clone(),
            body: lambda.body.clone(),
        }
    }
}

impl Program {
    pub fn new(funcs: Vec<FnDecl>, body: Block) -> Self {
        Self { funcs, body }
    }

    /// Look up a declared function by name
    pub fn func(&self, name: &str) -> Option<&FnDecl> {
        self.funcs.iter().find(|f| f.name == name)
    }

    /// If the program is exactly one top-level lambda expression, return it.
    pub fn as_single_lambda(&self) -> Option<&Lambda> {
        match (self.funcs.as_slice(), self.body.as_slice()) {
            ([], [Expr::Lambda(lambda)]) => Some(lambda),
            _ => None,
        }
    }
}

impl fmt::Display for FnDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fun {}({}) {}",
            self.name,
            self.params.join(", "),
            expr::braced(&self.body)
        )
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.funcs.is_empty() {
            let funcs: Vec<String> = self.funcs.iter().map(|d| d.to_string()).collect();
            write!(f, "{}\n\n", funcs.join("\n"))?;
        }
        write!(f, "{}", format_block(&self.body))
    }
}
