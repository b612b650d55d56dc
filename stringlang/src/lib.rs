//! stringlang Library
//!
//! A small scripting language whose only value type is the string, with a
//! tree-walking interpreter and an optimizer built on control flow graphs:
//!
//! - [`interp`] evaluates programs, optionally under a timeout and a
//!   memory budget
//! - [`cfg`] turns blocks into graphs and graphs back into blocks
//! - [`dataflow`] runs backward analyses (liveness, side-effect liveness)
//! - [`optimize`] normalizes programs and removes dead code

pub mod ast;
pub mod cfg;
pub mod config;
pub mod dataflow;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod optimize;
pub mod parser;
pub mod repl;

pub use ast::Span;
pub use error::{CompileError, Result};

/// Parse a complete source text into a program
pub fn parse(source: &str) -> Result<ast::Program> {
    parser::parse_source("<input>", source)
}
