//! Program-to-program passes
//!
//! Passes take a program and return a new one with the same value:
//! - [`normalize`]: rewrites every statement so it nests at most one level
//! - [`dead`]: removes statements whose effect can never be observed
//!
//! Dead code elimination reads one expression per graph node, so it is
//! meant to run on normalized programs. [`Pipeline::standard`] runs both in
//! that order.

pub mod dead;
pub mod normalize;

pub use dead::{Eliminate, eliminate};
pub use normalize::{Normalize, TEMP_PREFIX, normalize};

use crate::ast::Program;

/// A whole-program rewrite
pub trait ProgramPass {
    /// Name of the pass, used in logs
    fn name(&self) -> &'static str;

    fn run(&self, program: &Program) -> Program;
}

/// Passes applied in insertion order
pub struct Pipeline {
    passes: Vec<Box<dyn ProgramPass>>,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Normalization followed by dead code elimination
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline.add_pass(Box::new(Normalize));
        pipeline.add_pass(Box::new(Eliminate));
        pipeline
    }

    pub fn add_pass(&mut self, pass: Box<dyn ProgramPass>) {
        self.passes.push(pass);
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn run(&self, program: &Program) -> Program {
        let mut current = program.clone();
        for pass in &self.passes {
            current = pass.run(&current);
            tracing::debug!(
                pass = pass.name(),
                statements = current.body.len(),
                "pass finished"
            );
        }
        current
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
