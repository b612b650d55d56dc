//! Dead code elimination over normalized programs
//!
//! Each block is turned into a graph, and side-effect liveness decides which
//! nodes can go:
//!
//! - `x = e` with a pure `e`, where `x` is not side-effect live afterwards
//! - an `if` with a pure condition whose arms lead to the same node
//! - any other pure plain statement
//!
//! Exits and the sentinel always stay. When a loop ends the block, the
//! statements closing its body are exits, since the last of them gives the
//! loop's value. Loop heads stay too, even when the loop computes nothing
//! observable. Removing nodes can make further nodes
//! dead, so analysis and removal repeat until the rebuilt block stops
//! changing.

use super::ProgramPass;
use crate::ast::vars::{VarSet, has_side_effects};
use crate::ast::{Block, Expr, FnDecl, Program, format_block};
use crate::cfg::{self, Cfg, Label, NodeKind};
use crate::dataflow::side_effect;

/// Eliminate dead code from the top-level block and every function body.
/// Expects normalized input; nested expressions are only removed whole.
pub fn eliminate(program: &Program) -> Program {
    let body = eliminate_block(&program.body);
    let funcs = program
        .funcs
        .iter()
        .map(|decl| FnDecl {
            name: decl.name.clone(),
            params: decl.params.clone(),
            body: eliminate_block(&decl.body),
        })
        .collect();
    Program::new(funcs, body)
}

/// The elimination step as a pipeline pass
pub struct Eliminate;

impl ProgramPass for Eliminate {
    fn name(&self) -> &'static str {
        "dead-code"
    }

    fn run(&self, program: &Program) -> Program {
        eliminate(program)
    }
}

pub fn eliminate_block(block: &[Expr]) -> Block {
    let mut graph = cfg::build(block);
    let mut pass = 0usize;
    loop {
        pass += 1;
        let before = format_block(&graph.collect());
        let removed = remove_dead_nodes(&mut graph);
        let collected = graph.collect();
        let after = format_block(&collected);
        tracing::debug!(pass, removed, block = %after, "dead code pass");
        if after == before {
            return collected;
        }
    }
}

/// One analysis and removal round. Returns how many nodes were removed.
fn remove_dead_nodes(graph: &mut Cfg) -> usize {
    let facts = side_effect::analyze(graph);
    let empty = VarSet::new();

    let dead: Vec<Label> = graph
        .visit()
        .into_iter()
        .filter(|&label| {
            if graph.is_exit(label) {
                return false;
            }
            let node = graph.node(label);
            let Some(expr) = &node.expr else {
                return false;
            };
            match (node.kind, expr) {
                (NodeKind::Plain, Expr::Assign { name, value }) => {
                    let live = facts.out_fact(label).unwrap_or(&empty);
                    !has_side_effects(value) && !live.contains(name)
                }
                (NodeKind::Plain, other) => !has_side_effects(other),
                (NodeKind::If, cond) => node.is_degenerate_if() && !has_side_effects(cond),
                // TODO: drop loops whose body and condition are pure and
                // whose assignments are all dead
                (NodeKind::While, _) | (NodeKind::Sentinel, _) => false,
            }
        })
        .collect();

    let mut removed = 0;
    for label in dead {
        match graph.remove(label) {
            Ok(()) => removed += 1,
            Err(e) => tracing::debug!(error = %e, "dead node kept"),
        }
    }
    removed
}
