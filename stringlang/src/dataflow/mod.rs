//! Backward dataflow analysis over control flow graphs
//!
//! # Data Flow Equations
//!
//! - `OUT[n]` = MEET(IN[s]) over all successors s of n
//! - `IN[n]`  = TRANSFER(OUT[n], n)
//!
//! Every fact starts at bottom. Nodes are swept in reverse label order until
//! a full sweep changes no IN fact. Both analyses here are may-analyses over
//! variable sets, so the meet is union and bottom is the empty set.

pub mod liveness;
pub mod side_effect;

pub use crate::ast::vars::VarSet;

use crate::cfg::{Cfg, Label, Node};
use std::collections::BTreeMap;
use std::fmt::Write;

/// A graph the solver can walk
pub trait FlowGraph {
    type Node;

    /// Node labels in forward order
    fn labels(&self) -> Vec<Label>;

    fn successors(&self, label: Label) -> Vec<Label>;

    fn node(&self, label: Label) -> &Self::Node;
}

impl FlowGraph for Cfg {
    type Node = Node;

    fn labels(&self) -> Vec<Label> {
        Cfg::labels(self)
    }

    fn successors(&self, label: Label) -> Vec<Label> {
        Cfg::node(self, label).successors()
    }

    fn node(&self, label: Label) -> &Node {
        Cfg::node(self, label)
    }
}

/// IN and OUT facts per label
#[derive(Debug, Clone, PartialEq)]
pub struct Solution<F> {
    pub in_facts: BTreeMap<Label, F>,
    pub out_facts: BTreeMap<Label, F>,
}

impl<F> Solution<F> {
    pub fn in_fact(&self, label: Label) -> Option<&F> {
        self.in_facts.get(&label)
    }

    pub fn out_fact(&self, label: Label) -> Option<&F> {
        self.out_facts.get(&label)
    }
}

/// Solve a backward analysis to its fixpoint
pub fn solve_backward<G, F, M, T>(graph: &G, meet: M, transfer: T, bottom: F) -> Solution<F>
where
    G: FlowGraph,
    F: Clone + PartialEq,
    M: Fn(&F, &F) -> F,
    T: Fn(&F, &G::Node) -> F,
{
    let labels = graph.labels();
    let mut in_facts: BTreeMap<Label, F> = labels.iter().map(|&l| (l, bottom.clone())).collect();
    let mut out_facts = in_facts.clone();

    let mut sweeps = 0usize;
    let mut changed = true;
    while changed {
        changed = false;
        sweeps += 1;

        for &label in labels.iter().rev() {
            let out = graph
                .successors(label)
                .iter()
                .filter_map(|succ| in_facts.get(succ))
                .fold(bottom.clone(), |acc, fact| meet(&acc, fact));
            let new_in = transfer(&out, graph.node(label));

            if in_facts.get(&label) != Some(&new_in) {
                in_facts.insert(label, new_in);
                changed = true;
            }
            out_facts.insert(label, out);
        }
    }
    tracing::trace!(sweeps, nodes = labels.len(), "backward dataflow converged");

    Solution { in_facts, out_facts }
}

/// Set union, the meet of both analyses
pub fn union(a: &VarSet, b: &VarSet) -> VarSet {
    a | b
}

fn format_set(set: &VarSet) -> String {
    let names: Vec<&str> = set.iter().map(String::as_str).collect();
    format!("{{{}}}", names.join(", "))
}

/// Render IN/OUT facts node by node, one line per node
pub fn format_flows(cfg: &Cfg, solution: &Solution<VarSet>) -> String {
    let empty = VarSet::new();
    let mut out = String::new();
    for label in cfg.labels() {
        let node = cfg.node(label);
        let _ = writeln!(
            out,
            "{label:>3}: {:<32} in {:<20} out {}",
            node.text().replace('\n', " "),
            format_set(solution.in_fact(label).unwrap_or(&empty)),
            format_set(solution.out_fact(label).unwrap_or(&empty)),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::build;
    use crate::parser::parse_source;

    fn graph(source: &str) -> Cfg {
        build(&parse_source("test.sl", source).expect("parse").body)
    }

    fn set(names: &[&str]) -> VarSet {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_solver_counts_reachable_nodes() {
        // Each node's IN is the number of nodes on the longest path to an exit,
        // capped so loops still converge.
        let cfg = graph(r#"a; b; c"#);
        let solution = solve_backward(
            &cfg,
            |x: &usize, y: &usize| *x.max(y),
            |out: &usize, _node: &Node| (*out + 1).min(10),
            0usize,
        );
        assert_eq!(solution.in_fact(4), Some(&1));
        assert_eq!(solution.in_fact(1), Some(&4));
        assert_eq!(solution.out_fact(4), Some(&0));
    }

    #[test]
    fn test_solver_converges_on_loops() {
        let cfg = graph(r#"while (c) { a }"#);
        let solution = solve_backward(
            &cfg,
            |x: &usize, y: &usize| *x.max(y),
            |out: &usize, _node: &Node| (*out + 1).min(10),
            0usize,
        );
        assert_eq!(solution.in_fact(2), Some(&10));
    }

    #[test]
    fn test_solution_covers_only_reachable_labels() {
        let mut cfg = graph(r#"a = "1"; b"#);
        cfg.remove(2).unwrap();
        let solution = solve_backward(&cfg, union, |out: &VarSet, _: &Node| out.clone(), VarSet::new());
        assert!(solution.in_fact(2).is_none());
        assert_eq!(solution.in_facts.len(), 2);
    }

    #[test]
    fn test_format_flows() {
        let cfg = graph(r#"a = "1"; a"#);
        let solution = liveness::analyze(&cfg);
        let text = format_flows(&cfg, &solution);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("a = \"1\""));
        assert!(lines[1].contains("out {a}"));
        assert!(lines[2].contains("in {a}"));
    }

    #[test]
    fn test_union() {
        assert_eq!(union(&set(&["a"]), &set(&["b", "a"])), set(&["a", "b"]));
    }
}
