//! Rebuild a statement block from a graph
//!
//! `if` and `while` groupings are recovered from the graph shape: a loop
//! body runs from the head's taken edge back to the head, and the two arms
//! of an `if` run up to their merge node, the lowest label reachable from
//! both arms.

use super::{Cfg, Label, Node, NodeKind};
use crate::ast::{Block, Expr};
use std::collections::HashSet;

impl Cfg {
    /// The block this graph currently represents
    pub fn collect(&self) -> Block {
        let mut out = Vec::new();
        self.collect_into(self.node(self.entry).succ_not_taken, &HashSet::new(), &mut out);
        out
    }

    /// Append statements from `start` onward, stopping at any label in
    /// `stops` (enclosing loop heads and merge nodes) or at a dead end
    fn collect_into(&self, start: Option<Label>, stops: &HashSet<Label>, out: &mut Block) {
        let mut current = start;
        while let Some(label) = current {
            if stops.contains(&label) {
                return;
            }
            let node = self.node(label);
            current = match node.kind {
                NodeKind::Sentinel => node.succ_not_taken,
                NodeKind::Plain => {
                    out.extend(node.expr.clone());
                    node.succ_not_taken
                }
                NodeKind::While => {
                    let inner = with_stop(stops, Some(label));
                    let mut body = Vec::new();
                    self.collect_into(node.succ_taken, &inner, &mut body);
                    out.push(Expr::While {
                        cond: Box::new(condition(node)),
                        body,
                    });
                    node.succ_not_taken
                }
                NodeKind::If => {
                    let merge = self.merge_point(node, stops);
                    let inner = with_stop(stops, merge);
                    let mut then_branch = Vec::new();
                    self.collect_into(node.succ_taken, &inner, &mut then_branch);
                    let mut else_branch = Vec::new();
                    self.collect_into(node.succ_not_taken, &inner, &mut else_branch);
                    out.push(Expr::If {
                        cond: Box::new(condition(node)),
                        then_branch,
                        else_branch,
                    });
                    merge
                }
            };
        }
    }

    /// Lowest label reachable from both arms of `node` without passing a stop.
    /// `None` when the arms never meet before leaving the enclosing region.
    fn merge_point(&self, node: &Node, stops: &HashSet<Label>) -> Option<Label> {
        let taken = self.reachable(node.succ_taken, stops);
        let not_taken = self.reachable(node.succ_not_taken, stops);
        taken
            .iter()
            .zip(&not_taken)
            .position(|(&a, &b)| a && b)
            .map(|index| self.first_label + index)
    }

    /// Reachability mask indexed by `label - first_label`
    fn reachable(&self, start: Option<Label>, stops: &HashSet<Label>) -> Vec<bool> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack: Vec<Label> = start.into_iter().collect();
        while let Some(label) = stack.pop() {
            let index = label - self.first_label;
            if seen[index] || stops.contains(&label) {
                continue;
            }
            seen[index] = true;
            stack.extend(self.node(label).successors());
        }
        seen
    }
}

fn with_stop(stops: &HashSet<Label>, extra: Option<Label>) -> HashSet<Label> {
    let mut out = stops.clone();
    out.extend(extra);
    out
}

fn condition(node: &Node) -> Expr {
    node.expr.clone().unwrap_or_else(|| Expr::literal(""))
}
