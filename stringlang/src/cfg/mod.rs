//! Control flow graphs over statement blocks
//!
//! Every node holds a single expression. Branches (`if` conditions) and loop
//! heads (`while` conditions) have a taken edge into their then-branch or
//! body and a not-taken edge to whatever follows; every other node has at
//! most a not-taken edge. Each graph starts at a sentinel node without an
//! expression.
//!
//! Nodes live in an arena indexed by label. Labels are handed out by a
//! [`LabelCounter`] and stay unique across all graphs built from it, so
//! analysis results for a whole program can be keyed by label alone.
//!
//! # Example
//!
//! ```ignore
//! let program = stringlang::parse(r#"a = "1"; if (a) { b = a } else { }; b"#)?;
//! let graphs = ProgramCfg::build(&program);
//! assert_eq!(graphs.body.collect(), program.body);
//! ```

mod collect;
pub mod export;

use crate::ast::{Expr, Program};
use serde::Serialize;
use thiserror::Error;

/// Node identifier, unique across every graph built from one counter
pub type Label = usize;

/// Outgoing edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Edge {
    /// Fall-through, or the false side of a branch
    NotTaken,
    /// The true side of an `if` or a loop entry
    Taken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Graph entry; carries no expression
    Sentinel,
    Plain,
    /// Condition of an `if`
    If,
    /// Condition of a `while`
    While,
}

/// A graph node
#[derive(Debug, Clone)]
pub struct Node {
    pub label: Label,
    /// `None` only for the sentinel
    pub expr: Option<Expr>,
    pub kind: NodeKind,
    pub succ_not_taken: Option<Label>,
    pub succ_taken: Option<Label>,
    pub preds_not_taken: Vec<Label>,
    pub preds_taken: Vec<Label>,
    removed: bool,
}

impl Node {
    fn new(label: Label, expr: Option<Expr>, kind: NodeKind) -> Self {
        Node {
            label,
            expr,
            kind,
            succ_not_taken: None,
            succ_taken: None,
            preds_not_taken: Vec::new(),
            preds_taken: Vec::new(),
            removed: false,
        }
    }

    pub fn successor(&self, edge: Edge) -> Option<Label> {
        match edge {
            Edge::NotTaken => self.succ_not_taken,
            Edge::Taken => self.succ_taken,
        }
    }

    fn successor_mut(&mut self, edge: Edge) -> &mut Option<Label> {
        match edge {
            Edge::NotTaken => &mut self.succ_not_taken,
            Edge::Taken => &mut self.succ_taken,
        }
    }

    fn preds_mut(&mut self, edge: Edge) -> &mut Vec<Label> {
        match edge {
            Edge::NotTaken => &mut self.preds_not_taken,
            Edge::Taken => &mut self.preds_taken,
        }
    }

    /// Successor labels, not-taken first
    pub fn successors(&self) -> Vec<Label> {
        self.succ_not_taken.into_iter().chain(self.succ_taken).collect()
    }

    /// Predecessor labels over both edge kinds
    pub fn predecessors(&self) -> Vec<Label> {
        self.preds_not_taken
            .iter()
            .chain(&self.preds_taken)
            .copied()
            .collect()
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.kind, NodeKind::If | NodeKind::While)
    }

    /// An `if` whose two edges lead to the same place
    pub fn is_degenerate_if(&self) -> bool {
        self.kind == NodeKind::If && self.succ_taken == self.succ_not_taken
    }

    /// Source text of the node's expression
    pub fn text(&self) -> String {
        match &self.expr {
            Some(expr) => expr.to_string(),
            None => "<entry>".to_string(),
        }
    }
}

/// Hands out graph labels, starting at 1
#[derive(Debug, Clone)]
pub struct LabelCounter {
    next: Label,
}

impl LabelCounter {
    pub fn new() -> Self {
        LabelCounter { next: 1 }
    }

    /// The label the next call to [`LabelCounter::next_label`] returns
    pub fn peek(&self) -> Label {
        self.next
    }

    pub fn next_label(&mut self) -> Label {
        let label = self.next;
        self.next += 1;
        label
    }
}

impl Default for LabelCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a node cannot be removed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CfgError {
    #[error("no node with label {0}")]
    UnknownLabel(Label),

    #[error("node {0} is the entry sentinel")]
    Sentinel(Label),

    #[error("node {0} is an exit")]
    Exit(Label),

    #[error("node {0} is a loop head")]
    LoopHead(Label),

    #[error("node {0} branches to two different successors")]
    Branching(Label),
}

/// Control flow graph of one block
#[derive(Debug, Clone)]
pub struct Cfg {
    first_label: Label,
    nodes: Vec<Node>,
    entry: Label,
    exits: Vec<Label>,
}

/// A pending edge: the node it leaves and which edge it uses
type Pending = Vec<(Label, Edge)>;

impl Cfg {
    /// Build the graph of `block`, taking labels from `counter`
    pub fn from_block(block: &[Expr], counter: &mut LabelCounter) -> Self {
        let first_label = counter.peek();
        let mut cfg = Cfg {
            first_label,
            nodes: Vec::new(),
            entry: first_label,
            exits: Vec::new(),
        };

        let entry = cfg.push(None, NodeKind::Sentinel, counter);
        let pending = cfg.build_block(block, vec![(entry, Edge::NotTaken)], counter);

        for (label, _) in pending {
            if !cfg.exits.contains(&label) {
                cfg.exits.push(label);
            }
        }
        cfg.fill_preds();
        cfg.add_loop_tail_exits();
        cfg
    }

    fn push(&mut self, expr: Option<Expr>, kind: NodeKind, counter: &mut LabelCounter) -> Label {
        let label = counter.next_label();
        debug_assert_eq!(label, self.first_label + self.nodes.len());
        self.nodes.push(Node::new(label, expr, kind));
        label
    }

    /// Create a node and point every pending edge at it
    fn attach(
        &mut self,
        expr: &Expr,
        kind: NodeKind,
        pending: &[(Label, Edge)],
        counter: &mut LabelCounter,
    ) -> Label {
        let label = self.push(Some(expr.clone()), kind, counter);
        self.connect(pending, label);
        label
    }

    fn connect(&mut self, pending: &[(Label, Edge)], target: Label) {
        for &(from, edge) in pending {
            *self.node_mut(from).successor_mut(edge) = Some(target);
        }
    }

    /// Wire `block` after `pending`; returns the edges leaving the block
    fn build_block(&mut self, block: &[Expr], mut pending: Pending, counter: &mut LabelCounter) -> Pending {
        for expr in block {
            pending = match expr {
                Expr::If {
                    cond,
                    then_branch,
                    else_branch,
                } => {
                    let head = self.attach(cond, NodeKind::If, &pending, counter);
                    let mut exits = self.build_block(then_branch, vec![(head, Edge::Taken)], counter);
                    exits.extend(self.build_block(else_branch, vec![(head, Edge::NotTaken)], counter));
                    exits
                }
                Expr::While { cond, body } => {
                    let head = self.attach(cond, NodeKind::While, &pending, counter);
                    let body_exits = self.build_block(body, vec![(head, Edge::Taken)], counter);
                    self.connect(&body_exits, head);
                    vec![(head, Edge::NotTaken)]
                }
                Expr::Block(inner) => self.build_block(inner, pending, counter),
                other => {
                    let label = self.attach(other, NodeKind::Plain, &pending, counter);
                    vec![(label, Edge::NotTaken)]
                }
            };
        }
        pending
    }

    /// Derive predecessor lists from the successor edges
    fn fill_preds(&mut self) {
        for label in self.visit() {
            for edge in [Edge::NotTaken, Edge::Taken] {
                if let Some(succ) = self.node(label).successor(edge) {
                    self.node_mut(succ).preds_mut(edge).push(label);
                }
            }
        }
    }

    /// A loop's value is the last value its body computed, so the nodes
    /// closing the body of an exiting loop are exits as well. Body nodes
    /// are labelled after their head, which separates back edges from the
    /// edge entering the loop.
    fn add_loop_tail_exits(&mut self) {
        let mut index = 0;
        while index < self.exits.len() {
            let head = self.node(self.exits[index]);
            if head.kind == NodeKind::While {
                let tails: Vec<Label> = head
                    .predecessors()
                    .into_iter()
                    .filter(|&pred| pred >= head.label)
                    .collect();
                for tail in tails {
                    if !self.exits.contains(&tail) {
                        self.exits.push(tail);
                    }
                }
            }
            index += 1;
        }
    }

    /// Labels reachable from the entry, in depth-first preorder
    /// (not-taken edges first)
    pub fn visit(&self) -> Vec<Label> {
        let mut order = Vec::new();
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.entry];
        while let Some(label) = stack.pop() {
            let index = label - self.first_label;
            if seen[index] {
                continue;
            }
            seen[index] = true;
            order.push(label);

            let node = self.node(label);
            stack.extend(node.succ_taken);
            stack.extend(node.succ_not_taken);
        }
        order
    }

    /// Reachable labels in ascending order
    pub fn labels(&self) -> Vec<Label> {
        let mut labels = self.visit();
        labels.sort_unstable();
        labels
    }

    pub fn entry(&self) -> Label {
        self.entry
    }

    /// Nodes whose value is the block's value
    pub fn exits(&self) -> &[Label] {
        &self.exits
    }

    pub fn is_exit(&self, label: Label) -> bool {
        self.exits.contains(&label)
    }

    /// Live node by label
    pub fn get(&self, label: Label) -> Option<&Node> {
        label
            .checked_sub(self.first_label)
            .and_then(|index| self.nodes.get(index))
            .filter(|node| !node.removed)
    }

    /// Node by label. Panics on a label from another graph.
    pub fn node(&self, label: Label) -> &Node {
        &self.nodes[label - self.first_label]
    }

    fn node_mut(&mut self, label: Label) -> &mut Node {
        &mut self.nodes[label - self.first_label]
    }

    /// Splice a node out of the graph.
    ///
    /// Only plain nodes and degenerate `if` nodes qualify, and never the
    /// sentinel or an exit. Every predecessor is redirected, on the same
    /// edge kind, to the node's sole successor.
    pub fn remove(&mut self, label: Label) -> Result<(), CfgError> {
        let node = self.get(label).ok_or(CfgError::UnknownLabel(label))?;
        match node.kind {
            NodeKind::Sentinel => return Err(CfgError::Sentinel(label)),
            NodeKind::While => return Err(CfgError::LoopHead(label)),
            NodeKind::If if !node.is_degenerate_if() => return Err(CfgError::Branching(label)),
            NodeKind::If | NodeKind::Plain => {}
        }
        if self.is_exit(label) {
            return Err(CfgError::Exit(label));
        }

        let succ = node.succ_not_taken;
        let preds_not_taken = node.preds_not_taken.clone();
        let preds_taken = node.preds_taken.clone();

        if let Some(succ) = succ {
            let next = self.node_mut(succ);
            next.preds_not_taken.retain(|&p| p != label);
            next.preds_taken.retain(|&p| p != label);
        }

        for (preds, edge) in [(preds_not_taken, Edge::NotTaken), (preds_taken, Edge::Taken)] {
            for pred in preds {
                *self.node_mut(pred).successor_mut(edge) = succ;
                if let Some(succ) = succ {
                    self.node_mut(succ).preds_mut(edge).push(pred);
                }
            }
        }

        let node = self.node_mut(label);
        node.removed = true;
        node.succ_not_taken = None;
        node.succ_taken = None;
        node.preds_not_taken.clear();
        node.preds_taken.clear();
        Ok(())
    }
}

/// Graphs for a whole program, all labelled from one counter
#[derive(Debug, Clone)]
pub struct ProgramCfg {
    pub body: Cfg,
    /// One graph per declaration, in declaration order
    pub funcs: Vec<(String, Cfg)>,
}

impl ProgramCfg {
    pub fn build(program: &Program) -> Self {
        let mut counter = LabelCounter::new();
        let body = Cfg::from_block(&program.body, &mut counter);
        let funcs = program
            .funcs
            .iter()
            .map(|decl| (decl.name.clone(), Cfg::from_block(&decl.body, &mut counter)))
            .collect();
        ProgramCfg { body, funcs }
    }

    pub fn func(&self, name: &str) -> Option<&Cfg> {
        self.funcs.iter().rev().find(|(n, _)| n == name).map(|(_, cfg)| cfg)
    }
}

/// Build a graph for a lone block with a fresh counter
pub fn build(block: &[Expr]) -> Cfg {
    Cfg::from_block(block, &mut LabelCounter::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn graph(source: &str) -> Cfg {
        let program = parse_source("test.sl", source).expect("parse");
        build(&program.body)
    }

    #[test]
    fn test_empty_block() {
        let cfg = graph("");
        assert_eq!(cfg.labels(), vec![1]);
        assert_eq!(cfg.exits(), &[1]);
        assert_eq!(cfg.node(1).kind, NodeKind::Sentinel);
        assert!(cfg.node(1).expr.is_none());
    }

    #[test]
    fn test_straight_line() {
        let cfg = graph(r#"a = "1"; b = a; b"#);
        assert_eq!(cfg.labels(), vec![1, 2, 3, 4]);
        assert_eq!(cfg.node(1).succ_not_taken, Some(2));
        assert_eq!(cfg.node(2).succ_not_taken, Some(3));
        assert_eq!(cfg.node(3).succ_not_taken, Some(4));
        assert_eq!(cfg.node(4).succ_not_taken, None);
        assert_eq!(cfg.node(3).preds_not_taken, vec![2]);
        assert_eq!(cfg.exits(), &[4]);
    }

    #[test]
    fn test_if_else_edges() {
        // 2: cond, 3: then, 4: else, 5: after
        let cfg = graph(r#"if (c) { "t" } else { "e" }; "after""#);
        let head = cfg.node(2);
        assert_eq!(head.kind, NodeKind::If);
        assert_eq!(head.succ_taken, Some(3));
        assert_eq!(head.succ_not_taken, Some(4));
        assert_eq!(cfg.node(3).succ_not_taken, Some(5));
        assert_eq!(cfg.node(4).succ_not_taken, Some(5));
        assert_eq!(cfg.node(5).preds_not_taken, vec![4, 3]);
        assert_eq!(cfg.node(3).preds_taken, vec![2]);
        assert_eq!(cfg.node(4).preds_not_taken, vec![2]);
    }

    #[test]
    fn test_if_with_empty_then_keeps_taken_edge() {
        let cfg = graph(r#"if (c) { } else { "e" }; "after""#);
        let head = cfg.node(2);
        assert_eq!(head.succ_taken, Some(4));
        assert_eq!(head.succ_not_taken, Some(3));
        assert_eq!(cfg.node(4).preds_taken, vec![2]);
        assert_eq!(cfg.node(4).preds_not_taken, vec![3]);
    }

    #[test]
    fn test_trailing_if_exits() {
        let cfg = graph(r#"if (c) { "t" } else { "e" }"#);
        assert_eq!(cfg.exits(), &[3, 4]);

        let cfg = graph(r#"if (c) { } else { }"#);
        assert_eq!(cfg.exits(), &[2]);
    }

    #[test]
    fn test_while_edges() {
        // 2: cond, 3..4: body, 5: after
        let cfg = graph(r#"while (c) { a = "1"; b = a }; "after""#);
        let head = cfg.node(2);
        assert_eq!(head.kind, NodeKind::While);
        assert_eq!(head.succ_taken, Some(3));
        assert_eq!(head.succ_not_taken, Some(5));
        assert_eq!(cfg.node(4).succ_not_taken, Some(2));
        assert_eq!(head.preds_not_taken, vec![1, 4]);
        assert_eq!(cfg.exits(), &[5]);
    }

    #[test]
    fn test_empty_while_is_self_loop() {
        let cfg = graph(r#"while (c) { }"#);
        assert_eq!(cfg.node(2).succ_taken, Some(2));
        assert_eq!(cfg.node(2).preds_taken, vec![2]);
        assert_eq!(cfg.exits(), &[2]);
    }

    #[test]
    fn test_trailing_loop_body_tail_is_exit() {
        // 2: cond, 3..4: body
        let mut cfg = graph(r#"while (c) { a = "1"; b = a }"#);
        assert_eq!(cfg.exits(), &[2, 4]);
        assert_eq!(cfg.remove(4), Err(CfgError::Exit(4)));
    }

    #[test]
    fn test_trailing_loop_tails_through_nesting() {
        // 2: outer cond, 3: if, 4: inner cond, 5: inner body, 6: else arm
        let cfg = graph(r#"while (c) { if (d) { while (e) { "w" } } else { "x" } }"#);
        let mut exits = cfg.exits().to_vec();
        exits.sort_unstable();
        assert_eq!(exits, vec![2, 4, 5, 6]);

        let cfg = graph(r#"while (c) { "w" }; "after""#);
        assert_eq!(cfg.exits(), &[4]);
    }

    #[test]
    fn test_program_labels_are_global() {
        let program =
            parse_source("t", r#"fun f(x) { x } fun g() { "g"; "h" } f("1")"#).unwrap();
        let graphs = ProgramCfg::build(&program);
        assert_eq!(graphs.body.labels(), vec![1, 2]);
        assert_eq!(graphs.func("f").unwrap().labels(), vec![3, 4]);
        assert_eq!(graphs.func("g").unwrap().labels(), vec![5, 6, 7]);
        assert!(graphs.func("h").is_none());
    }

    #[test]
    fn test_remove_plain_node() {
        let mut cfg = graph(r#"a = "1"; b = "2"; b"#);
        cfg.remove(2).unwrap();
        assert_eq!(cfg.node(1).succ_not_taken, Some(3));
        assert_eq!(cfg.node(3).preds_not_taken, vec![1]);
        assert!(cfg.get(2).is_none());
        assert_eq!(cfg.labels(), vec![1, 3, 4]);
    }

    #[test]
    fn test_remove_in_branch_keeps_edge_kind() {
        let mut cfg = graph(r#"if (c) { x = "1" } else { y = "2" }; "after""#);
        cfg.remove(3).unwrap();
        assert_eq!(cfg.node(2).succ_taken, Some(5));
        let after = cfg.node(5);
        assert_eq!(after.preds_taken, vec![2]);
        assert_eq!(after.preds_not_taken, vec![4]);
    }

    #[test]
    fn test_remove_degenerate_if() {
        let mut cfg = graph(r#"x = "1"; if (x) { } else { }; x"#);
        assert!(cfg.node(3).is_degenerate_if());
        cfg.remove(3).unwrap();
        assert_eq!(cfg.node(2).succ_not_taken, Some(4));
        assert_eq!(cfg.node(4).preds_not_taken, vec![2]);
        assert!(cfg.node(4).preds_taken.is_empty());
    }

    #[test]
    fn test_remove_last_body_node_closes_loop() {
        let mut cfg = graph(r#"while (c) { x = "1" }; "end""#);
        cfg.remove(3).unwrap();
        let head = cfg.node(2);
        assert_eq!(head.succ_taken, Some(2));
        assert_eq!(head.preds_taken, vec![2]);
        assert_eq!(head.preds_not_taken, vec![1]);
    }

    #[test]
    fn test_remove_refusals() {
        let mut cfg = graph(r#"while (c) { "x" }; if (d) { "a" } else { "b" }"#);
        assert_eq!(cfg.remove(1), Err(CfgError::Sentinel(1)));
        assert_eq!(cfg.remove(2), Err(CfgError::LoopHead(2)));
        assert_eq!(cfg.remove(4), Err(CfgError::Branching(4)));
        assert_eq!(cfg.remove(5), Err(CfgError::Exit(5)));
        assert_eq!(cfg.remove(99), Err(CfgError::UnknownLabel(99)));
        cfg.remove(3).unwrap();
        assert_eq!(cfg.remove(3), Err(CfgError::UnknownLabel(3)));
    }
}
