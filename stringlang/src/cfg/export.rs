//! Graph descriptions for external viewers
//!
//! A [`GraphDescription`] is a plain labelled-node, labelled-edge view of a
//! program's graphs. It serializes to JSON through serde or renders as
//! Graphviz DOT, one cluster per function.

use super::{Cfg, Label, NodeKind, ProgramCfg};
use serde::Serialize;

/// Name of the top-level graph
pub const TOPLEVEL: &str = "toplevel";

#[derive(Debug, Clone, Serialize)]
pub struct GraphDescription {
    pub graphs: Vec<Graph>,
}

/// One block's graph
#[derive(Debug, Clone, Serialize)]
pub struct Graph {
    pub name: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: Label,
    pub label: String,
    pub kind: NodeKind,
    pub exit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub from: Label,
    pub to: Label,
    /// "True"/"False" on branch edges, absent on fall-through
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'static str>,
}

impl Graph {
    pub fn from_cfg(name: impl Into<String>, cfg: &Cfg) -> Self {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();

        for id in cfg.visit() {
            let node = cfg.node(id);
            nodes.push(GraphNode {
                id,
                label: node.text(),
                kind: node.kind,
                exit: cfg.is_exit(id),
            });
            if let Some(to) = node.succ_taken {
                edges.push(GraphEdge {
                    from: id,
                    to,
                    label: Some("True"),
                });
            }
            if let Some(to) = node.succ_not_taken {
                let label = node.succ_taken.map(|_| "False");
                edges.push(GraphEdge { from: id, to, label });
            }
        }

        Graph {
            name: name.into(),
            nodes,
            edges,
        }
    }
}

impl GraphDescription {
    pub fn from_program(graphs: &ProgramCfg) -> Self {
        let mut out = vec![Graph::from_cfg(TOPLEVEL, &graphs.body)];
        out.extend(
            graphs
                .funcs
                .iter()
                .map(|(name, cfg)| Graph::from_cfg(name.as_str(), cfg)),
        );
        GraphDescription { graphs: out }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render as Graphviz DOT. The top-level graph is drawn directly; each
    /// function gets a `cluster_<name>` subgraph.
    pub fn to_dot(&self) -> String {
        let mut out = format!("digraph {TOPLEVEL} {{\n");
        out.push_str("    node [shape=box, fontname=\"monospace\"];\n");

        for graph in &self.graphs {
            if graph.name == TOPLEVEL {
                write_graph(&mut out, graph, "    ");
            } else {
                out.push_str(&format!("    subgraph cluster_{} {{\n", graph.name));
                out.push_str(&format!("        label=\"{}\";\n", escape_dot_label(&graph.name)));
                write_graph(&mut out, graph, "        ");
                out.push_str("    }\n");
            }
        }

        out.push_str("}\n");
        out
    }
}

fn write_graph(out: &mut String, graph: &Graph, indent: &str) {
    for node in &graph.nodes {
        let style = if node.kind == NodeKind::Sentinel {
            ", style=filled, fillcolor=lightgreen"
        } else if node.exit {
            ", style=filled, fillcolor=lightcoral"
        } else {
            ""
        };
        out.push_str(&format!(
            "{indent}{} [label=\"{}\"{style}];\n",
            node.id,
            escape_dot_label(&node.label)
        ));
    }
    for edge in &graph.edges {
        match edge.label {
            Some(label) => out.push_str(&format!(
                "{indent}{} -> {} [label=\"{label}\"];\n",
                edge.from, edge.to
            )),
            None => out.push_str(&format!("{indent}{} -> {};\n", edge.from, edge.to)),
        }
    }
}

/// Escape text for a quoted DOT label. Line breaks become left-aligned
/// DOT line breaks so multi-line lambdas stay readable.
fn escape_dot_label(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "")
        .replace('\n', "\\l")
        .replace('\t', "    ")
}
