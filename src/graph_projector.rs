//! C7 — trace-to-graph projector: turns the linear trace into a
//! node/edge model for downstream rendering (spec §4.7). Side-effect
//! free; consumes the trace independently of C5.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::TraceLine;

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*) \(IČO (\d{8})\)$").expect("valid regex"))
}

fn company_owner_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*) — (.*) \(IČO (\d{8})\)$").expect("valid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    CompanyBox,
    PersonEllipse,
    /// Structural grouping only; suppressed at render time.
    LabelGroup,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: usize,
    pub shape: NodeShape,
    pub label: String,
    pub ico: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    fn push_node(&mut self, shape: NodeShape, label: String, ico: Option<String>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node { id, shape, label, ico });
        id
    }
}

enum Kind {
    Header { name: String, ico: String },
    LabelGroup,
    CompanyOwner { name: String, ico: String, share: String },
    PersonOwner { name: String, share: String },
    Skip,
}

fn classify(line: &TraceLine) -> Kind {
    if line.label.is_empty() {
        if line.text == "max depth exceeded" || line.text.starts_with("chyba: ") {
            return Kind::Skip;
        }
        if let Some(caps) = header_re().captures(&line.text) {
            return Kind::Header {
                name: caps[1].to_string(),
                ico: caps[2].to_string(),
            };
        }
        return Kind::Skip;
    }
    if line.text == format!("{}:", line.label) {
        return Kind::LabelGroup;
    }
    if let Some(caps) = company_owner_re().captures(&line.text) {
        return Kind::CompanyOwner {
            name: caps[1].to_string(),
            share: caps[2].to_string(),
            ico: caps[3].to_string(),
        };
    }
    let (name, share) = match line.text.split_once(" — ") {
        Some((n, rest)) => (n.to_string(), rest.split(" (").next().unwrap_or(rest).trim().to_string()),
        None => (line.text.clone(), String::new()),
    };
    Kind::PersonOwner { name, share }
}

/// Projects a resolved trace into a node/edge graph.
pub fn project(trace: &[TraceLine]) -> Graph {
    let mut graph = Graph::default();
    let mut stack: Vec<(u32, usize)> = Vec::new();
    let mut pending_company: Option<(String, usize)> = None;

    for line in trace {
        match classify(line) {
            Kind::Header { name, ico } => {
                while matches!(stack.last(), Some((hd, _)) if *hd >= line.depth) {
                    stack.pop();
                }
                let node_id = match pending_company.take() {
                    Some((pending_ico, id)) if pending_ico == ico => id,
                    _ => graph.push_node(NodeShape::CompanyBox, name, Some(ico)),
                };
                stack.push((line.depth, node_id));
            }
            Kind::LabelGroup => {
                let node_id = graph.push_node(NodeShape::LabelGroup, line.label.clone(), None);
                if let Some(&(_, parent)) = stack.last() {
                    graph.edges.push(Edge {
                        from: parent,
                        to: node_id,
                        label: String::new(),
                    });
                }
                pending_company = None;
            }
            Kind::CompanyOwner { name, ico, share } => {
                let expected_header_depth = line.depth.saturating_sub(2);
                while matches!(stack.last(), Some((hd, _)) if *hd > expected_header_depth) {
                    stack.pop();
                }
                let parent = stack.last().map(|&(_, id)| id);
                let node_id = graph.push_node(NodeShape::CompanyBox, name, Some(ico.clone()));
                if let Some(parent) = parent {
                    graph.edges.push(Edge {
                        from: parent,
                        to: node_id,
                        label: share,
                    });
                }
                pending_company = Some((ico, node_id));
            }
            Kind::PersonOwner { name, share } => {
                let expected_header_depth = line.depth.saturating_sub(2);
                while matches!(stack.last(), Some((hd, _)) if *hd > expected_header_depth) {
                    stack.pop();
                }
                let parent = stack.last().map(|&(_, id)| id);
                let node_id = graph.push_node(NodeShape::PersonEllipse, name, None);
                if let Some(parent) = parent {
                    graph.edges.push(Edge {
                        from: parent,
                        to: node_id,
                        label: share,
                    });
                }
                pending_company = None;
            }
            Kind::Skip => {
                pending_company = None;
            }
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(depth: u32, label: &str, text: &str) -> TraceLine {
        TraceLine {
            depth,
            label: label.to_string(),
            text: text.to_string(),
            effective_pct: None,
        }
    }

    #[test]
    fn single_person_owner_links_to_root() {
        let trace = vec![
            line(0, "", "Root (IČO 00000001)"),
            line(1, "Společníci", "Společníci:"),
            line(2, "Společníci", "Novák — 50.00% (efektivně 50.00%)"),
        ];
        let g = project(&trace);
        let root = g.nodes.iter().find(|n| n.label == "Root").unwrap();
        let novak = g.nodes.iter().find(|n| n.label == "Novák").unwrap();
        assert_eq!(novak.shape, NodeShape::PersonEllipse);
        let edge = g.edges.iter().find(|e| e.to == novak.id).unwrap();
        assert_eq!(edge.from, root.id);
        assert_eq!(edge.label, "50.00%");
    }

    #[test]
    fn nested_company_owner_reuses_header_node() {
        let trace = vec![
            line(0, "", "A (IČO 00000001)"),
            line(1, "Společníci", "Společníci:"),
            line(2, "Společníci", "B — 100.00% (IČO 00000002)"),
            line(3, "", "B (IČO 00000002)"),
            line(4, "Společníci", "Společníci:"),
            line(5, "Společníci", "Dvořák — 100.00% (efektivně 100.00%)"),
        ];
        let g = project(&trace);
        let b_nodes: Vec<_> = g.nodes.iter().filter(|n| n.label == "B").collect();
        assert_eq!(b_nodes.len(), 1);
        assert_eq!(g.nodes.iter().filter(|n| n.shape == NodeShape::CompanyBox).count(), 2);
    }
}
