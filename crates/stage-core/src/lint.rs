//! Lint diagnostics for scene documents.
//!
//! Reports structural issues without modifying the document. Every rule
//! checks an invariant the editing operations are meant to uphold, so a
//! clean edit history always lints clean.

use crate::id::NodeId;
use crate::model::SceneGraph;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use std::collections::{HashMap, HashSet};

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// The document is structurally broken.
    Error,
    /// Likely a mistake.
    Warning,
    /// Informational.
    Info,
}

/// A single lint diagnostic.
#[derive(Debug, Clone)]
pub struct LintDiagnostic {
    /// The node this diagnostic refers to, if any.
    pub node_id: Option<NodeId>,
    /// Human-readable message.
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "duplicate-id", "cycle").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules over the scene graph and return diagnostics.
#[must_use]
pub fn lint_document(graph: &SceneGraph) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_duplicate_ids(graph, &mut diags);
    lint_cycles(graph, &mut diags);
    lint_unpaired_lights(graph, &mut diags);
    lint_light_parents(graph, &mut diags);
    lint_sibling_ties(graph, &mut diags);
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

/// Two live nodes sharing an id, or a registry entry pointing elsewhere.
fn lint_duplicate_ids(graph: &SceneGraph, diags: &mut Vec<LintDiagnostic>) {
    let mut seen: HashMap<NodeId, NodeIndex> = HashMap::new();
    for idx in graph.graph.node_indices() {
        let id = graph.graph[idx].id;
        if let Some(first) = seen.insert(id, idx) {
            diags.push(LintDiagnostic {
                node_id: Some(id),
                message: format!("Id `{id}` is used by nodes {first:?} and {idx:?}."),
                severity: LintSeverity::Error,
                rule: "duplicate-id",
            });
        } else if graph.ids.get(id) != Some(idx) {
            diags.push(LintDiagnostic {
                node_id: Some(id),
                message: format!("Id `{id}` is not registered to its node."),
                severity: LintSeverity::Error,
                rule: "duplicate-id",
            });
        }
    }
}

/// A node that is its own ancestor.
fn lint_cycles(graph: &SceneGraph, diags: &mut Vec<LintDiagnostic>) {
    for idx in graph.graph.node_indices() {
        let mut visited = HashSet::new();
        let mut cursor = first_parent(graph, idx);
        while let Some(current) = cursor {
            if current == idx {
                let id = graph.graph[idx].id;
                diags.push(LintDiagnostic {
                    node_id: Some(id),
                    message: format!("`{id}` is its own ancestor."),
                    severity: LintSeverity::Error,
                    rule: "cycle",
                });
                break;
            }
            if !visited.insert(current) {
                break;
            }
            cursor = first_parent(graph, current);
        }
    }
}

fn first_parent(graph: &SceneGraph, idx: NodeIndex) -> Option<NodeIndex> {
    graph.graph.neighbors_directed(idx, Direction::Incoming).next()
}

/// Light records without a proxy and proxies without a light record.
fn lint_unpaired_lights(graph: &SceneGraph, diags: &mut Vec<LintDiagnostic>) {
    for idx in graph.graph.node_indices() {
        let node = &graph.graph[idx];
        if let Some(light) = node.light() {
            match graph.light(light) {
                Some(record) if record.proxy == idx => {}
                Some(_) => diags.push(LintDiagnostic {
                    node_id: Some(node.id),
                    message: format!("{light} belongs to another proxy than `{}`.", node.id),
                    severity: LintSeverity::Error,
                    rule: "unpaired-light",
                }),
                None => diags.push(LintDiagnostic {
                    node_id: Some(node.id),
                    message: format!("Light proxy `{}` has no light record.", node.id),
                    severity: LintSeverity::Error,
                    rule: "unpaired-light",
                }),
            }
        }
    }
    for (light, record) in &graph.lights {
        let paired = graph
            .node(record.proxy)
            .and_then(|n| n.light())
            .is_some_and(|l| l == *light);
        if !paired {
            diags.push(LintDiagnostic {
                node_id: None,
                message: format!("{light} has no proxy node."),
                severity: LintSeverity::Error,
                rule: "unpaired-light",
            });
        }
    }
}

/// A light whose recorded parent differs from its proxy's parent.
fn lint_light_parents(graph: &SceneGraph, diags: &mut Vec<LintDiagnostic>) {
    for record in graph.lights.values() {
        let Some(proxy) = graph.node(record.proxy) else {
            continue;
        };
        if record.parent != graph.parent(record.proxy) {
            diags.push(LintDiagnostic {
                node_id: Some(proxy.id),
                message: format!("Light of `{}` is out of sync with its proxy's parent.", proxy.id),
                severity: LintSeverity::Warning,
                rule: "light-parent-mismatch",
            });
        }
    }
}

/// Visible siblings sharing a sort index.
fn lint_sibling_ties(graph: &SceneGraph, diags: &mut Vec<LintDiagnostic>) {
    for parent in graph.graph.node_indices() {
        let children = graph.children(parent);
        for pair in children.windows(2) {
            let (a, b) = (&graph.graph[pair[0]], &graph.graph[pair[1]]);
            if a.sort_index == b.sort_index {
                diags.push(LintDiagnostic {
                    node_id: Some(b.id),
                    message: format!(
                        "`{}` and `{}` share sort index {}; order falls back to creation.",
                        a.id, b.id, a.sort_index
                    ),
                    severity: LintSeverity::Info,
                    rule: "sibling-order-tie",
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LightKind, NodeKind, PrimitiveShape};
    use crate::transform::Transform;

    fn rules(diags: &[LintDiagnostic]) -> Vec<&'static str> {
        diags.iter().map(|d| d.rule).collect()
    }

    #[test]
    fn lint_clean_document_no_diags() {
        let mut sg = SceneGraph::new();
        let group = sg.add_node(None, "Group", NodeKind::TransformNode, Transform::IDENTITY);
        sg.add_node(Some(group), "Cube", NodeKind::primitive(PrimitiveShape::Cube), Transform::IDENTITY);
        sg.add_light(Some(group), "Lamp", LightKind::Point, Transform::IDENTITY);
        assert!(lint_document(&sg).is_empty());
    }

    #[test]
    fn lint_duplicate_id() {
        let mut sg = SceneGraph::new();
        let a = sg.add_node(None, "A", NodeKind::TransformNode, Transform::IDENTITY);
        let b = sg.add_node(None, "B", NodeKind::TransformNode, Transform::IDENTITY);
        sg.graph[b].id = sg.graph[a].id;
        assert!(rules(&lint_document(&sg)).contains(&"duplicate-id"));
    }

    #[test]
    fn lint_cycle() {
        let mut sg = SceneGraph::new();
        let a = sg.add_node(None, "A", NodeKind::TransformNode, Transform::IDENTITY);
        let b = sg.add_node(Some(a), "B", NodeKind::TransformNode, Transform::IDENTITY);
        let edge = sg.graph.find_edge(sg.root, a).unwrap();
        sg.graph.remove_edge(edge);
        sg.graph.add_edge(b, a, ());
        let diags = lint_document(&sg);
        assert_eq!(rules(&diags).iter().filter(|r| **r == "cycle").count(), 2);
    }

    #[test]
    fn lint_unpaired_and_mismatched_light() {
        let mut sg = SceneGraph::new();
        let rig = sg.add_node(None, "Rig", NodeKind::TransformNode, Transform::IDENTITY);
        let lamp = sg.add_light(None, "Lamp", LightKind::Point, Transform::IDENTITY);
        let light = sg.graph[lamp].light().unwrap();
        sg.light_mut(light).unwrap().parent = Some(rig);
        assert_eq!(rules(&lint_document(&sg)), ["light-parent-mismatch"]);

        sg.lights.remove(&light);
        assert_eq!(rules(&lint_document(&sg)), ["unpaired-light"]);
    }

    #[test]
    fn lint_sibling_tie() {
        let mut sg = SceneGraph::new();
        let a = sg.add_node(None, "A", NodeKind::TransformNode, Transform::IDENTITY);
        let b = sg.add_node(None, "B", NodeKind::TransformNode, Transform::IDENTITY);
        sg.graph[b].sort_index = sg.graph[a].sort_index;
        let diags = lint_document(&sg);
        assert_eq!(rules(&diags), ["sibling-order-tie"]);
        assert_eq!(diags[0].severity, LintSeverity::Info);
    }
}
