//! Selection store.
//!
//! Holds live node handles, never ids, so a rename does not invalidate the
//! selection. Internal nodes (the root sentinel, pivot anchors) are never
//! selectable.
//!
//! Mutators return whether the selection changed. The session uses that to
//! notify subscribers in a fixed order: transform coordinator first, then
//! the property inspector, then the tree view.

use smallvec::SmallVec;
use stage_core::{NodeIndex, SceneGraph};

/// Read-only subscriber to selection changes (inspector, tree view).
pub trait SelectionObserver {
    /// Called after every selection change. `handle` is the node the
    /// manipulation handle is attached to, already updated.
    fn selection_changed(&mut self, graph: &SceneGraph, selection: &[NodeIndex], handle: Option<NodeIndex>);
}

/// Ordered set of selected nodes. Order is insertion order; the last
/// entry is the primary selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionStore {
    nodes: SmallVec<[NodeIndex; 8]>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[NodeIndex] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: NodeIndex) -> bool {
        self.nodes.contains(&node)
    }

    /// Most recently added node.
    pub fn primary(&self) -> Option<NodeIndex> {
        self.nodes.last().copied()
    }

    /// Non-additive: replace the selection with `{node}`.
    /// Additive: toggle `node`'s membership.
    pub fn select(&mut self, graph: &SceneGraph, node: NodeIndex, additive: bool) -> bool {
        if graph.is_internal(node) {
            return false;
        }
        if additive {
            match self.nodes.iter().position(|n| *n == node) {
                Some(at) => {
                    self.nodes.remove(at);
                }
                None => self.nodes.push(node),
            }
            return true;
        }
        if self.nodes.as_slice() == [node] {
            return false;
        }
        self.nodes.clear();
        self.nodes.push(node);
        true
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.nodes.is_empty();
        self.nodes.clear();
        changed
    }

    /// Bulk replace. Internal nodes and repeats are dropped.
    pub fn set_selection(&mut self, graph: &SceneGraph, nodes: &[NodeIndex]) -> bool {
        let mut next: SmallVec<[NodeIndex; 8]> = SmallVec::new();
        for node in nodes {
            if !graph.is_internal(*node) && !next.contains(node) {
                next.push(*node);
            }
        }
        if next == self.nodes {
            return false;
        }
        self.nodes = next;
        true
    }

    /// Empty the selection if any selected node no longer exists.
    pub fn prune_deleted(&mut self, graph: &SceneGraph) -> bool {
        if self.nodes.iter().all(|n| graph.contains(*n)) {
            return false;
        }
        log::debug!("selected node deleted, clearing selection");
        self.clear()
    }
}
