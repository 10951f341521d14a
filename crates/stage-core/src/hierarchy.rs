//! Structural edits on the scene graph: reparenting, sibling order,
//! subtree removal and duplication.

use crate::error::GraphError;
use crate::id::NodeId;
use crate::model::{LightId, NodeKind, SceneGraph};
use petgraph::graph::NodeIndex;
use smallvec::SmallVec;

/// How a reparent treats the moved node's local transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReparentMode {
    /// Recompute the local transform so the world pose does not change.
    PreserveWorld,
    /// Keep the local transform as stored (used by the loader).
    KeepLocal,
}

/// Where a node lands among its new siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Directly before this sibling, under the sibling's parent.
    Before(NodeIndex),
    /// Directly after this sibling, under the sibling's parent.
    After(NodeIndex),
    /// Last child of the given parent (`None` = top level).
    LastChildOf(Option<NodeIndex>),
}

/// Everything taken out of the document by [`SceneGraph::remove_subtree`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Removed {
    /// Ids of removed nodes, subtree root first.
    pub ids: Vec<NodeId>,
    pub indices: Vec<NodeIndex>,
    pub lights: SmallVec<[LightId; 4]>,
}

impl SceneGraph {
    // ─── Queries ─────────────────────────────────────────────────────────

    /// Visible children of `idx` in sibling order.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.raw_children(idx)
            .into_iter()
            .filter(|c| !self.is_internal(*c))
            .collect()
    }

    /// Visible top-level nodes in sibling order.
    pub fn roots(&self) -> Vec<NodeIndex> {
        self.children(self.root)
    }

    /// All visible descendants of `idx` in depth-first, sibling order.
    /// Internal nodes are skipped but traversed through.
    pub fn descendants(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeIndex> = self.raw_children(idx).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            if !self.is_internal(current) {
                out.push(current);
            }
            stack.extend(self.raw_children(current).into_iter().rev());
        }
        out
    }

    /// Is `ancestor` a strict ancestor of `node`?
    pub fn is_ancestor_of(&self, ancestor: NodeIndex, node: NodeIndex) -> bool {
        let mut cursor = self.raw_parent(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.raw_parent(current);
        }
        false
    }

    /// Distance from the top level (top-level nodes have depth 0).
    pub fn depth(&self, idx: NodeIndex) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent(idx);
        while let Some(current) = cursor {
            depth += 1;
            cursor = self.parent(current);
        }
        depth
    }

    // ─── Reparent ────────────────────────────────────────────────────────

    /// Move `node` under `new_parent` (`None` = top level), appended last.
    ///
    /// Rejected with [`GraphError::Cycle`] when `new_parent` is `node` or one
    /// of its descendants, and with [`GraphError::Internal`] when either end
    /// is an internal node; the graph is left untouched on any error.
    /// Reparenting to the current parent changes nothing.
    pub fn reparent(
        &mut self,
        node: NodeIndex,
        new_parent: Option<NodeIndex>,
        mode: ReparentMode,
    ) -> Result<(), GraphError> {
        let target = self.check_reparent(node, new_parent)?;
        if let Some(parent) = new_parent.and_then(|p| self.node(p))
            && parent.is_internal()
        {
            return Err(GraphError::Internal(parent.id));
        }
        self.move_under(node, target, mode);
        Ok(())
    }

    /// Hang `node` under a pivot anchor, world pose preserved. Only the
    /// transform coordinator parents user nodes under an internal node.
    pub fn attach_to_anchor(&mut self, node: NodeIndex, anchor: NodeIndex) -> Result<(), GraphError> {
        let target = self.check_reparent(node, Some(anchor))?;
        if !matches!(self.graph[target].kind, NodeKind::PivotAnchor) {
            return Err(GraphError::NotAnchor(self.graph[target].id));
        }
        self.move_under(node, target, ReparentMode::PreserveWorld);
        Ok(())
    }

    fn move_under(&mut self, node: NodeIndex, target: NodeIndex, mode: ReparentMode) {
        if self.raw_parent(node) == Some(target) {
            return;
        }

        let world = self.world_matrix(node);
        if let Some(old) = self.raw_parent(node)
            && let Some(edge) = self.graph.find_edge(old, node)
        {
            self.graph.remove_edge(edge);
        }
        let sort_index = self.next_sort_index(target);
        self.graph.add_edge(target, node, ());
        self.graph[node].sort_index = sort_index;

        if mode == ReparentMode::PreserveWorld {
            self.set_world_matrix(node, world);
        }
        self.sync_lights_under(node);
        log::trace!("reparent {} -> {}", self.graph[node].id, self.graph[target].id);
    }

    /// Validate a reparent and resolve the storage parent.
    fn check_reparent(
        &self,
        node: NodeIndex,
        new_parent: Option<NodeIndex>,
    ) -> Result<NodeIndex, GraphError> {
        let moved = self.node(node).ok_or(GraphError::Missing(node))?;
        if moved.is_internal() {
            return Err(GraphError::Internal(moved.id));
        }
        let target = match new_parent {
            Some(p) => {
                let parent = self.node(p).ok_or(GraphError::Missing(p))?;
                if p == node || self.is_ancestor_of(node, p) {
                    return Err(GraphError::Cycle {
                        node: moved.id,
                        target: parent.id,
                    });
                }
                p
            }
            None => self.root,
        };
        Ok(target)
    }

    // ─── Sibling order ───────────────────────────────────────────────────

    /// Move `node` to `placement`, reparenting world-preserving if the
    /// parent changes.
    ///
    /// Before/after placements renumber the whole sibling list to evenly
    /// spaced keys; last-child placement only rekeys the moved node.
    pub fn set_sibling_order(
        &mut self,
        node: NodeIndex,
        placement: Placement,
    ) -> Result<(), GraphError> {
        match placement {
            Placement::LastChildOf(parent) => {
                self.reparent(node, parent, ReparentMode::PreserveWorld)?;
                let storage_parent = parent.unwrap_or(self.root);
                let max = self
                    .raw_children(storage_parent)
                    .into_iter()
                    .filter(|c| *c != node)
                    .map(|c| self.graph[c].sort_index)
                    .reduce(f64::max);
                self.graph[node].sort_index = max.map_or(self.sibling_spacing, |m| m + self.sibling_spacing);
                Ok(())
            }
            Placement::Before(sibling) | Placement::After(sibling) => {
                if sibling == node {
                    return Ok(());
                }
                let sibling_node = self.node(sibling).ok_or(GraphError::Missing(sibling))?;
                if sibling_node.is_internal() {
                    return Err(GraphError::Internal(sibling_node.id));
                }
                let parent = self.parent(sibling);
                self.reparent(node, parent, ReparentMode::PreserveWorld)?;

                let storage_parent = parent.unwrap_or(self.root);
                let mut order: Vec<NodeIndex> = self
                    .children(storage_parent)
                    .into_iter()
                    .filter(|c| *c != node)
                    .collect();
                let at = order.iter().position(|c| *c == sibling).unwrap_or(order.len());
                let at = if matches!(placement, Placement::After(_)) { at + 1 } else { at };
                order.insert(at.min(order.len()), node);
                self.renumber(&order);
                Ok(())
            }
        }
    }

    /// Assign `(i + 1) * spacing` to each node in order.
    fn renumber(&mut self, order: &[NodeIndex]) {
        for (i, idx) in order.iter().enumerate() {
            self.graph[*idx].sort_index = (i + 1) as f64 * self.sibling_spacing;
        }
    }

    // ─── Delete & duplicate ──────────────────────────────────────────────

    /// Remove `idx` and every descendant, with their light records.
    ///
    /// Internal nodes found inside the subtree are re-attached to the top
    /// level rather than destroyed.
    pub fn remove_subtree(&mut self, idx: NodeIndex) -> Result<Removed, GraphError> {
        let node = self.node(idx).ok_or(GraphError::Missing(idx))?;
        if node.is_internal() {
            return Err(GraphError::Internal(node.id));
        }
        let subtree_id = node.id;

        let mut doomed = vec![idx];
        let mut rescued = Vec::new();
        let mut stack = self.raw_children(idx);
        while let Some(current) = stack.pop() {
            if self.graph[current].is_internal() {
                rescued.push(current);
                continue;
            }
            doomed.push(current);
            stack.extend(self.raw_children(current));
        }

        for helper in rescued {
            let world = self.world_matrix(helper);
            if let Some(old) = self.raw_parent(helper)
                && let Some(edge) = self.graph.find_edge(old, helper)
            {
                self.graph.remove_edge(edge);
            }
            self.graph.add_edge(self.root, helper, ());
            self.set_world_matrix(helper, world);
        }

        let mut removed = Removed::default();
        for current in doomed {
            let Some(node) = self.graph.remove_node(current) else {
                continue;
            };
            self.ids.release(node.id);
            if let Some(light) = node.light() {
                self.lights.remove(&light);
                removed.lights.push(light);
            }
            removed.ids.push(node.id);
            removed.indices.push(current);
        }
        log::debug!("removed {} node(s) under {subtree_id}", removed.ids.len());
        Ok(removed)
    }

    /// Remove a host helper node (e.g. a pivot anchor). Its children move
    /// up to its parent, keeping their world poses.
    pub fn remove_internal_node(&mut self, idx: NodeIndex) -> Result<(), GraphError> {
        let node = self.node(idx).ok_or(GraphError::Missing(idx))?;
        if idx == self.root || !node.is_internal() {
            return Err(GraphError::Internal(node.id));
        }
        let parent = self.raw_parent(idx).unwrap_or(self.root);
        for child in self.raw_children(idx) {
            let world = self.world_matrix(child);
            if let Some(edge) = self.graph.find_edge(idx, child) {
                self.graph.remove_edge(edge);
            }
            self.graph[child].sort_index = self.next_sort_index(parent);
            self.graph.add_edge(parent, child, ());
            self.set_world_matrix(child, world);
            self.sync_lights_under(child);
        }
        if let Some(removed) = self.graph.remove_node(idx) {
            self.ids.release(removed.id);
        }
        Ok(())
    }

    /// Deep-copy `idx` and its visible descendants as the last child of
    /// the same parent. Every copy gets a fresh id derived from its
    /// source; local transforms, flags and light settings are preserved.
    pub fn duplicate_subtree(&mut self, idx: NodeIndex) -> Result<NodeIndex, GraphError> {
        let node = self.node(idx).ok_or(GraphError::Missing(idx))?;
        if node.is_internal() {
            return Err(GraphError::Internal(node.id));
        }
        let parent = self.parent(idx);
        let copy = self.copy_node(idx, parent);

        let mut stack: Vec<(NodeIndex, NodeIndex)> = self
            .children(idx)
            .into_iter()
            .map(|c| (c, copy))
            .collect();
        stack.reverse();
        while let Some((source, new_parent)) = stack.pop() {
            let child_copy = self.copy_node(source, Some(new_parent));
            self.graph[child_copy].sort_index = self.graph[source].sort_index;
            let mut grandchildren: Vec<(NodeIndex, NodeIndex)> = self
                .children(source)
                .into_iter()
                .map(|c| (c, child_copy))
                .collect();
            grandchildren.reverse();
            stack.extend(grandchildren);
        }
        Ok(copy)
    }

    fn copy_node(&mut self, source: NodeIndex, parent: Option<NodeIndex>) -> NodeIndex {
        let original = self.graph[source].clone();
        let base = original.id.as_str().to_string();
        let copy = match original.light().and_then(|l| self.light(l).cloned()) {
            Some(light) => {
                let proxy = self.add_light(parent, &base, light.kind, original.local);
                let record = self.graph[proxy].light();
                if let Some(target) = record.and_then(|l| self.lights.get_mut(&l)) {
                    target.intensity = light.intensity;
                    target.color = light.color;
                    target.direction = light.direction;
                }
                self.sync_light(proxy);
                proxy
            }
            None => self.add_node(parent, &base, original.kind.clone(), original.local),
        };
        self.graph[copy].flags = original.flags;
        copy
    }
}
