//! Transform coordinator.
//!
//! Decides where the manipulation handle attaches and applies drag
//! gestures:
//!
//! | Selection | Handle target                                   |
//! |-----------|-------------------------------------------------|
//! | empty     | nothing                                         |
//! | one node  | the node itself                                 |
//! | ≥ 2 nodes | a pivot anchor at the centroid of world positions |
//!
//! A multi-node drag reparents every selected node under the anchor for
//! the duration of the gesture (world poses preserved), moves only the
//! anchor, then restores the recorded parents with the final world poses.

use smallvec::SmallVec;
use stage_core::{NodeIndex, NodeKind, ReparentMode, SceneGraph, Transform, TransformDelta};
use std::collections::HashSet;

/// Id base of the pivot anchor node.
pub const ANCHOR_NAME: &str = "__pivot_anchor";

/// Which component of a drag is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GizmoMode {
    #[default]
    Position,
    Rotation,
    Scale,
}

impl GizmoMode {
    /// Keep only the component this mode manipulates.
    pub fn filter(self, delta: TransformDelta) -> TransformDelta {
        match self {
            GizmoMode::Position => TransformDelta::translate(delta.translation),
            GizmoMode::Rotation => TransformDelta::rotate(delta.rotation),
            GizmoMode::Scale => TransformDelta::scaled(delta.scale),
        }
    }
}

/// Where the manipulation handle is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleTarget {
    None,
    Single(NodeIndex),
    Multi { anchor: NodeIndex },
}

#[derive(Debug, Clone)]
struct DragEntry {
    node: NodeIndex,
    parent: Option<NodeIndex>,
    sort_index: f64,
    /// Local transform before the gesture, for cancel.
    local: Transform,
}

#[derive(Debug, Clone)]
struct DragState {
    entries: SmallVec<[DragEntry; 8]>,
    /// Pose of the handle target when the gesture began.
    start: Transform,
    /// World matrix of a single dragged node when the gesture began.
    start_world: glam::Mat4,
    /// World point rotation and scale happen about.
    center: glam::Vec3,
    accumulated: TransformDelta,
}

/// Coordinates the manipulation handle with the selection.
#[derive(Debug, Default)]
pub struct TransformCoordinator {
    anchor: Option<NodeIndex>,
    selection: SmallVec<[NodeIndex; 8]>,
    mode: GizmoMode,
    /// Nodes that already have drag behaviour wired up.
    bound: HashSet<NodeIndex>,
    drag: Option<DragState>,
}

impl TransformCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> GizmoMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: GizmoMode) {
        self.mode = mode;
    }

    pub fn anchor(&self) -> Option<NodeIndex> {
        self.anchor
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_bound(&self, node: NodeIndex) -> bool {
        self.bound.contains(&node)
    }

    pub fn target(&self) -> HandleTarget {
        match (self.selection.as_slice(), self.anchor) {
            ([], _) => HandleTarget::None,
            ([single], _) => HandleTarget::Single(*single),
            (_, Some(anchor)) => HandleTarget::Multi { anchor },
            (_, None) => HandleTarget::None,
        }
    }

    /// Node the handle is attached to.
    pub fn handle(&self) -> Option<NodeIndex> {
        match self.target() {
            HandleTarget::None => None,
            HandleTarget::Single(node) => Some(node),
            HandleTarget::Multi { anchor } => Some(anchor),
        }
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// React to a new selection. An active drag is finished first.
    pub fn on_selection_changed(&mut self, graph: &mut SceneGraph, selection: &[NodeIndex]) {
        if self.drag.is_some() {
            self.drag_end(graph);
        }
        self.selection = selection.iter().copied().filter(|n| graph.contains(*n)).collect();
        for node in &self.selection {
            if self.bound.insert(*node) {
                log::trace!("bound drag behaviour to {node:?}");
            }
        }
        if self.selection.len() >= 2 {
            self.place_anchor(graph);
        } else {
            self.drop_anchor(graph);
        }
    }

    /// Reposition the anchor after edits outside a drag.
    pub fn refresh(&mut self, graph: &mut SceneGraph) {
        if self.drag.is_none() && self.selection.len() >= 2 {
            self.place_anchor(graph);
        }
    }

    /// Forget everything, removing the anchor. Used on load and new document.
    pub fn reset(&mut self, graph: &mut SceneGraph) {
        self.drag = None;
        self.selection.clear();
        self.bound.clear();
        self.drop_anchor(graph);
    }

    /// Drop bindings for removed nodes.
    pub fn forget(&mut self, nodes: &[NodeIndex]) {
        for node in nodes {
            self.bound.remove(node);
        }
        self.selection.retain(|n| !nodes.contains(n));
    }

    /// Create or move the anchor to the selection centroid with identity
    /// rotation and unit scale.
    fn place_anchor(&mut self, graph: &mut SceneGraph) {
        let Some(center) = graph.centroid(&self.selection) else {
            return;
        };
        let pose = Transform::from_translation(center);
        match self.anchor.filter(|a| graph.contains(*a)) {
            Some(anchor) => {
                if let Some(node) = graph.node_mut(anchor) {
                    node.local = pose;
                }
            }
            None => {
                let anchor = graph.add_node(None, ANCHOR_NAME, NodeKind::PivotAnchor, pose);
                log::debug!("pivot anchor created at {center}");
                self.anchor = Some(anchor);
            }
        }
    }

    fn drop_anchor(&mut self, graph: &mut SceneGraph) {
        if let Some(anchor) = self.anchor.take()
            && graph.contains(anchor)
            && let Err(err) = graph.remove_internal_node(anchor)
        {
            log::warn!("could not remove pivot anchor: {err}");
        }
    }

    // ─── Drag protocol ───────────────────────────────────────────────────

    /// Begin a gesture. Returns `false` when nothing is attached.
    pub fn drag_start(&mut self, graph: &mut SceneGraph) -> bool {
        if self.drag.is_some() {
            return true;
        }
        let target = self.target();
        let entries: SmallVec<[DragEntry; 8]> = self
            .selection
            .iter()
            .filter_map(|node| {
                let n = graph.node(*node)?;
                Some(DragEntry {
                    node: *node,
                    parent: graph.parent(*node),
                    sort_index: n.sort_index,
                    local: n.local,
                })
            })
            .collect();

        let (start, start_world, center) = match target {
            HandleTarget::None => return false,
            HandleTarget::Single(node) => (
                graph.world_transform(node),
                graph.world_matrix(node),
                graph.pivot_point(node),
            ),
            HandleTarget::Multi { anchor } => {
                self.place_anchor(graph);
                for entry in &entries {
                    if let Err(err) = graph.attach_to_anchor(entry.node, anchor) {
                        log::warn!("drag start: {err}");
                    }
                }
                let start = graph.world_transform(anchor);
                (start, graph.world_matrix(anchor), start.translation)
            }
        };

        self.drag = Some(DragState {
            entries,
            start,
            start_world,
            center,
            accumulated: TransformDelta::IDENTITY,
        });
        true
    }

    /// Apply one step of the gesture, filtered by the active mode.
    pub fn drag_delta(&mut self, graph: &mut SceneGraph, delta: TransformDelta) {
        let target = self.target();
        let mode = self.mode;
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        drag.accumulated = drag.accumulated.then(mode.filter(delta));

        match target {
            HandleTarget::None => {}
            HandleTarget::Single(node) => {
                let world = drag.accumulated.matrix_about(drag.center) * drag.start_world;
                graph.set_world_matrix(node, world);
                graph.sync_lights_under(node);
            }
            HandleTarget::Multi { anchor } => {
                let pose = drag.accumulated.apply(&drag.start);
                if let Some(node) = graph.node_mut(anchor) {
                    node.local = pose;
                }
                graph.sync_lights_under(anchor);
            }
        }
    }

    /// Finish the gesture. Returns whether anything moved.
    pub fn drag_end(&mut self, graph: &mut SceneGraph) -> bool {
        let Some(drag) = self.drag.take() else {
            return false;
        };
        if matches!(self.target(), HandleTarget::Multi { .. }) {
            self.restore_parents(graph, &drag.entries);
            self.place_anchor(graph);
        }
        !drag.accumulated.is_identity()
    }

    /// Abort the gesture: every node returns to its pre-drag pose and parent.
    pub fn drag_cancel(&mut self, graph: &mut SceneGraph) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        if matches!(self.target(), HandleTarget::Multi { .. }) {
            self.restore_parents(graph, &drag.entries);
        }
        for entry in &drag.entries {
            if let Some(node) = graph.node_mut(entry.node) {
                node.local = entry.local;
            }
            graph.sync_lights_under(entry.node);
        }
        self.refresh(graph);
        log::debug!("drag cancelled");
    }

    fn restore_parents(&self, graph: &mut SceneGraph, entries: &[DragEntry]) {
        for entry in entries {
            if !graph.contains(entry.node) {
                continue;
            }
            let parent = entry.parent.filter(|p| graph.contains(*p));
            if entry.parent.is_some() && parent.is_none() {
                log::warn!("drag end: original parent of {:?} is gone, moved to top level", entry.node);
            }
            match graph.reparent(entry.node, parent, ReparentMode::PreserveWorld) {
                Ok(()) if parent == entry.parent => graph.graph[entry.node].sort_index = entry.sort_index,
                Ok(()) => {}
                Err(err) => log::warn!("drag end: could not restore parent: {err}"),
            }
        }
    }
}
