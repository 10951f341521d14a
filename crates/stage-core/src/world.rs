//! World-space transform resolution.
//!
//! World matrices are not cached: the parent chain is short and walked on
//! demand, so every query reflects the latest local edits.

use crate::model::SceneGraph;
use crate::transform::Transform;
use glam::{Mat4, Quat, Vec3};
use petgraph::graph::NodeIndex;

impl SceneGraph {
    /// Local matrix of one node, pivot offset included.
    pub fn local_matrix(&self, idx: NodeIndex) -> Mat4 {
        self.node(idx)
            .map(|n| n.local.matrix_about(n.kind.pivot_offset()))
            .unwrap_or(Mat4::IDENTITY)
    }

    /// Product of local matrices from the top level down to `idx`.
    pub fn world_matrix(&self, idx: NodeIndex) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        let mut cursor = Some(idx);
        while let Some(current) = cursor {
            if current == self.root {
                break;
            }
            m = self.local_matrix(current) * m;
            cursor = self.raw_parent(current);
        }
        m
    }

    /// World matrix of the parent, identity for top-level nodes.
    pub fn parent_world_matrix(&self, idx: NodeIndex) -> Mat4 {
        self.parent(idx)
            .map(|p| self.world_matrix(p))
            .unwrap_or(Mat4::IDENTITY)
    }

    /// Decomposed world transform (pivot not applied).
    pub fn world_transform(&self, idx: NodeIndex) -> Transform {
        let (pivot, hint) = self
            .node(idx)
            .map(|n| (n.kind.pivot_offset(), n.local.rotation))
            .unwrap_or((Vec3::ZERO, Quat::IDENTITY));
        Transform::from_matrix_about_hinted(self.world_matrix(idx), pivot, hint)
    }

    /// World-space point the node rotates and scales about.
    pub fn pivot_point(&self, idx: NodeIndex) -> Vec3 {
        let pivot = self.node(idx).map(|n| n.kind.pivot_offset()).unwrap_or(Vec3::ZERO);
        self.world_matrix(idx).transform_point3(pivot)
    }

    /// World-space origin of a node.
    pub fn world_position(&self, idx: NodeIndex) -> Vec3 {
        self.world_transform(idx).translation
    }

    /// Pose `idx` so its world matrix equals `world`, keeping its parent.
    ///
    /// Left untouched when the parent chain has collapsed to a singular
    /// matrix, since no local pose reaches `world` then.
    pub fn set_world_matrix(&mut self, idx: NodeIndex, world: Mat4) {
        let local = self.parent_world_matrix(idx).inverse() * world;
        if !local.is_finite() {
            log::debug!("{idx:?} has a singular parent chain, pose kept");
            return;
        }
        if let Some(node) = self.node_mut(idx) {
            node.local = Transform::from_matrix_about_hinted(local, node.kind.pivot_offset(), node.local.rotation);
        }
    }

    /// Arithmetic mean of world positions. `None` for an empty slice.
    pub fn centroid(&self, nodes: &[NodeIndex]) -> Option<Vec3> {
        if nodes.is_empty() {
            return None;
        }
        let sum: Vec3 = nodes.iter().map(|n| self.world_position(*n)).sum();
        Some(sum / nodes.len() as f32)
    }

    /// Push a proxy's world pose and parent into its light record.
    pub fn sync_light(&mut self, proxy: NodeIndex) {
        let Some(light_id) = self.node(proxy).and_then(|n| n.light()) else {
            return;
        };
        let world = self.world_transform(proxy);
        let parent = self.parent(proxy);
        if let Some(light) = self.lights.get_mut(&light_id) {
            light.position = world.translation;
            light.world_direction = world.rotation * light.direction;
            light.parent = parent;
        }
    }

    /// Sync every light proxy at or below `idx`.
    pub fn sync_lights_under(&mut self, idx: NodeIndex) {
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            self.sync_light(current);
            stack.extend(self.raw_children(current));
        }
    }

    /// Sync every light in the document.
    pub fn sync_all_lights(&mut self) {
        let proxies: Vec<NodeIndex> = self.lights.values().map(|l| l.proxy).collect();
        for proxy in proxies {
            self.sync_light(proxy);
        }
    }
}
