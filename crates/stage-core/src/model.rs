//! Core scene-graph data model.
//!
//! The document is a tree stored in a `StableDiGraph`: nodes are placeable
//! objects, edges go parent → child. A hidden root sentinel parents every
//! top-level node, so "no parent" is spelled `parent(idx) == None` at the
//! API but is always a real edge in storage.
//!
//! Lights and materials live beside the graph. A light is reachable only
//! through its `LightProxy` node; the two share parentage and position.

use crate::id::{IdentityRegistry, NodeId};
use crate::transform::Transform;
use glam::Vec3;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default gap between consecutive sibling sort indices.
pub const SIBLING_SPACING: f64 = 100.0;

/// Id of the hidden root sentinel.
pub const ROOT_ID: &str = "__root";

// ─── Kinds ───────────────────────────────────────────────────────────────

/// Renderable primitive shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveShape {
    Cube,
    Sphere,
    Cylinder,
    Plane,
    Cone,
    Pyramid,
}

impl PrimitiveShape {
    pub const ALL: [PrimitiveShape; 6] = [
        PrimitiveShape::Cube,
        PrimitiveShape::Sphere,
        PrimitiveShape::Cylinder,
        PrimitiveShape::Plane,
        PrimitiveShape::Cone,
        PrimitiveShape::Pyramid,
    ];

    /// Display name, also the base name for new ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveShape::Cube => "Cube",
            PrimitiveShape::Sphere => "Sphere",
            PrimitiveShape::Cylinder => "Cylinder",
            PrimitiveShape::Plane => "Plane",
            PrimitiveShape::Cone => "Cone",
            PrimitiveShape::Pyramid => "Pyramid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightKind {
    Point,
    Directional,
}

impl LightKind {
    pub fn base_name(&self) -> &'static str {
        match self {
            LightKind::Point => "PointLight",
            LightKind::Directional => "DirectionalLight",
        }
    }
}

/// Handle of a light record. Never persisted; proxies are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LightId(u32);

impl fmt::Display for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "light#{}", self.0)
    }
}

/// What a node is. Each variant carries only the fields relevant to it.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Hidden parent of all top-level nodes.
    Root,

    /// Renderable shape.
    Primitive {
        shape: PrimitiveShape,
        /// Material id, if one is assigned.
        material: Option<String>,
        /// Rotation/scale pivot, relative to the node origin.
        pivot_offset: Vec3,
    },

    /// Graph stand-in for a light record.
    LightProxy { light: LightId },

    /// Pure grouping node ("empty").
    TransformNode,

    /// Temporary parent for a multi-object drag. Never persisted or selected.
    PivotAnchor,
}

impl NodeKind {
    pub fn primitive(shape: PrimitiveShape) -> Self {
        NodeKind::Primitive {
            shape,
            material: None,
            pivot_offset: Vec3::ZERO,
        }
    }

    pub fn pivot_offset(&self) -> Vec3 {
        match self {
            NodeKind::Primitive { pivot_offset, .. } => *pivot_offset,
            _ => Vec3::ZERO,
        }
    }
}

/// Per-node boolean flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeFlags {
    /// Host-owned helper node: hidden from the tree, skipped by the
    /// serializer, kept across loads.
    pub internal: bool,
    pub casts_shadow: bool,
    pub receives_shadow: bool,
}

/// A single node in the scene graph.
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Unique id; also the display name.
    pub id: NodeId,
    pub kind: NodeKind,
    /// Transform relative to the parent.
    pub local: Transform,
    /// Ordering key among siblings. Need not be contiguous.
    pub sort_index: f64,
    pub flags: NodeFlags,
}

impl SceneNode {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            local: Transform::IDENTITY,
            sort_index: 0.0,
            flags: NodeFlags::default(),
        }
    }

    /// Classification predicate for nodes that never reach the tree view,
    /// the selection, or a saved document.
    pub fn is_internal(&self) -> bool {
        self.flags.internal || matches!(self.kind, NodeKind::Root | NodeKind::PivotAnchor)
    }

    pub fn light(&self) -> Option<LightId> {
        match self.kind {
            NodeKind::LightProxy { light } => Some(light),
            _ => None,
        }
    }
}

// ─── Lights & materials ──────────────────────────────────────────────────

/// Light record paired 1:1 with a `LightProxy` node.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub intensity: f32,
    pub color: Vec3,
    /// Aim of a directional light in the proxy's frame. This is the value
    /// that is edited and persisted.
    pub direction: Vec3,
    /// `direction` turned by the proxy's world rotation, mirrored on sync.
    pub world_direction: Vec3,
    /// World position, mirrored from the proxy.
    pub position: Vec3,
    /// Mirrors the proxy's parent.
    pub parent: Option<NodeIndex>,
    /// The proxy node carrying this light.
    pub proxy: NodeIndex,
}

impl Light {
    fn new(kind: LightKind, proxy: NodeIndex) -> Self {
        let direction = match kind {
            LightKind::Point => Vec3::ZERO,
            LightKind::Directional => Vec3::new(0.0, -1.0, 0.5),
        };
        Self {
            kind,
            intensity: 1.0,
            color: Vec3::ONE,
            direction,
            world_direction: direction,
            position: Vec3::ZERO,
            parent: None,
            proxy,
        }
    }
}

/// User-created material. Ids are free-form and may collide.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: String,
    pub albedo: Vec3,
    pub emissive: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub alpha: f32,
}

impl Material {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            albedo: Vec3::ONE,
            emissive: Vec3::ZERO,
            metallic: 0.0,
            roughness: 0.5,
            alpha: 1.0,
        }
    }
}

// ─── Scene Graph ─────────────────────────────────────────────────────────

/// The complete document: node tree, id registry, lights and materials.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    /// The underlying directed graph (parent → child edges).
    pub graph: StableDiGraph<SceneNode, ()>,

    /// Hidden root sentinel.
    pub root: NodeIndex,

    /// Document-wide unique ids.
    pub ids: IdentityRegistry,

    /// Light records, keyed by handle.
    pub lights: BTreeMap<LightId, Light>,

    /// User materials in creation order.
    pub materials: Vec<Material>,

    /// Gap between sibling sort indices when appending or renumbering.
    pub sibling_spacing: f64,

    next_light: u32,
}

impl SceneGraph {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let mut ids = IdentityRegistry::new();
        let root = graph.add_node(SceneNode::new(NodeId::intern(ROOT_ID), NodeKind::Root));
        ids.claim(ROOT_ID, root);

        Self {
            graph,
            root,
            ids,
            lights: BTreeMap::new(),
            materials: Vec::new(),
            sibling_spacing: SIBLING_SPACING,
            next_light: 0,
        }
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    pub fn node(&self, idx: NodeIndex) -> Option<&SceneNode> {
        self.graph.node_weight(idx)
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut SceneNode> {
        self.graph.node_weight_mut(idx)
    }

    pub fn contains(&self, idx: NodeIndex) -> bool {
        self.graph.contains_node(idx)
    }

    /// Look up a node by id.
    pub fn get_by_id(&self, id: NodeId) -> Option<&SceneNode> {
        self.index_of(id).and_then(|idx| self.node(idx))
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.ids.get(id)
    }

    /// Look up by string id.
    pub fn find(&self, id: &str) -> Option<NodeIndex> {
        NodeId::lookup(id).and_then(|id| self.index_of(id))
    }

    pub fn id_of(&self, idx: NodeIndex) -> Option<NodeId> {
        self.node(idx).map(|n| n.id)
    }

    /// Parent of a node. `None` for top-level nodes and missing handles.
    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.raw_parent(idx).filter(|p| *p != self.root)
    }

    /// Storage parent, including the root sentinel.
    pub(crate) fn raw_parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph.neighbors_directed(idx, Direction::Incoming).next()
    }

    /// Storage children in no particular order, internal nodes included.
    pub(crate) fn raw_children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        children.sort_by(|a, b| self.sibling_cmp(*a, *b));
        children
    }

    pub(crate) fn sibling_cmp(&self, a: NodeIndex, b: NodeIndex) -> std::cmp::Ordering {
        let ka = self.graph[a].sort_index;
        let kb = self.graph[b].sort_index;
        ka.total_cmp(&kb).then(a.cmp(&b))
    }

    pub fn is_internal(&self, idx: NodeIndex) -> bool {
        self.node(idx).is_none_or(SceneNode::is_internal)
    }

    /// All non-internal nodes, in storage order.
    pub fn user_nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .node_indices()
            .filter(move |idx| !self.graph[*idx].is_internal())
    }

    /// Number of non-internal nodes.
    pub fn node_count(&self) -> usize {
        self.user_nodes().count()
    }

    // ─── Creation ────────────────────────────────────────────────────────

    /// Add a node under `parent` (`None` = top level) as its last child.
    ///
    /// The id is derived from `base_name` and suffixed on collision.
    pub fn add_node(
        &mut self,
        parent: Option<NodeIndex>,
        base_name: &str,
        kind: NodeKind,
        local: Transform,
    ) -> NodeIndex {
        let parent = parent.filter(|p| self.contains(*p)).unwrap_or(self.root);
        let sort_index = self.next_sort_index(parent);
        let placeholder = NodeId::intern(base_name);
        let mut node = SceneNode::new(placeholder, kind);
        node.local = local;
        node.sort_index = sort_index;

        let idx = self.graph.add_node(node);
        self.graph.add_edge(parent, idx, ());
        let id = self.ids.claim(base_name, idx);
        self.graph[idx].id = id;
        if id.as_str() != base_name {
            log::debug!("id `{base_name}` taken, assigned `{id}`");
        }
        idx
    }

    /// Add a light and its proxy node. Returns the proxy.
    pub fn add_light(
        &mut self,
        parent: Option<NodeIndex>,
        base_name: &str,
        kind: LightKind,
        local: Transform,
    ) -> NodeIndex {
        let light = LightId(self.next_light);
        self.next_light += 1;
        let proxy = self.add_node(parent, base_name, NodeKind::LightProxy { light }, local);
        let mut record = Light::new(kind, proxy);
        record.parent = self.parent(proxy);
        self.lights.insert(light, record);
        self.sync_light(proxy);
        proxy
    }

    /// Sort index one spacing past the current last child of `parent`.
    pub(crate) fn next_sort_index(&self, parent: NodeIndex) -> f64 {
        self.graph
            .neighbors_directed(parent, Direction::Outgoing)
            .filter(|c| !self.graph[*c].is_internal())
            .map(|c| self.graph[c].sort_index)
            .fold(None, |acc: Option<f64>, k| Some(acc.map_or(k, |a| a.max(k))))
            .map_or(self.sibling_spacing, |max| max + self.sibling_spacing)
    }

    // ─── Identity ────────────────────────────────────────────────────────

    /// Rename a node. Collisions are resolved by suffixing; the applied id
    /// is returned.
    pub fn rename(&mut self, idx: NodeIndex, new_name: &str) -> Option<NodeId> {
        let old = self.node(idx)?.id;
        let applied = self.ids.rename(old, new_name)?;
        self.graph[idx].id = applied;
        Some(applied)
    }

    // ─── Lights ──────────────────────────────────────────────────────────

    pub fn light(&self, id: LightId) -> Option<&Light> {
        self.lights.get(&id)
    }

    pub fn light_mut(&mut self, id: LightId) -> Option<&mut Light> {
        self.lights.get_mut(&id)
    }

    /// The light behind a proxy node.
    pub fn light_of(&self, proxy: NodeIndex) -> Option<&Light> {
        self.node(proxy)?.light().and_then(|l| self.lights.get(&l))
    }

    // ─── Materials ───────────────────────────────────────────────────────

    /// First material with this id.
    pub fn material(&self, id: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == id)
    }

    /// Update the first material with the same id, or append a new one.
    pub fn upsert_material(&mut self, material: Material) {
        match self.materials.iter_mut().find(|m| m.id == material.id) {
            Some(existing) => *existing = material,
            None => self.materials.push(material),
        }
    }

    // ─── Reset ───────────────────────────────────────────────────────────

    /// Remove every non-internal node, every light, and every material.
    ///
    /// Internal nodes (the root sentinel, pivot anchors, host helpers) stay.
    /// Returns the removed light handles so callers can release anything
    /// they registered against them.
    pub fn clear_user_content(&mut self) -> Vec<LightId> {
        let doomed: Vec<NodeIndex> = self.user_nodes().collect();
        for idx in doomed {
            // Re-attach internal children of doomed nodes to the root first.
            for child in self.raw_children(idx) {
                if self.graph[child].is_internal() {
                    if let Some(edge) = self.graph.find_edge(idx, child) {
                        self.graph.remove_edge(edge);
                    }
                    self.graph.add_edge(self.root, child, ());
                }
            }
        }
        let doomed: Vec<NodeIndex> = self.user_nodes().collect();
        for idx in doomed {
            if let Some(node) = self.graph.remove_node(idx) {
                self.ids.release(node.id);
            }
        }
        self.materials.clear();
        let lights: Vec<LightId> = self.lights.keys().copied().collect();
        self.lights.clear();
        lights
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
