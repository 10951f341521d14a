//! Saved-document schema.
//!
//! The on-disk shape is plain JSON with camelCase keys:
//!
//! ```text
//! { "version": 1, "materials": [...], "lights": [...],
//!   "transformNodes": [...], "meshes": [...] }
//! ```
//!
//! Every node record carries its declared `id` and an optional `parentId`.
//! Declared ids are hints: the loader runs them through the identity
//! registry and resolves `parentId` against what was actually assigned.

use crate::model::{LightKind, PrimitiveShape};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Current schema version written by the serializer.
pub const FORMAT_VERSION: u32 = 1;

const fn default_version() -> u32 {
    FORMAT_VERSION
}

const fn default_one() -> f32 {
    1.0
}

fn default_scaling() -> Vec3Data {
    Vec3Data { x: 1.0, y: 1.0, z: 1.0 }
}

fn default_white() -> Vec3Data {
    Vec3Data { x: 1.0, y: 1.0, z: 1.0 }
}

const fn default_roughness() -> f32 {
    0.5
}

// ─── Math records ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3Data {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Vec3Data {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vec3Data> for Vec3 {
    fn from(v: Vec3Data) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Quaternion, stored component-wise. Not normalized on write so a
/// load followed by a save reproduces the same text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuatData {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for QuatData {
    fn default() -> Self {
        Quat::IDENTITY.into()
    }
}

impl From<Quat> for QuatData {
    fn from(q: Quat) -> Self {
        Self {
            x: q.x,
            y: q.y,
            z: q.z,
            w: q.w,
        }
    }
}

impl From<QuatData> for Quat {
    fn from(q: QuatData) -> Self {
        let raw = Quat::from_xyzw(q.x, q.y, q.z, q.w);
        let len2 = raw.length_squared();
        if (len2 - 1.0).abs() <= 1e-5 {
            // Already unit length: keep the exact bits.
            raw
        } else if len2 > f32::EPSILON {
            raw.normalize()
        } else {
            Quat::IDENTITY
        }
    }
}

// ─── Records ─────────────────────────────────────────────────────────────

/// Fields shared by every node record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub position: Vec3Data,
    #[serde(default)]
    pub rotation: QuatData,
    #[serde(default = "default_scaling")]
    pub scaling: Vec3Data,
    #[serde(default)]
    pub sort_index: f64,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            position: Vec3Data::default(),
            rotation: QuatData::default(),
            scaling: default_scaling(),
            sort_index: 0.0,
        }
    }
}

/// A grouping node ("empty").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformNodeRecord {
    #[serde(flatten)]
    pub node: NodeRecord,
}

/// A renderable primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshRecord {
    #[serde(flatten)]
    pub node: NodeRecord,
    pub shape: PrimitiveShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default)]
    pub pivot: Vec3Data,
    #[serde(default)]
    pub cast_shadows: bool,
    #[serde(default)]
    pub receive_shadows: bool,
}

/// A light, saved through its proxy node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightRecord {
    #[serde(flatten)]
    pub node: NodeRecord,
    pub kind: LightKind,
    #[serde(default = "default_one")]
    pub intensity: f32,
    #[serde(default = "default_white")]
    pub color: Vec3Data,
    #[serde(default)]
    pub direction: Vec3Data,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRecord {
    pub id: String,
    #[serde(default = "default_white")]
    pub albedo: Vec3Data,
    #[serde(default)]
    pub emissive: Vec3Data,
    #[serde(default)]
    pub metallic: f32,
    #[serde(default = "default_roughness")]
    pub roughness: f32,
    #[serde(default = "default_one")]
    pub alpha: f32,
}

// ─── Document ────────────────────────────────────────────────────────────

/// The portable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub materials: Vec<MaterialRecord>,
    #[serde(default)]
    pub lights: Vec<LightRecord>,
    #[serde(default)]
    pub transform_nodes: Vec<TransformNodeRecord>,
    #[serde(default)]
    pub meshes: Vec<MeshRecord>,
}

impl Default for SavedDocument {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            materials: Vec::new(),
            lights: Vec::new(),
            transform_nodes: Vec::new(),
            meshes: Vec::new(),
        }
    }
}

impl SavedDocument {
    /// Number of node records (materials excluded).
    pub fn node_count(&self) -> usize {
        self.lights.len() + self.transform_nodes.len() + self.meshes.len()
    }

    /// All node records, in load order: transform nodes, lights, meshes.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.transform_nodes
            .iter()
            .map(|t| &t.node)
            .chain(self.lights.iter().map(|l| &l.node))
            .chain(self.meshes.iter().map(|m| &m.node))
    }

    /// Compact JSON, used for history snapshots.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Indented JSON, used for files.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
