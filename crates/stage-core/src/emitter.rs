//! Emitter: SceneGraph → SavedDocument.
//!
//! Walks the tree depth-first in sibling order so equal documents always
//! produce equal text. Internal nodes are never written; nodes parented
//! under one (a pivot anchor during a drag) are written against their
//! nearest persisted ancestor with a local transform recomputed from world.

use crate::format::*;
use crate::model::*;
use crate::transform::Transform;
use glam::{Mat4, Quat, Vec3};
use petgraph::graph::NodeIndex;

/// Serialize the live document.
#[must_use]
pub fn emit_document(graph: &SceneGraph) -> SavedDocument {
    let mut doc = SavedDocument {
        materials: graph.materials.iter().map(emit_material).collect(),
        ..SavedDocument::default()
    };

    let mut stack: Vec<NodeIndex> = graph.raw_children(graph.root).into_iter().rev().collect();
    while let Some(idx) = stack.pop() {
        stack.extend(graph.raw_children(idx).into_iter().rev());
        if graph.is_internal(idx) {
            continue;
        }
        emit_node(&mut doc, graph, idx);
    }
    doc
}

/// Serialize the live document to compact JSON (a history snapshot).
pub fn emit_snapshot(graph: &SceneGraph) -> Result<String, serde_json::Error> {
    emit_document(graph).to_json()
}

fn emit_node(doc: &mut SavedDocument, graph: &SceneGraph, idx: NodeIndex) {
    let node = &graph.graph[idx];
    let parent = persisted_parent(graph, idx);
    let local = if parent == graph.parent(idx) {
        node.local
    } else {
        // Parent chain passes through an internal node.
        let parent_world = parent.map_or(Mat4::IDENTITY, |p| graph.world_matrix(p));
        Transform::from_matrix_about_hinted(
            parent_world.inverse() * graph.world_matrix(idx),
            node.kind.pivot_offset(),
            node.local.rotation,
        )
    };
    let local = finite_transform(local, node);

    let record = NodeRecord {
        id: node.id.to_string(),
        parent_id: parent.map(|p| graph.graph[p].id.to_string()),
        position: local.translation.into(),
        rotation: local.rotation.into(),
        scaling: local.scale.into(),
        sort_index: node.sort_index,
    };

    match &node.kind {
        NodeKind::Primitive {
            shape,
            material,
            pivot_offset,
        } => doc.meshes.push(MeshRecord {
            node: record,
            shape: *shape,
            material: material.clone(),
            pivot: finite_or(*pivot_offset, Vec3::ZERO).into(),
            cast_shadows: node.flags.casts_shadow,
            receive_shadows: node.flags.receives_shadow,
        }),
        NodeKind::LightProxy { light } => {
            let Some(light) = graph.light(*light) else {
                log::warn!("light proxy {} has no light record, skipped", node.id);
                return;
            };
            doc.lights.push(LightRecord {
                node: record,
                kind: light.kind,
                intensity: if light.intensity.is_finite() { light.intensity } else { 1.0 },
                color: finite_or(light.color, Vec3::ONE).into(),
                direction: finite_or(light.direction, Vec3::ZERO).into(),
            });
        }
        NodeKind::TransformNode => doc.transform_nodes.push(TransformNodeRecord { node: record }),
        NodeKind::Root | NodeKind::PivotAnchor => {}
    }
}

/// JSON has no NaN or infinity, so such components are written as their
/// identity value instead.
fn finite_transform(local: Transform, node: &SceneNode) -> Transform {
    if local.is_finite() {
        return local;
    }
    log::warn!("{} has a non-finite transform, writing identity components", node.id);
    let rotation = if local.rotation.is_finite() {
        local.rotation
    } else {
        Quat::IDENTITY
    };
    Transform {
        translation: finite_or(local.translation, Vec3::ZERO),
        rotation,
        scale: finite_or(local.scale, Vec3::ONE),
    }
}

fn finite_or(v: Vec3, fallback: Vec3) -> Vec3 {
    if v.is_finite() { v } else { fallback }
}

/// Nearest ancestor that is written to the document.
fn persisted_parent(graph: &SceneGraph, idx: NodeIndex) -> Option<NodeIndex> {
    let mut cursor = graph.parent(idx);
    while let Some(current) = cursor {
        if !graph.is_internal(current) {
            return Some(current);
        }
        cursor = graph.parent(current);
    }
    None
}

fn emit_material(material: &Material) -> MaterialRecord {
    MaterialRecord {
        id: material.id.clone(),
        albedo: material.albedo.into(),
        emissive: material.emissive.into(),
        metallic: material.metallic,
        roughness: material.roughness,
        alpha: material.alpha,
    }
}
