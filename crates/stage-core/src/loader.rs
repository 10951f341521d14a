//! Loader: SavedDocument → SceneGraph.
//!
//! Nodes are rebuilt in dependency order (transform nodes, lights, meshes)
//! through the identity registry. Declared ids that collide with live ones
//! get suffixed, so `parentId`s are resolved through a declared → assigned
//! map before falling back to a direct lookup. Unresolvable parents are
//! reported and the node stays at the top level.

use crate::error::LoadError;
use crate::format::*;
use crate::hierarchy::ReparentMode;
use crate::id::NodeId;
use crate::model::*;
use crate::transform::Transform;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

/// Non-fatal outcome of a load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Nodes created, in creation order.
    pub created: Vec<NodeIndex>,
    /// Declared ids that had to be changed, with the id actually applied.
    pub renamed: Vec<(String, NodeId)>,
    /// `(node, declared parent)` pairs whose parent could not be found.
    pub unresolved_parents: Vec<(NodeId, String)>,
    /// `(node, declared parent)` pairs whose reparent was rejected.
    pub rejected_parents: Vec<(NodeId, String)>,
    /// Light handles dropped by the clear that preceded the load.
    pub disposed_lights: Vec<LightId>,
}

impl LoadReport {
    /// Did every `parentId` resolve?
    pub fn is_clean(&self) -> bool {
        self.unresolved_parents.is_empty() && self.rejected_parents.is_empty()
    }
}

/// Replace the user content of `graph` with `doc`.
///
/// The version is checked before anything is cleared, so a rejected
/// document leaves the live graph untouched.
pub fn load_document(graph: &mut SceneGraph, doc: &SavedDocument) -> Result<LoadReport, LoadError> {
    if doc.version > FORMAT_VERSION {
        return Err(LoadError::UnsupportedVersion {
            found: doc.version,
            supported: FORMAT_VERSION,
        });
    }

    let mut report = LoadReport {
        disposed_lights: graph.clear_user_content(),
        ..LoadReport::default()
    };

    for record in &doc.materials {
        // Materials have no parent chain; ids are copied verbatim.
        graph.materials.push(Material {
            id: record.id.clone(),
            albedo: record.albedo.into(),
            emissive: record.emissive.into(),
            metallic: record.metallic,
            roughness: record.roughness,
            alpha: record.alpha,
        });
    }

    let mut mapping: HashMap<&str, NodeIndex> = HashMap::new();
    let mut pending: Vec<(NodeIndex, &NodeRecord)> = Vec::with_capacity(doc.node_count());

    for record in &doc.transform_nodes {
        let idx = graph.add_node(None, &record.node.id, NodeKind::TransformNode, local_of(&record.node));
        register(graph, &mut report, &mut mapping, &mut pending, idx, &record.node);
    }

    for record in &doc.lights {
        let idx = graph.add_light(None, &record.node.id, record.kind, local_of(&record.node));
        if let Some(light) = graph.graph[idx].light().and_then(|l| graph.lights.get_mut(&l)) {
            light.intensity = record.intensity;
            light.color = record.color.into();
            light.direction = record.direction.into();
        }
        register(graph, &mut report, &mut mapping, &mut pending, idx, &record.node);
    }

    for record in &doc.meshes {
        let kind = NodeKind::Primitive {
            shape: record.shape,
            material: record.material.clone(),
            pivot_offset: record.pivot.into(),
        };
        let idx = graph.add_node(None, &record.node.id, kind, local_of(&record.node));
        graph.graph[idx].flags.casts_shadow = record.cast_shadows;
        graph.graph[idx].flags.receives_shadow = record.receive_shadows;
        register(graph, &mut report, &mut mapping, &mut pending, idx, &record.node);
    }

    // Second pass: parents.
    for (idx, record) in &pending {
        let Some(declared) = record.parent_id.as_deref() else {
            continue;
        };
        let id = graph.graph[*idx].id;
        let parent = mapping.get(declared).copied().or_else(|| {
            graph
                .find(declared)
                .filter(|p| !graph.is_internal(*p))
        });
        let Some(parent) = parent else {
            log::warn!("load: parent `{declared}` of `{id}` not found, kept at top level");
            report.unresolved_parents.push((id, declared.to_string()));
            continue;
        };
        if let Err(err) = graph.reparent(*idx, Some(parent), ReparentMode::KeepLocal) {
            log::warn!("load: {err}");
            report.rejected_parents.push((id, declared.to_string()));
        }
    }

    // Reparenting appends; restore the stored order afterwards.
    for (idx, record) in &pending {
        graph.graph[*idx].sort_index = record.sort_index;
    }
    graph.sync_all_lights();

    log::debug!(
        "loaded {} node(s), {} material(s), {} renamed",
        report.created.len(),
        graph.materials.len(),
        report.renamed.len()
    );
    Ok(report)
}

/// Parse snapshot text without touching any document.
pub fn parse_snapshot(text: &str) -> Result<SavedDocument, LoadError> {
    Ok(SavedDocument::from_json(text)?)
}

/// Parse `text` and load it. Parsing happens before the clear.
pub fn load_snapshot(graph: &mut SceneGraph, text: &str) -> Result<LoadReport, LoadError> {
    let doc = parse_snapshot(text)?;
    load_document(graph, &doc)
}

fn local_of(record: &NodeRecord) -> Transform {
    Transform {
        translation: record.position.into(),
        rotation: record.rotation.into(),
        scale: record.scaling.into(),
    }
}

fn register<'a>(
    graph: &SceneGraph,
    report: &mut LoadReport,
    mapping: &mut HashMap<&'a str, NodeIndex>,
    pending: &mut Vec<(NodeIndex, &'a NodeRecord)>,
    idx: NodeIndex,
    record: &'a NodeRecord,
) {
    let assigned = graph.graph[idx].id;
    if assigned.as_str() != record.id {
        log::debug!("load: id `{}` taken, assigned `{assigned}`", record.id);
        report.renamed.push((record.id.clone(), assigned));
    }
    // First declaration owns the mapping.
    mapping.entry(record.id.as_str()).or_insert(idx);
    pending.push((idx, record));
    report.created.push(idx);
}
