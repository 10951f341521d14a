//! Editor session: owns the document and every editing component, and
//! exposes the inbound event handlers a host UI calls.
//!
//! Each handler is one logical user action: it mutates the graph, pushes
//! notifications (selection subscribers, host lights and shadows) and
//! records at most one history snapshot.

use crate::commands::HistoryManager;
use crate::config::EditorConfig;
use crate::coordinator::{GizmoMode, TransformCoordinator};
use crate::host::{NullHost, SceneHost};
use crate::selection::{SelectionObserver, SelectionStore};
use crate::shortcuts::ShortcutAction;
use crate::tools::DropZone;
use glam::{Quat, Vec3};
use stage_core::{
    GraphError, LightId, LightKind, LoadError, LoadReport, Material, NodeId, NodeIndex, NodeKind,
    PersistenceError, PersistenceGateway, Placement, PrimitiveShape, SceneGraph, Transform, TransformDelta,
    emit_document, load_document, sanitize_name,
};

/// A single property edit from the inspector.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEdit {
    SetPosition(Vec3),
    SetRotation(Quat),
    /// Euler angles in degrees, YXZ order.
    SetEulerDegrees(Vec3),
    SetScale(Vec3),
    /// Primitives only.
    SetPivotOffset(Vec3),
    /// Primitives only. `None` unassigns.
    SetMaterial(Option<String>),
    SetShadowFlags { cast: bool, receive: bool },
    /// Light proxies only.
    SetLight { intensity: f32, color: Vec3, direction: Vec3 },
    /// Parent dropdown: world-preserving, placed last among new siblings.
    SetParent(Option<NodeIndex>),
}

/// The editing session.
pub struct EditorSession<G: PersistenceGateway> {
    /// The live document.
    pub graph: SceneGraph,
    selection: SelectionStore,
    coordinator: TransformCoordinator,
    history: HistoryManager,
    config: EditorConfig,
    gateway: G,
    host: Box<dyn SceneHost>,
    inspector: Option<Box<dyn SelectionObserver>>,
    tree: Option<Box<dyn SelectionObserver>>,
    current_name: Option<String>,
    modified: bool,
}

impl<G: PersistenceGateway> EditorSession<G> {
    pub fn new(gateway: G, config: EditorConfig) -> Self {
        let mut graph = SceneGraph::new();
        graph.sibling_spacing = config.sibling_spacing;
        let mut history = HistoryManager::new(config.history_capacity);
        history.reset(&graph);
        Self {
            graph,
            selection: SelectionStore::new(),
            coordinator: TransformCoordinator::new(),
            history,
            config,
            gateway,
            host: Box::new(NullHost),
            inspector: None,
            tree: None,
            current_name: None,
            modified: false,
        }
    }

    pub fn with_host(mut self, host: impl SceneHost + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    /// Subscriber notified second, after the coordinator.
    pub fn set_inspector(&mut self, observer: impl SelectionObserver + 'static) {
        self.inspector = Some(Box::new(observer));
    }

    /// Subscriber notified last.
    pub fn set_tree(&mut self, observer: impl SelectionObserver + 'static) {
        self.tree = Some(Box::new(observer));
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn selection(&self) -> &[NodeIndex] {
        self.selection.as_slice()
    }

    pub fn coordinator(&self) -> &TransformCoordinator {
        &self.coordinator
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current_name.as_deref()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Window title: the document name (or `Untitled`), `*` when modified.
    pub fn title(&self) -> String {
        let name = self.current_name.as_deref().unwrap_or("Untitled");
        if self.modified {
            format!("{name}*")
        } else {
            name.to_string()
        }
    }

    pub fn mode(&self) -> GizmoMode {
        self.coordinator.mode()
    }

    pub fn set_mode(&mut self, mode: GizmoMode) {
        self.coordinator.set_mode(mode);
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Pointer pick. `None` (empty space) clears the selection, modifier
    /// or not.
    pub fn pick(&mut self, node: Option<NodeIndex>, additive: bool) -> bool {
        let changed = match node {
            Some(node) if self.graph.contains(node) => self.selection.select(&self.graph, node, additive),
            Some(_) => false,
            None => self.selection.clear(),
        };
        if changed {
            self.notify_selection();
        }
        changed
    }

    pub fn set_selection(&mut self, nodes: &[NodeIndex]) -> bool {
        let nodes: Vec<NodeIndex> = nodes.iter().copied().filter(|n| self.graph.contains(*n)).collect();
        let changed = self.selection.set_selection(&self.graph, &nodes);
        if changed {
            self.notify_selection();
        }
        changed
    }

    pub fn select_all(&mut self) -> bool {
        let all: Vec<NodeIndex> = self.graph.user_nodes().collect();
        self.set_selection(&all)
    }

    /// Coordinator first, then inspector, then tree.
    fn notify_selection(&mut self) {
        self.settle_drag();
        self.coordinator.on_selection_changed(&mut self.graph, self.selection.as_slice());
        let handle = self.coordinator.handle();
        if let Some(inspector) = self.inspector.as_mut() {
            inspector.selection_changed(&self.graph, self.selection.as_slice(), handle);
        }
        if let Some(tree) = self.tree.as_mut() {
            tree.selection_changed(&self.graph, self.selection.as_slice(), handle);
        }
    }

    // ─── Drag ────────────────────────────────────────────────────────────

    pub fn drag_start(&mut self) -> bool {
        self.coordinator.drag_start(&mut self.graph)
    }

    pub fn drag_delta(&mut self, delta: TransformDelta) {
        self.coordinator.drag_delta(&mut self.graph, delta);
    }

    /// Finish the gesture; one snapshot if anything moved.
    pub fn drag_end(&mut self) -> bool {
        if self.coordinator.drag_end(&mut self.graph) {
            self.commit("transform")
        } else {
            false
        }
    }

    /// Pointer capture lost: revert, no snapshot.
    pub fn drag_cancel(&mut self) {
        self.coordinator.drag_cancel(&mut self.graph);
    }

    fn settle_drag(&mut self) {
        if self.coordinator.is_dragging() {
            self.drag_end();
        }
    }

    // ─── Structure ───────────────────────────────────────────────────────

    /// Tree drag-and-drop. `target` is the row under the pointer (`None`
    /// for the empty area below the rows, which means top level).
    pub fn request_reparent(
        &mut self,
        node: NodeIndex,
        target: Option<NodeIndex>,
        zone: DropZone,
    ) -> Result<(), GraphError> {
        self.settle_drag();
        let placement = match (zone, target) {
            (DropZone::Inside, target) => Placement::LastChildOf(target),
            (DropZone::Before, Some(target)) => Placement::Before(target),
            (DropZone::After, Some(target)) => Placement::After(target),
            (_, None) => Placement::LastChildOf(None),
        };
        if let Err(err) = self.graph.set_sibling_order(node, placement) {
            log::warn!("reparent rejected: {err}");
            return Err(err);
        }
        self.commit("reparent");
        Ok(())
    }

    /// Rename a node; returns the id actually applied. Blank names leave
    /// the node unchanged.
    pub fn request_rename(&mut self, node: NodeIndex, new_name: &str) -> Result<NodeId, GraphError> {
        let current = self.graph.node(node).ok_or(GraphError::Missing(node))?;
        if current.is_internal() {
            return Err(GraphError::Internal(current.id));
        }
        let current = current.id;
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Ok(current);
        }
        self.settle_drag();
        let applied = self.graph.rename(node, new_name).ok_or(GraphError::Missing(node))?;
        self.commit("rename");
        Ok(applied)
    }

    /// Duplicate each top-most node of `nodes` with its subtree. The copies
    /// become the selection.
    pub fn request_duplicate(&mut self, nodes: &[NodeIndex]) -> Vec<NodeIndex> {
        self.settle_drag();
        let mut copies = Vec::new();
        for node in self.top_most(nodes) {
            match self.graph.duplicate_subtree(node) {
                Ok(copy) => {
                    self.announce_subtree(copy);
                    copies.push(copy);
                }
                Err(err) => log::warn!("duplicate skipped: {err}"),
            }
        }
        if copies.is_empty() {
            return copies;
        }
        if self.selection.set_selection(&self.graph, &copies) {
            self.notify_selection();
        }
        self.commit("duplicate");
        copies
    }

    /// Delete each top-most node of `nodes` with its subtree. Returns how
    /// many nodes were removed.
    pub fn request_delete(&mut self, nodes: &[NodeIndex]) -> usize {
        self.settle_drag();
        let mut removed_nodes = Vec::new();
        for node in self.top_most(nodes) {
            match self.graph.remove_subtree(node) {
                Ok(removed) => {
                    for light in &removed.lights {
                        self.host.light_disposed(*light);
                    }
                    removed_nodes.extend(removed.indices);
                }
                Err(err) => log::warn!("delete skipped: {err}"),
            }
        }
        if removed_nodes.is_empty() {
            return 0;
        }
        self.coordinator.forget(&removed_nodes);
        if self.selection.prune_deleted(&self.graph) {
            self.notify_selection();
        }
        self.commit("delete");
        removed_nodes.len()
    }

    /// Drop nodes whose ancestor is also listed, plus stale and internal ones.
    fn top_most(&self, nodes: &[NodeIndex]) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = Vec::new();
        for node in nodes {
            if self.graph.is_internal(*node) || out.contains(node) {
                continue;
            }
            if nodes.iter().any(|other| self.graph.is_ancestor_of(*other, *node)) {
                continue;
            }
            out.push(*node);
        }
        out
    }

    // ─── Factories ───────────────────────────────────────────────────────

    /// Add a primitive at the top level and select it.
    pub fn place_primitive(&mut self, shape: PrimitiveShape) -> NodeIndex {
        self.settle_drag();
        let at = Transform::from_translation(Vec3::new(0.0, self.config.primitive_spawn_height, 0.0));
        let node = self.graph.add_node(None, shape.as_str(), NodeKind::primitive(shape), at);
        self.finish_placement(node, "add primitive")
    }

    /// Add a light and its proxy at the top level and select the proxy.
    pub fn place_light(&mut self, kind: LightKind) -> NodeIndex {
        self.settle_drag();
        let at = Transform::from_translation(Vec3::new(0.0, self.config.light_spawn_height, 0.0));
        let proxy = self.graph.add_light(None, kind.base_name(), kind, at);
        self.announce_subtree(proxy);
        self.finish_placement(proxy, "add light")
    }

    /// Add an empty grouping node at the top level and select it.
    pub fn place_empty(&mut self) -> NodeIndex {
        self.settle_drag();
        let at = Transform::from_translation(Vec3::new(0.0, self.config.empty_spawn_height, 0.0));
        let node = self.graph.add_node(None, "Node", NodeKind::TransformNode, at);
        self.finish_placement(node, "add empty")
    }

    fn finish_placement(&mut self, node: NodeIndex, description: &str) -> NodeIndex {
        if self.selection.select(&self.graph, node, false) {
            self.notify_selection();
        }
        self.commit(description);
        node
    }

    /// Create a material, or update the existing one with the same id.
    pub fn create_material(&mut self, material: Material) -> bool {
        if material.id.trim().is_empty() {
            return false;
        }
        self.graph.upsert_material(material);
        self.commit("material")
    }

    // ─── Property edits ──────────────────────────────────────────────────

    /// Apply one inspector edit to `node`. Returns whether a snapshot was
    /// recorded.
    pub fn apply_edit(&mut self, node: NodeIndex, edit: SceneEdit) -> Result<bool, GraphError> {
        self.settle_drag();
        self.edit_node(node, &edit)?;
        Ok(self.commit("edit"))
    }

    /// Apply one edit to every selected node, recorded as one action.
    /// Nodes that reject the edit are skipped.
    pub fn apply_to_selection(&mut self, edit: SceneEdit) -> bool {
        self.settle_drag();
        let targets: Vec<NodeIndex> = self.selection.as_slice().to_vec();
        for node in targets {
            if let Err(err) = self.edit_node(node, &edit) {
                log::warn!("edit skipped: {err}");
            }
        }
        self.commit("edit")
    }

    fn edit_node(&mut self, node: NodeIndex, edit: &SceneEdit) -> Result<(), GraphError> {
        let current = self.graph.node(node).ok_or(GraphError::Missing(node))?;
        if current.is_internal() {
            return Err(GraphError::Internal(current.id));
        }

        if let SceneEdit::SetParent(parent) = edit {
            return self.graph.set_sibling_order(node, Placement::LastChildOf(*parent));
        }
        if let SceneEdit::SetLight {
            intensity,
            color,
            direction,
        } = edit
        {
            let Some(light) = self.graph.node(node).and_then(|n| n.light()) else {
                log::debug!("light edit on a non-light node ignored");
                return Ok(());
            };
            if let Some(light) = self.graph.light_mut(light) {
                light.intensity = *intensity;
                light.color = *color;
                light.direction = *direction;
            }
            self.graph.sync_light(node);
            return Ok(());
        }

        let mut cast_change = None;
        if let Some(target) = self.graph.node_mut(node) {
            match edit {
                SceneEdit::SetPosition(p) => target.local.translation = *p,
                SceneEdit::SetRotation(q) => target.local.rotation = q.normalize(),
                SceneEdit::SetEulerDegrees(deg) => target.local.set_euler_degrees(*deg),
                SceneEdit::SetScale(s) => target.local.scale = *s,
                SceneEdit::SetPivotOffset(offset) => match &mut target.kind {
                    NodeKind::Primitive { pivot_offset, .. } => *pivot_offset = *offset,
                    _ => log::debug!("pivot edit on a non-primitive ignored"),
                },
                SceneEdit::SetMaterial(material) => match &mut target.kind {
                    NodeKind::Primitive { material: slot, .. } => *slot = material.clone(),
                    _ => log::debug!("material edit on a non-primitive ignored"),
                },
                SceneEdit::SetShadowFlags { cast, receive } => {
                    if target.flags.casts_shadow != *cast {
                        cast_change = Some(*cast);
                    }
                    target.flags.casts_shadow = *cast;
                    target.flags.receives_shadow = *receive;
                }
                SceneEdit::SetParent(_) | SceneEdit::SetLight { .. } => {}
            }
        }
        if let Some(casts) = cast_change {
            self.host.shadow_caster_changed(node, casts);
        }
        self.graph.sync_lights_under(node);
        Ok(())
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Returns `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, LoadError> {
        self.step_history(true)
    }

    /// Returns `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool, LoadError> {
        self.step_history(false)
    }

    fn step_history(&mut self, backwards: bool) -> Result<bool, LoadError> {
        self.coordinator.drag_cancel(&mut self.graph);
        let selected: Vec<NodeId> = self
            .selection
            .as_slice()
            .iter()
            .filter_map(|n| self.graph.id_of(*n))
            .collect();
        let disposed: Vec<LightId> = self.graph.lights.keys().copied().collect();

        let stepped = if backwards {
            self.history.undo(&mut self.graph)?
        } else {
            self.history.redo(&mut self.graph)?
        };
        let Some(description) = stepped else {
            return Ok(false);
        };
        log::info!("{} `{description}`", if backwards { "undo" } else { "redo" });

        self.announce_reload(&disposed);
        self.coordinator.reset(&mut self.graph);
        self.selection.clear();
        if self.config.restore_selection_on_undo {
            let restored: Vec<NodeIndex> = selected.iter().filter_map(|id| self.graph.index_of(*id)).collect();
            self.selection.set_selection(&self.graph, &restored);
        }
        self.notify_selection();
        self.modified = true;
        Ok(true)
    }

    /// Record a snapshot after a mutation.
    fn commit(&mut self, description: &str) -> bool {
        self.coordinator.refresh(&mut self.graph);
        match self.history.record_state(&self.graph, description) {
            Ok(true) => {
                self.modified = true;
                true
            }
            Ok(false) => false,
            Err(err) => {
                log::error!("could not record `{description}`: {err}");
                false
            }
        }
    }

    // ─── Document lifecycle ──────────────────────────────────────────────

    /// Discard the document and start empty.
    pub fn new_document(&mut self) {
        self.coordinator.drag_cancel(&mut self.graph);
        for light in self.graph.clear_user_content() {
            self.host.light_disposed(light);
        }
        self.coordinator.reset(&mut self.graph);
        self.selection.clear();
        self.notify_selection();
        self.history.reset(&self.graph);
        self.current_name = None;
        self.modified = false;
        log::info!("new document");
    }

    /// Save under `name`; returns the name the gateway assigned.
    pub fn save(&mut self, name: &str) -> Result<String, PersistenceError> {
        self.settle_drag();
        let doc = emit_document(&self.graph);
        let assigned = self.gateway.write(name, &doc)?;
        self.current_name = Some(assigned.clone());
        self.modified = false;
        Ok(assigned)
    }

    /// Replace the document with the one stored under `name`. Nothing is
    /// touched if the read fails.
    pub fn load(&mut self, name: &str) -> Result<LoadReport, LoadError> {
        let doc = self.gateway.read(name)?;
        self.coordinator.drag_cancel(&mut self.graph);
        let report = load_document(&mut self.graph, &doc)?;
        if !report.unresolved_parents.is_empty() {
            log::warn!("`{name}`: {} parent reference(s) not found", report.unresolved_parents.len());
        }

        self.announce_reload(&report.disposed_lights);
        self.coordinator.reset(&mut self.graph);
        self.selection.clear();
        self.notify_selection();
        self.history.reset(&self.graph);
        self.current_name = Some(sanitize_name(name));
        self.modified = false;
        Ok(report)
    }

    // ─── Shortcuts ───────────────────────────────────────────────────────

    /// Perform a resolved shortcut on the current selection. Returns
    /// whether the document or selection changed.
    pub fn perform(&mut self, action: ShortcutAction) -> bool {
        match action {
            ShortcutAction::Undo => history_step_ok(self.undo()),
            ShortcutAction::Redo => history_step_ok(self.redo()),
            ShortcutAction::Delete => {
                let selected = self.selection.as_slice().to_vec();
                self.request_delete(&selected) > 0
            }
            ShortcutAction::Duplicate => {
                let selected = self.selection.as_slice().to_vec();
                !self.request_duplicate(&selected).is_empty()
            }
            ShortcutAction::SelectAll => self.select_all(),
            ShortcutAction::Deselect => self.pick(None, false),
            ShortcutAction::Save => {
                let name = self.current_name.clone().unwrap_or_else(|| "untitled".to_string());
                match self.save(&name) {
                    Ok(_) => true,
                    Err(err) => {
                        log::error!("save failed: {err}");
                        false
                    }
                }
            }
            ShortcutAction::ModePosition => self.switch_mode(GizmoMode::Position),
            ShortcutAction::ModeRotation => self.switch_mode(GizmoMode::Rotation),
            ShortcutAction::ModeScale => self.switch_mode(GizmoMode::Scale),
        }
    }

    fn switch_mode(&mut self, mode: GizmoMode) -> bool {
        let changed = self.mode() != mode;
        self.set_mode(mode);
        changed
    }

    // ─── Host notifications ──────────────────────────────────────────────

    /// Tell the host about lights and shadow casters at or below `root`.
    fn announce_subtree(&mut self, root: NodeIndex) {
        let mut nodes = vec![root];
        nodes.extend(self.graph.descendants(root));
        for node in nodes {
            self.announce_node(node);
        }
    }

    /// After a whole-document reload: drop the old lights, announce the
    /// new ones and every shadow caster.
    fn announce_reload(&mut self, disposed: &[LightId]) {
        for light in disposed {
            self.host.light_disposed(*light);
        }
        let nodes: Vec<NodeIndex> = self.graph.user_nodes().collect();
        for node in nodes {
            self.announce_node(node);
        }
    }

    fn announce_node(&mut self, node: NodeIndex) {
        let Some(n) = self.graph.node(node) else {
            return;
        };
        if let Some(light) = n.light()
            && let Some(record) = self.graph.light(light)
        {
            self.host.light_created(light, node, record.kind);
        }
        if n.flags.casts_shadow {
            self.host.shadow_caster_changed(node, true);
        }
    }
}

fn history_step_ok(result: Result<bool, LoadError>) -> bool {
    result.unwrap_or_else(|err| {
        log::error!("history step failed: {err}");
        false
    })
}
