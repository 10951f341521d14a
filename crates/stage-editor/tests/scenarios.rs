//! Integration tests: end-to-end editing scenarios through `EditorSession`.
//!
//! Each test drives the session only through its inbound handlers, the way
//! a host UI would.

use glam::Vec3;
use stage_core::{LightKind, MemoryGateway, NodeIndex, PrimitiveShape, SceneGraph, TransformDelta};
use stage_editor::{DropZone, EditorConfig, EditorSession, SceneEdit, SelectionObserver};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

fn session() -> EditorSession<MemoryGateway> {
    EditorSession::new(MemoryGateway::new(), EditorConfig::default())
}

fn id(s: &EditorSession<MemoryGateway>, node: NodeIndex) -> &str {
    s.graph.graph[node].id.as_str()
}

// ─── Scenarios ───────────────────────────────────────────────────────────

#[test]
fn scenario_a_inside_drop_parents_sphere_under_cube() {
    let mut s = session();
    let cube = s.place_primitive(PrimitiveShape::Cube);
    let sphere = s.place_primitive(PrimitiveShape::Sphere);

    s.request_reparent(sphere, Some(cube), DropZone::Inside).unwrap();

    assert_eq!(s.graph.parent(sphere), Some(cube));
    assert_eq!(s.graph.parent(cube), None);
    assert_eq!(s.graph.roots(), [cube]);
    assert_eq!(s.graph.children(cube), [sphere]);
}

#[test]
fn scenario_b_multi_drag_moves_both_and_keeps_parents() {
    let mut s = session();
    let cube = s.place_primitive(PrimitiveShape::Cube);
    let sphere = s.place_primitive(PrimitiveShape::Sphere);
    s.request_reparent(sphere, Some(cube), DropZone::Inside).unwrap();
    let (cube_x, sphere_x) = (s.graph.world_position(cube).x, s.graph.world_position(sphere).x);

    s.pick(Some(cube), false);
    s.pick(Some(sphere), true);
    assert_eq!(s.selection(), [cube, sphere]);

    let undo_before = s.history().undo_len();
    assert!(s.drag_start());
    s.drag_delta(TransformDelta::translate(Vec3::new(1.0, 0.0, 0.0)));
    s.drag_delta(TransformDelta::translate(Vec3::new(1.0, 0.0, 0.0)));
    assert!(s.drag_end());

    assert!((s.graph.world_position(cube).x - (cube_x + 2.0)).abs() < 1e-5);
    assert!((s.graph.world_position(sphere).x - (sphere_x + 2.0)).abs() < 1e-5);
    assert_eq!(s.graph.parent(cube), None);
    assert_eq!(s.graph.parent(sphere), Some(cube));
    assert_eq!(s.history().undo_len(), undo_before + 1, "one snapshot per gesture");
}

#[test]
fn scenario_c_rename_collision_suffixes() {
    let mut s = session();
    let cube = s.place_primitive(PrimitiveShape::Cube);
    let sphere = s.place_primitive(PrimitiveShape::Sphere);

    let applied = s.request_rename(sphere, "Cube").unwrap();
    assert_eq!(applied.as_str(), "Cube_1");
    assert_eq!(id(&s, sphere), "Cube_1");
    assert_eq!(id(&s, cube), "Cube");
}

#[test]
fn scenario_d_no_edit_records_nothing() {
    let mut s = session();
    let cube = s.place_primitive(PrimitiveShape::Cube);
    let before = s.history().undo_len();

    // Dropping a node where it already is changes nothing.
    s.request_reparent(cube, None, DropZone::Inside).unwrap();
    s.drag_start();
    assert!(!s.drag_end());

    assert_eq!(s.history().undo_len(), before);
}

#[test]
fn scenario_e_delete_cascades_and_clears_selection() {
    let mut s = session();
    let group = s.place_empty();
    let a = s.place_primitive(PrimitiveShape::Cube);
    let b = s.place_primitive(PrimitiveShape::Cone);
    s.request_reparent(a, Some(group), DropZone::Inside).unwrap();
    s.request_reparent(b, Some(group), DropZone::Inside).unwrap();
    s.pick(Some(b), false);

    assert_eq!(s.request_delete(&[group]), 3);

    for node in [group, a, b] {
        assert!(!s.graph.contains(node));
    }
    assert!(s.selection().is_empty());
    assert_eq!(s.graph.node_count(), 0);
}

// ─── Drop zones ──────────────────────────────────────────────────────────

#[test]
fn before_and_after_zones_reorder_siblings() {
    let mut s = session();
    let a = s.place_primitive(PrimitiveShape::Cube);
    let b = s.place_primitive(PrimitiveShape::Sphere);
    let c = s.place_primitive(PrimitiveShape::Cone);

    s.request_reparent(c, Some(a), DropZone::Before).unwrap();
    assert_eq!(s.graph.roots(), [c, a, b]);

    s.request_reparent(c, Some(b), DropZone::After).unwrap();
    assert_eq!(s.graph.roots(), [a, b, c]);
    let keys: Vec<f64> = [a, b, c].iter().map(|n| s.graph.graph[*n].sort_index).collect();
    assert_eq!(keys, [100.0, 200.0, 300.0]);
}

#[test]
fn cycle_drop_is_rejected_without_change() {
    let mut s = session();
    let outer = s.place_empty();
    let inner = s.place_empty();
    s.request_reparent(inner, Some(outer), DropZone::Inside).unwrap();
    let before = s.history().undo_len();

    assert!(s.request_reparent(outer, Some(inner), DropZone::Inside).is_err());
    assert!(s.request_reparent(outer, Some(outer), DropZone::Inside).is_err());

    assert_eq!(s.graph.parent(inner), Some(outer));
    assert_eq!(s.graph.parent(outer), None);
    assert_eq!(s.history().undo_len(), before);
}

// ─── Notification order ──────────────────────────────────────────────────

struct Recorder {
    name: &'static str,
    log: Rc<RefCell<Vec<String>>>,
}

impl SelectionObserver for Recorder {
    fn selection_changed(&mut self, graph: &SceneGraph, selection: &[NodeIndex], handle: Option<NodeIndex>) {
        let handle = match handle {
            None => "none",
            Some(h) if graph.is_internal(h) => "anchor",
            Some(_) => "node",
        };
        self.log
            .borrow_mut()
            .push(format!("{} {} {handle}", self.name, selection.len()));
    }
}

#[test]
fn subscribers_see_updated_handle_in_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut s = session();
    s.set_tree(Recorder {
        name: "tree",
        log: log.clone(),
    });
    s.set_inspector(Recorder {
        name: "inspector",
        log: log.clone(),
    });

    let a = s.place_primitive(PrimitiveShape::Cube);
    let b = s.place_primitive(PrimitiveShape::Sphere);
    s.pick(Some(a), true);
    s.pick(None, false);

    assert_eq!(
        *log.borrow(),
        [
            "inspector 1 node",
            "tree 1 node",
            "inspector 1 node",
            "tree 1 node",
            "inspector 2 anchor",
            "tree 2 anchor",
            "inspector 0 none",
            "tree 0 none",
        ]
    );
    assert!(s.graph.contains(b));
}

#[test]
fn internal_nodes_cannot_be_picked() {
    let mut s = session();
    let a = s.place_primitive(PrimitiveShape::Cube);
    s.place_primitive(PrimitiveShape::Sphere);
    s.select_all();
    let anchor = s.coordinator().anchor().unwrap();

    assert!(!s.pick(Some(anchor), false));
    assert!(!s.pick(Some(s.graph.root), false));
    assert_eq!(s.selection().len(), 2);
    assert!(s.pick(Some(a), false));
    assert!(!s.graph.contains(anchor), "anchor dropped for single selection");
}

#[test]
fn additive_click_on_empty_space_still_clears() {
    let mut s = session();
    let cube = s.place_primitive(PrimitiveShape::Cube);
    let cone = s.place_primitive(PrimitiveShape::Cone);
    s.pick(Some(cube), false);
    s.pick(Some(cone), true);
    assert_eq!(s.selection().len(), 2);

    assert!(s.pick(None, true));
    assert!(s.selection().is_empty());
    assert_eq!(s.coordinator().anchor(), None);
    assert!(!s.pick(None, true), "already empty");
}

#[test]
fn pivot_anchor_is_not_a_drop_target() {
    let mut s = session();
    let a = s.place_primitive(PrimitiveShape::Cube);
    let b = s.place_primitive(PrimitiveShape::Sphere);
    let c = s.place_primitive(PrimitiveShape::Cone);
    s.set_selection(&[a, b]);
    let anchor = s.coordinator().anchor().unwrap();
    let before = s.history().undo_len();

    assert!(s.request_reparent(c, Some(anchor), DropZone::Inside).is_err());
    assert!(s.apply_edit(c, SceneEdit::SetParent(Some(anchor))).is_err());
    assert_eq!(s.graph.parent(c), None);
    assert_eq!(s.history().undo_len(), before);
}

#[test]
fn rename_mid_drag_finishes_the_gesture_first() {
    let mut s = session();
    let cube = s.place_primitive(PrimitiveShape::Cube);
    s.pick(Some(cube), false);
    let before = s.history().undo_len();

    s.drag_start();
    s.drag_delta(TransformDelta::translate(Vec3::new(0.0, 0.0, 2.0)));
    s.request_rename(cube, "Crate").unwrap();

    assert!(!s.coordinator().is_dragging());
    assert_eq!(id(&s, cube), "Crate");
    assert_eq!(s.history().undo_len(), before + 2, "gesture and rename recorded separately");
    s.undo().unwrap();
    let cube = s.graph.find("Cube").unwrap();
    assert!((s.graph.world_position(cube).z - 2.0).abs() < 1e-5);
}

// ─── Identity ────────────────────────────────────────────────────────────

type Step = (&'static str, fn(&mut EditorSession<MemoryGateway>));

fn assert_unique_ids(s: &EditorSession<MemoryGateway>, step: &str) {
    let ids: Vec<String> = s.graph.user_nodes().map(|n| id(s, n).to_string()).collect();
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len(), "after `{step}`: {ids:?}");
    for (n, name) in s.graph.user_nodes().zip(&ids) {
        assert_eq!(s.graph.find(name), Some(n), "after `{step}`: `{name}` not indexed");
    }
}

#[test]
fn ids_stay_unique_through_mixed_edits() {
    let steps: [Step; 10] = [
        ("place", |s| {
            s.place_primitive(PrimitiveShape::Cube);
            s.place_primitive(PrimitiveShape::Cube);
            s.place_light(LightKind::Point);
        }),
        ("rename onto a taken id", |s| {
            let n = s.graph.find("Cube_1").unwrap();
            s.request_rename(n, "Cube").unwrap();
        }),
        ("rename light onto a suffixed id", |s| {
            let n = s.graph.find("PointLight").unwrap();
            s.request_rename(n, "Cube_1").unwrap();
        }),
        ("duplicate everything", |s| {
            let all: Vec<NodeIndex> = s.graph.user_nodes().collect();
            s.request_duplicate(&all);
        }),
        ("save and load", |s| {
            s.save("mixed").unwrap();
            s.load("mixed").unwrap();
        }),
        ("place after load", |s| {
            s.place_primitive(PrimitiveShape::Cube);
            s.place_empty();
        }),
        ("delete one in the middle", |s| {
            let n = s.graph.find("Cube_2").unwrap();
            s.request_delete(&[n]);
        }),
        ("place into the gap", |s| {
            s.place_primitive(PrimitiveShape::Cube);
        }),
        ("duplicate after load", |s| {
            let all: Vec<NodeIndex> = s.graph.user_nodes().collect();
            s.request_duplicate(&all);
        }),
        ("undo and redo", |s| {
            s.undo().unwrap();
            s.undo().unwrap();
            s.redo().unwrap();
        }),
    ];

    let mut s = session();
    for (step, run) in steps {
        run(&mut s);
        assert_unique_ids(&s, step);
    }
    assert_eq!(s.graph.node_count(), 8);
}
