//! Integration tests: snapshot history through the editor session.

use glam::{Quat, Vec3};
use pretty_assertions::assert_eq;
use stage_core::{LightKind, MemoryGateway, PrimitiveShape, SceneGraph, TransformDelta, emit_snapshot};
use stage_editor::{DropZone, EditorConfig, EditorSession, HistoryManager, SceneEdit};

fn session() -> EditorSession<MemoryGateway> {
    EditorSession::new(MemoryGateway::new(), EditorConfig::default())
}

fn text(s: &EditorSession<MemoryGateway>) -> String {
    emit_snapshot(&s.graph).unwrap()
}

// ─── Laws ────────────────────────────────────────────────────────────────

#[test]
fn record_twice_without_change_keeps_one_entry() {
    let mut graph = SceneGraph::new();
    let mut history = HistoryManager::new(20);
    history.reset(&graph);
    graph.add_light(None, "Lamp", LightKind::Point, Default::default());

    assert!(history.record_state(&graph, "add").unwrap());
    assert!(!history.record_state(&graph, "add").unwrap());
    assert_eq!(history.undo_len(), 1);
}

#[test]
fn undo_then_redo_is_byte_identical() {
    let mut s = session();
    s.place_primitive(PrimitiveShape::Cube);
    s.place_light(LightKind::Point);
    s.place_empty();

    // Handles go stale across reloads, so every edit looks its nodes up by id.
    type Edit = fn(&mut EditorSession<MemoryGateway>);
    let edits: [Edit; 5] = [
        |s| {
            let (cube, group) = (s.graph.find("Cube"), s.graph.find("Node"));
            s.request_reparent(cube.unwrap(), group, DropZone::Inside).unwrap();
        },
        |s| {
            let lamp = s.graph.find("PointLight").unwrap();
            s.request_rename(lamp, "DeskLamp").unwrap();
        },
        |s| {
            let (lamp, group) = (s.graph.find("DeskLamp").unwrap(), s.graph.find("Node"));
            s.apply_edit(lamp, SceneEdit::SetParent(group)).unwrap();
        },
        |s| {
            let group = s.graph.find("Node").unwrap();
            s.apply_edit(group, SceneEdit::SetRotation(Quat::from_rotation_z(0.4)))
                .unwrap();
        },
        |s| {
            let group = s.graph.find("Node");
            s.pick(group, false);
            s.drag_start();
            s.drag_delta(TransformDelta::translate(Vec3::new(0.5, 0.25, -1.0)));
            s.drag_end();
        },
    ];

    for edit in edits {
        let before = text(&s);
        edit(&mut s);
        let after = text(&s);
        assert_ne!(before, after);

        assert!(s.undo().unwrap());
        assert_eq!(text(&s), before);
        assert!(s.redo().unwrap());
        assert_eq!(text(&s), after);
    }
}

#[test]
fn capacity_bounds_undo_depth() {
    let mut s = session();
    for _ in 0..25 {
        s.place_primitive(PrimitiveShape::Pyramid);
    }
    assert_eq!(s.history().undo_len(), 20);

    let mut steps = 0;
    while s.undo().unwrap() {
        steps += 1;
    }
    assert_eq!(steps, 20);
    assert_eq!(s.graph.node_count(), 5);
}

#[test]
fn new_edit_clears_redo() {
    let mut s = session();
    s.place_primitive(PrimitiveShape::Cube);
    s.place_primitive(PrimitiveShape::Sphere);
    s.undo().unwrap();
    assert!(s.history().can_redo());

    s.place_primitive(PrimitiveShape::Cylinder);
    assert!(!s.history().can_redo());
    assert!(!s.redo().unwrap());
}

// ─── Session behaviour ───────────────────────────────────────────────────

#[test]
fn undo_restores_selection_by_id() {
    let mut s = session();
    let cube = s.place_primitive(PrimitiveShape::Cube);
    s.place_primitive(PrimitiveShape::Sphere);
    s.pick(Some(cube), false);
    s.apply_edit(cube, SceneEdit::SetScale(Vec3::splat(2.0))).unwrap();

    s.undo().unwrap();
    let cube = s.graph.find("Cube").unwrap();
    assert_eq!(s.selection(), [cube]);
    assert_eq!(s.graph.graph[cube].local.scale, Vec3::ONE);
}

#[test]
fn undo_past_creation_drops_missing_selection() {
    let mut s = session();
    s.place_primitive(PrimitiveShape::Cube);
    s.undo().unwrap();
    assert!(s.selection().is_empty());
    assert_eq!(s.graph.node_count(), 0);
}

#[test]
fn cancelled_drag_records_nothing() {
    let mut s = session();
    let a = s.place_primitive(PrimitiveShape::Cube);
    let b = s.place_primitive(PrimitiveShape::Sphere);
    s.set_selection(&[a, b]);
    let before = (s.history().undo_len(), text(&s));

    s.drag_start();
    s.drag_delta(TransformDelta::rotate(Quat::from_rotation_y(0.9)));
    s.drag_cancel();

    assert_eq!((s.history().undo_len(), text(&s)), before);
}

#[test]
fn undo_mid_drag_cancels_the_gesture() {
    let mut s = session();
    let a = s.place_primitive(PrimitiveShape::Cube);
    let b = s.place_primitive(PrimitiveShape::Sphere);
    s.set_selection(&[a, b]);
    s.drag_start();
    s.drag_delta(TransformDelta::translate(Vec3::X));

    assert!(s.undo().unwrap());
    assert!(!s.coordinator().is_dragging());
    assert_eq!(s.graph.node_count(), 1);
    let cube = s.graph.find("Cube").unwrap();
    assert_eq!(s.graph.parent(cube), None);
}

// ─── Degenerate poses ────────────────────────────────────────────────────

#[test]
fn flattened_node_drag_stays_undoable() {
    let mut s = session();
    let cube = s.place_primitive(PrimitiveShape::Cube);
    s.apply_edit(cube, SceneEdit::SetScale(Vec3::new(1.0, 0.0, 1.0))).unwrap();
    s.pick(Some(cube), false);
    assert!(s.drag_start());
    s.drag_delta(TransformDelta::translate(Vec3::X));
    assert!(s.drag_end());
    let dragged = text(&s);
    assert!(!dragged.contains("null"), "{dragged}");
    s.place_empty();
    let with_empty = text(&s);

    assert!(s.undo().unwrap());
    assert_eq!(text(&s), dragged);
    assert!(s.undo().unwrap());
    let cube = s.graph.find("Cube").unwrap();
    assert_eq!(s.graph.graph[cube].local.scale, Vec3::new(1.0, 0.0, 1.0));
    assert_eq!(s.graph.graph[cube].local.rotation, Quat::IDENTITY);

    assert!(s.redo().unwrap());
    assert!(s.redo().unwrap());
    assert_eq!(text(&s), with_empty);
}

#[test]
fn degenerate_scales_survive_every_gesture() {
    let scales = [
        Vec3::new(0.0, 1.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 2.0),
        Vec3::ZERO,
    ];
    let gestures = [
        TransformDelta::translate(Vec3::new(0.5, 0.0, -1.0)),
        TransformDelta::rotate(Quat::from_rotation_y(0.7)),
        TransformDelta::scaled(Vec3::splat(2.0)),
    ];
    for scale in scales {
        for (g, gesture) in gestures.iter().enumerate() {
            for multi in [false, true] {
                let case = format!("scale {scale:?} gesture {g} multi {multi}");
                let mut s = session();
                let cone = s.place_primitive(PrimitiveShape::Cone);
                let group = s.place_empty();
                s.request_reparent(cone, Some(group), DropZone::Inside).unwrap();
                s.apply_edit(cone, SceneEdit::SetScale(scale)).unwrap();
                if multi {
                    s.set_selection(&[cone, group]);
                } else {
                    s.set_selection(&[cone]);
                }
                assert!(s.drag_start(), "{case}");
                s.drag_delta(*gesture);
                s.drag_end();

                assert!(s.graph.graph[cone].local.is_finite(), "{case}");
                assert!(!text(&s).contains("null"), "{case}");
                let undos = s.history().undo_len();
                for _ in 0..undos {
                    assert!(s.undo().unwrap(), "{case}");
                }
                assert_eq!(s.graph.node_count(), 0, "{case}");
            }
        }
    }
}
