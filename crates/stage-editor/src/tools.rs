//! Tree-view helpers: drop zones for drag-and-drop reparenting and the
//! flattened outline the tree renders.

use stage_core::{NodeIndex, SceneGraph};
use std::collections::HashSet;

/// Where a dragged row lands relative to the row under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropZone {
    Before,
    Inside,
    After,
}

impl DropZone {
    /// Top quarter of a row inserts before it, bottom quarter after it,
    /// the middle half reparents into it.
    pub fn from_pointer(rel_y: f32, row_height: f32) -> Self {
        if rel_y < row_height * 0.25 {
            DropZone::Before
        } else if rel_y > row_height * 0.75 {
            DropZone::After
        } else {
            DropZone::Inside
        }
    }
}

/// One visible row of the outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineRow {
    pub node: NodeIndex,
    pub depth: usize,
    pub has_children: bool,
    pub collapsed: bool,
}

/// Flatten the visible hierarchy depth-first in sibling order.
///
/// Children of collapsed nodes are skipped; internal nodes never appear.
pub fn outline(graph: &SceneGraph, collapsed: &HashSet<NodeIndex>) -> Vec<OutlineRow> {
    let mut rows = Vec::new();
    let mut stack: Vec<(NodeIndex, usize)> = graph.roots().into_iter().rev().map(|r| (r, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        let children = graph.children(node);
        let is_collapsed = collapsed.contains(&node);
        rows.push(OutlineRow {
            node,
            depth,
            has_children: !children.is_empty(),
            collapsed: is_collapsed,
        });
        if !is_collapsed {
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
    }
    rows
}
