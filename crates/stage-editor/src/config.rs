//! Editor configuration.

use stage_core::SIBLING_SPACING;

/// Tunables for an editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    /// Undo entries kept before the oldest is dropped.
    pub history_capacity: usize,
    /// Gap between sibling sort indices when renumbering.
    pub sibling_spacing: f64,
    /// Height at which new primitives appear.
    pub primitive_spawn_height: f32,
    /// Height at which new empties appear.
    pub empty_spawn_height: f32,
    /// Height at which new light proxies appear.
    pub light_spawn_height: f32,
    /// Reselect nodes by id after undo/redo.
    pub restore_selection_on_undo: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 20,
            sibling_spacing: SIBLING_SPACING,
            primitive_spawn_height: 0.5,
            empty_spawn_height: 1.0,
            light_spawn_height: 5.0,
            restore_selection_on_undo: true,
        }
    }
}
