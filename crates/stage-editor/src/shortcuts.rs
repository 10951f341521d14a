//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. The host
//! forwards raw key events; the session performs the action.

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Edit ──
    Undo,
    Redo,
    Delete,
    Duplicate,
    SelectAll,
    Deselect,

    // ── Document ──
    Save,

    // ── Manipulation mode ──
    ModePosition,
    ModeRotation,
    ModeScale,
}

/// Resolves key events into shortcut actions.
///
/// Platform-aware: on macOS `meta` is ⌘, elsewhere `ctrl` plays that role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the combo has no binding.
    pub fn resolve(key: &str, ctrl: bool, shift: bool, _alt: bool, meta: bool) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        // ── Modifier combos first (most specific) ──
        if cmd && shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "d" | "D" => Some(ShortcutAction::Duplicate),
                "s" | "S" => Some(ShortcutAction::Save),
                _ => None,
            };
        }

        if shift {
            return None;
        }

        // ── Single keys ──
        match key {
            "w" | "W" => Some(ShortcutAction::ModePosition),
            "e" | "E" => Some(ShortcutAction::ModeRotation),
            "r" | "R" => Some(ShortcutAction::ModeScale),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Deselect),
            _ => None,
        }
    }
}
