//! Undo/redo over whole-document snapshots.
//!
//! Every committed user action records one snapshot of the serialized
//! document. Undo and redo swap the current snapshot with the top of the
//! other stack and reload it, so history never needs per-edit inverses.
//!
//! Identical consecutive snapshots are suppressed, any new snapshot
//! clears the redo stack, and the undo stack is bounded: the oldest entry
//! is dropped once `max_depth` is exceeded.

use stage_core::{LoadError, SceneGraph, emit_snapshot, load_snapshot};
use std::collections::VecDeque;

/// One serialized document state and the action that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub text: String,
    pub description: String,
}

/// Linear snapshot history.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: Vec<Snapshot>,
    /// State the live document is in, as last recorded or restored.
    current: Option<Snapshot>,
    max_depth: usize,
}

impl HistoryManager {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(max_depth + 1),
            redo_stack: Vec::new(),
            current: None,
            max_depth,
        }
    }

    /// Forget all history and take `graph` as the baseline.
    pub fn reset(&mut self, graph: &SceneGraph) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current = match emit_snapshot(graph) {
            Ok(text) => Some(Snapshot {
                text,
                description: "open".to_string(),
            }),
            Err(err) => {
                log::error!("history baseline failed: {err}");
                None
            }
        };
    }

    /// Record the state after a user action.
    ///
    /// Returns `Ok(false)` when the document is unchanged since the last
    /// record.
    pub fn record_state(&mut self, graph: &SceneGraph, description: &str) -> Result<bool, serde_json::Error> {
        let text = emit_snapshot(graph)?;
        if self.current.as_ref().is_some_and(|c| c.text == text) {
            return Ok(false);
        }
        let next = Snapshot {
            text,
            description: description.to_string(),
        };
        if let Some(previous) = self.current.replace(next) {
            self.undo_stack.push_back(previous);
            if self.undo_stack.len() > self.max_depth {
                self.undo_stack.pop_front();
                log::debug!("history full, oldest entry dropped");
            }
        }
        self.redo_stack.clear();
        Ok(true)
    }

    /// Step back one action. Returns the undone action's description, or
    /// `None` when there is nothing to undo.
    pub fn undo(&mut self, graph: &mut SceneGraph) -> Result<Option<String>, LoadError> {
        let Some(target) = self.undo_stack.pop_back() else {
            return Ok(None);
        };
        if let Err(err) = load_snapshot(graph, &target.text) {
            self.undo_stack.push_back(target);
            return Err(err);
        }
        let undone = self.current.replace(target);
        let description = undone.as_ref().map(|s| s.description.clone());
        if let Some(undone) = undone {
            self.redo_stack.push(undone);
        }
        Ok(description)
    }

    /// Re-apply the last undone action. Returns its description, or `None`
    /// when there is nothing to redo.
    pub fn redo(&mut self, graph: &mut SceneGraph) -> Result<Option<String>, LoadError> {
        let Some(target) = self.redo_stack.pop() else {
            return Ok(None);
        };
        if let Err(err) = load_snapshot(graph, &target.text) {
            self.redo_stack.push(target);
            return Err(err);
        }
        let description = target.description.clone();
        if let Some(previous) = self.current.replace(target) {
            self.undo_stack.push_back(previous);
            if self.undo_stack.len() > self.max_depth {
                self.undo_stack.pop_front();
            }
        }
        Ok(Some(description))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Text of the current state.
    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.text.as_str())
    }
}
