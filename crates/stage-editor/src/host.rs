//! Callbacks into the rendering host.
//!
//! The document core never renders. Whatever owns the real lights and the
//! shadow registry implements [`SceneHost`] and is told about changes at
//! the moment they happen.

use stage_core::{LightId, LightKind, NodeIndex};

/// Push notifications for host-side resources. Every method defaults to
/// doing nothing.
pub trait SceneHost {
    /// A light record now exists (placed, duplicated or loaded).
    fn light_created(&mut self, _light: LightId, _proxy: NodeIndex, _kind: LightKind) {}

    /// A light record is gone; release its shadow generator.
    fn light_disposed(&mut self, _light: LightId) {}

    /// A node started or stopped casting shadows.
    fn shadow_caster_changed(&mut self, _node: NodeIndex, _casts: bool) {}
}

/// Host that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl SceneHost for NullHost {}
