pub mod commands;
pub mod config;
pub mod coordinator;
pub mod host;
pub mod selection;
pub mod session;
pub mod shortcuts;
pub mod tools;

pub use commands::{HistoryManager, Snapshot};
pub use config::EditorConfig;
pub use coordinator::{ANCHOR_NAME, GizmoMode, HandleTarget, TransformCoordinator};
pub use host::{NullHost, SceneHost};
pub use selection::{SelectionObserver, SelectionStore};
pub use session::{EditorSession, SceneEdit};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::{DropZone, OutlineRow, outline};
