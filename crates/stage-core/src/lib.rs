pub mod emitter;
pub mod error;
pub mod format;
pub mod gateway;
pub mod hierarchy;
pub mod id;
pub mod lint;
pub mod loader;
pub mod model;
pub mod transform;
pub mod world;

pub use emitter::{emit_document, emit_snapshot};
pub use error::{GraphError, LoadError, PersistenceError};
pub use format::{FORMAT_VERSION, SavedDocument};
pub use gateway::{DirectoryGateway, MemoryGateway, PersistenceGateway, sanitize_name};
pub use hierarchy::{Placement, Removed, ReparentMode};
pub use id::{IdentityRegistry, NodeId};
pub use lint::{LintDiagnostic, LintSeverity, lint_document};
pub use loader::{LoadReport, load_document, load_snapshot, parse_snapshot};
pub use model::*;
pub use transform::{Transform, TransformDelta};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
