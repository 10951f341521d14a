//! Error types for the document core.

use crate::id::NodeId;
use petgraph::graph::NodeIndex;
use thiserror::Error;

/// Structural edit rejected by the scene graph. The graph is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Parenting `node` under `target` would make `node` its own ancestor.
    #[error("cannot parent `{node}` under `{target}`: it would become its own ancestor")]
    Cycle { node: NodeId, target: NodeId },

    /// The handle does not refer to a live node.
    #[error("node {0:?} is not in the document")]
    Missing(NodeIndex),

    /// The node is internal (root sentinel, pivot anchor) and cannot be edited.
    #[error("node `{0}` is internal and cannot be edited")]
    Internal(NodeId),

    #[error("node `{0}` is not a pivot anchor")]
    NotAnchor(NodeId),
}

/// Failure talking to a persistence backend.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("document `{0}` not found")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode document: {0}")]
    Encode(String),

    #[error("could not decode document `{name}`: {message}")]
    Decode { name: String, message: String },

    /// Backend-specific rejection (e.g. quota, permissions).
    #[error("storage rejected the request: {0}")]
    Rejected(String),
}

/// Failure before a load touched the live document.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported document version {found} (expected <= {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}
