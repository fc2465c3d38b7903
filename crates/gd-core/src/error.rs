//! Error types for the document model and serializer.

use crate::id::NodeId;
use petgraph::graph::NodeIndex;
use thiserror::Error;

/// Result type for document model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while building, querying, or (de)serializing a document.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A persisted `typeTag` has no registered node kind.
    #[error("unknown node type: {0:?}")]
    UnknownType(String),

    /// A canonical type tag cannot be re-registered as an alias.
    #[error("type tag {0:?} is reserved for a built-in kind")]
    ReservedTag(String),

    /// A persisted record is missing required fields or has the wrong shape.
    #[error("malformed record at {path}: {reason}")]
    MalformedRecord { path: String, reason: String },

    /// Attribute values do not fit the typed record of the node kind.
    #[error("invalid attributes for {kind} node: {source}")]
    InvalidAttributes {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// No node with this ID exists in the document arena.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// An arena index that no longer (or never did) hold a node.
    #[error("no node at arena index {0:?}")]
    StaleIndex(NodeIndex),

    /// Another node in the arena already uses this ID.
    #[error("duplicate node id: {0}")]
    DuplicateId(NodeId),

    /// The document root cannot be detached, moved, or reparented.
    #[error("the document root cannot be detached or moved")]
    RootImmutable,

    /// Attaching would make a node its own ancestor.
    #[error("attaching {node} under {parent} would create a cycle")]
    CycleDetected { node: NodeId, parent: NodeId },

    /// JSON text could not be parsed or produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MessagePack encoding failed.
    #[error("MessagePack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding failed.
    #[error("MessagePack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

impl ModelError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        ModelError::MalformedRecord {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
