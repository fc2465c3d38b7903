//! Error types for commands, history, and editing sessions.

use gd_core::{ModelError, NodeId, NodeKind};
use thiserror::Error;

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Debug, Error)]
pub enum EditorError {
    /// A command instance was executed (or recorded) after it already ran.
    #[error("command already executed: {0}")]
    UseAfterExecute(String),

    /// The operation needs the node to be part of the document tree.
    #[error("node {0} is not attached to the document")]
    NotAttached(NodeId),

    /// The node still has a parent, possibly inside a deleted subtree.
    #[error("node {0} already has a parent")]
    AlreadyPlaced(NodeId),

    /// Only the root may be a document node.
    #[error("cannot create a {0} node inside a document")]
    InvalidKind(NodeKind),

    /// History configuration could not be parsed.
    #[error("invalid history config: {0}")]
    Config(#[source] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ModelError),
}
