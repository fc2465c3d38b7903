//! Document model for the graphics editor: node kinds and their registry,
//! the scene-graph arena, typed attribute records, view subscriptions, and
//! save/load of whole trees.

pub mod attr;
pub mod binding;
pub mod error;
pub mod id;
pub mod kind;
pub mod model;
pub mod serialize;

pub use attr::{Attributes, deep_eq, keys};
pub use binding::{Bindings, SubscriptionId};
pub use error::{ModelError, ModelResult};
pub use id::NodeId;
pub use kind::{NodeKind, TypeRegistry};
pub use model::{SceneGraph, SceneNode, Walk};
pub use serialize::{NodeRecord, load, load_detached, load_document, save, save_document};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
