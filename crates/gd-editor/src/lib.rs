//! Editing layer for graphics documents: reversible commands, the
//! coalescing undo/redo history, view bindings, and the editing session
//! that ties them to one document.

pub mod binding;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod session;

pub use binding::AttributeBinding;
pub use commands::{AttrBundle, Coalesce, Command, Mutation};
pub use config::{CoalesceGroups, HistoryConfig};
pub use error::{EditorError, EditorResult};
pub use history::{HistoryEngine, PushOutcome};
pub use session::Session;
