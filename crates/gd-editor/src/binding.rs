//! Two-way attribute binding for the view layer.
//!
//! A binding names one `(node, key)` slot. Reads go straight to the graph,
//! writes go through [`Session::set_attribute`] so they are no-op filtered
//! and recorded, and subscriptions are fired by every write to the slot,
//! including undo/redo replay.

use crate::error::EditorResult;
use crate::session::Session;
use gd_core::{NodeId, SceneGraph, SubscriptionId};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeBinding {
    node: NodeId,
    key: String,
}

impl AttributeBinding {
    pub fn new(node: NodeId, key: impl Into<String>) -> Self {
        Self {
            node,
            key: key.into(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get<'g>(&self, graph: &'g SceneGraph) -> Option<&'g Value> {
        graph.get(self.node, &self.key)
    }

    /// Tracked write. Returns `false` if `value` equals the current value.
    pub fn set(&self, session: &mut Session, value: Value) -> EditorResult<bool> {
        session.set_attribute(self.node, self.key.clone(), value)
    }

    /// Tracked write computed from the current value.
    pub fn update(
        &self,
        session: &mut Session,
        f: impl FnOnce(Option<&Value>) -> Value,
    ) -> EditorResult<bool> {
        let next = f(self.get(&session.graph));
        self.set(session, next)
    }

    /// Call `callback` with the new value after every write to this slot.
    /// Removal is reported as `null`.
    pub fn subscribe(
        &self,
        session: &mut Session,
        callback: impl FnMut(&Value) + 'static,
    ) -> SubscriptionId {
        session
            .graph
            .bindings
            .subscribe(self.node, &self.key, callback)
    }

    pub fn unsubscribe(session: &mut Session, id: SubscriptionId) -> bool {
        session.graph.bindings.unsubscribe(id)
    }

    /// Whether any view is currently subscribed to this slot.
    pub fn is_bound(&self, session: &Session) -> bool {
        session.graph.bindings.is_bound(self.node, &self.key)
    }
}
