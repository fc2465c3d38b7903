//! Attribute subscriptions for the view layer.
//!
//! A view subscribes to one `(node, key)` slot and is called back with the
//! new value whenever that attribute is written, whether by a tracked edit or
//! by undo/redo replay. A slot with no subscribers is "detached": writes
//! still land in the attribute map, nobody is notified.
//!
//! Callbacks only receive the value. They cannot reach the document or its
//! history, so replay can never record new history through a callback.

use crate::id::NodeId;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Handle returned by [`Bindings::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&Value)>;

/// Registry of attribute subscriptions for one document.
#[derive(Default)]
pub struct Bindings {
    next_id: u64,
    slots: HashMap<NodeId, HashMap<String, Vec<(SubscriptionId, Callback)>>>,
    owners: HashMap<SubscriptionId, (NodeId, String)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for writes to `key` on `node`.
    pub fn subscribe(
        &mut self,
        node: NodeId,
        key: &str,
        callback: impl FnMut(&Value) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.slots
            .entry(node)
            .or_default()
            .entry(key.to_string())
            .or_default()
            .push((id, Box::new(callback)));
        self.owners.insert(id, (node, key.to_string()));
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some((node, key)) = self.owners.remove(&id) else {
            return false;
        };
        if let Some(keys) = self.slots.get_mut(&node) {
            if let Some(subs) = keys.get_mut(&key) {
                subs.retain(|(sub, _)| *sub != id);
                if subs.is_empty() {
                    keys.remove(&key);
                }
            }
            if keys.is_empty() {
                self.slots.remove(&node);
            }
        }
        true
    }

    /// Drop every subscription on `node` (e.g. when its view is torn down).
    pub fn unsubscribe_node(&mut self, node: NodeId) -> usize {
        let Some(keys) = self.slots.remove(&node) else {
            return 0;
        };
        let mut removed = 0;
        for subs in keys.into_values() {
            for (id, _) in subs {
                self.owners.remove(&id);
                removed += 1;
            }
        }
        removed
    }

    /// Whether any view is attached to this slot.
    pub fn is_bound(&self, node: NodeId, key: &str) -> bool {
        self.slots
            .get(&node)
            .is_some_and(|keys| keys.contains_key(key))
    }

    /// Call every subscriber of `(node, key)` with `value`.
    pub fn notify(&mut self, node: NodeId, key: &str, value: &Value) {
        let Some(subs) = self.slots.get_mut(&node).and_then(|keys| keys.get_mut(key)) else {
            return;
        };
        log::trace!("notify {node} {key} ({} subscribers)", subs.len());
        for (_, callback) in subs.iter_mut() {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("subscriptions", &self.owners.len())
            .finish()
    }
}
