//! Reversible document commands.
//!
//! Every tracked mutation is a `Command`. Commands are single-use: `execute`
//! applies the mutation once and returns a fresh command that is its exact
//! inverse. The history stores those inverses, so undo is "execute the top
//! of the undo stack" and redo is "execute the top of the redo stack".
//!
//! Attribute commands replay through the raw write path
//! ([`SceneGraph::undo_state_set`]) only, so replay never records history.
//!
//! Structural commands (create / delete / move) re-derive the node's actual
//! location at execution time instead of trusting the captured payload.

use crate::config::CoalesceGroups;
use crate::error::{EditorError, EditorResult};
use gd_core::{NodeId, NodeIndex, SceneGraph};
use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute values a command writes. `None` removes the key.
pub type AttrBundle = BTreeMap<String, Option<Value>>;

/// The mutation a command performs.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Write one or more attributes of one node. A single-key set is a
    /// one-entry bundle; coalescing grows it.
    AttributeSet { node: NodeId, values: AttrBundle },
    /// Attach an arena node under `parent` at `index`.
    Create {
        node: NodeId,
        parent: NodeId,
        index: usize,
    },
    /// Detach a node from wherever it currently is.
    Delete {
        node: NodeId,
        parent: NodeId,
        index: usize,
    },
    /// Reposition a node into `parent` at `to_index`.
    Move {
        node: NodeId,
        parent: NodeId,
        from_index: usize,
        to_index: usize,
    },
}

/// Answer of [`Command::attempt_coalesce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coalesce {
    /// The incoming command was absorbed; this entry now covers both.
    Replace,
    /// This entry cannot absorb it, but older entries may.
    Continue,
    /// Hard barrier: record the incoming command as a new entry.
    Stop,
}

/// A single-use, self-inverting mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    mutation: Mutation,
    spent: bool,
}

impl Command {
    pub fn new(mutation: Mutation) -> Self {
        Self {
            mutation,
            spent: false,
        }
    }

    pub fn attribute_set(node: NodeId, key: impl Into<String>, value: Value) -> Self {
        let mut values = AttrBundle::new();
        values.insert(key.into(), Some(value));
        Self::new(Mutation::AttributeSet { node, values })
    }

    pub fn attribute_unset(node: NodeId, key: impl Into<String>) -> Self {
        let mut values = AttrBundle::new();
        values.insert(key.into(), None);
        Self::new(Mutation::AttributeSet { node, values })
    }

    pub fn attribute_bundle(node: NodeId, values: AttrBundle) -> Self {
        Self::new(Mutation::AttributeSet { node, values })
    }

    pub fn create(node: NodeId, parent: NodeId, index: usize) -> Self {
        Self::new(Mutation::Create {
            node,
            parent,
            index,
        })
    }

    pub fn delete(node: NodeId, parent: NodeId, index: usize) -> Self {
        Self::new(Mutation::Delete {
            node,
            parent,
            index,
        })
    }

    pub fn move_node(node: NodeId, parent: NodeId, from_index: usize, to_index: usize) -> Self {
        Self::new(Mutation::Move {
            node,
            parent,
            from_index,
            to_index,
        })
    }

    pub fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    /// Whether `execute` has already run on this instance.
    pub fn is_spent(&self) -> bool {
        self.spent
    }

    /// Create, delete, and move change topology and never coalesce.
    pub fn is_structural(&self) -> bool {
        !matches!(self.mutation, Mutation::AttributeSet { .. })
    }

    /// The node this command acts on.
    pub fn target(&self) -> NodeId {
        match &self.mutation {
            Mutation::AttributeSet { node, .. }
            | Mutation::Create { node, .. }
            | Mutation::Delete { node, .. }
            | Mutation::Move { node, .. } => *node,
        }
    }

    /// Short human-readable label for history menus and logs.
    pub fn description(&self) -> String {
        match &self.mutation {
            Mutation::AttributeSet { node, values } => {
                let keys: Vec<&str> = values.keys().map(String::as_str).collect();
                format!("Set {} on {node}", keys.join(", "))
            }
            Mutation::Create { node, .. } => format!("Create {node}"),
            Mutation::Delete { node, .. } => format!("Delete {node}"),
            Mutation::Move { node, .. } => format!("Move {node}"),
        }
    }

    /// Apply the mutation and return its exact inverse.
    ///
    /// # Errors
    /// `UseAfterExecute` once a call has succeeded. Model errors (missing
    /// node, cycle) are reported before anything is mutated and leave the
    /// command unspent.
    pub fn execute(&mut self, graph: &mut SceneGraph) -> EditorResult<Command> {
        if self.spent {
            return Err(EditorError::UseAfterExecute(self.description()));
        }
        let inverse = self.apply(graph)?;
        self.spent = true;
        Ok(Command::new(inverse))
    }

    fn apply(&self, graph: &mut SceneGraph) -> EditorResult<Mutation> {
        let inverse = match &self.mutation {
            Mutation::AttributeSet { node, values } => {
                graph.require(*node)?;
                let mut previous = AttrBundle::new();
                for (key, value) in values {
                    let prev = graph.undo_state_set(*node, key, value.clone())?;
                    previous.insert(key.clone(), prev);
                }
                Mutation::AttributeSet {
                    node: *node,
                    values: previous,
                }
            }
            Mutation::Create {
                node,
                parent,
                index,
            } => {
                let child = graph.require(*node)?;
                let parent_idx = graph.require(*parent)?;
                let origin = origin_of(graph, child)?;
                let at = graph.attach(child, parent_idx, *index)?;
                match origin {
                    // Still linked inside a detached subtree: undo must put it back there.
                    Some((old_parent, old_index)) => {
                        log::warn!("create of linked {node}: inverse moves it back to {old_parent}");
                        Mutation::Move {
                            node: *node,
                            parent: old_parent,
                            from_index: at,
                            to_index: old_index,
                        }
                    }
                    None => Mutation::Delete {
                        node: *node,
                        parent: *parent,
                        index: at,
                    },
                }
            }
            Mutation::Delete {
                node,
                parent,
                index,
            } => {
                let child = graph.require(*node)?;
                let origin = origin_of(graph, child)?;
                graph.detach(child)?;
                match origin {
                    Some((actual_parent, actual_index)) => Mutation::Create {
                        node: *node,
                        parent: actual_parent,
                        index: actual_index,
                    },
                    None => {
                        log::warn!(
                            "delete of detached {node}: restoring to captured {parent}[{index}]"
                        );
                        Mutation::Create {
                            node: *node,
                            parent: *parent,
                            index: *index,
                        }
                    }
                }
            }
            Mutation::Move {
                node,
                parent,
                from_index,
                to_index,
            } => {
                let child = graph.require(*node)?;
                let parent_idx = graph.require(*parent)?;
                let origin = origin_of(graph, child)?;
                let at = graph.attach(child, parent_idx, *to_index)?;
                match origin {
                    Some((old_parent, old_index)) => Mutation::Move {
                        node: *node,
                        parent: old_parent,
                        from_index: at,
                        to_index: old_index,
                    },
                    None => {
                        log::warn!(
                            "move of detached {node}: inverse falls back to {parent}[{from_index}]"
                        );
                        Mutation::Move {
                            node: *node,
                            parent: *parent,
                            from_index: at,
                            to_index: *from_index,
                        }
                    }
                }
            }
        };
        Ok(inverse)
    }

    /// Try to absorb `incoming` into this (history) entry.
    ///
    /// Two attribute sets on the same node merge when every incoming key is
    /// already captured here or shares a coalescing group with a captured
    /// key. Captured values are never overwritten: the first value wins, so
    /// the merged entry still restores the state from before the gesture.
    /// Attribute sets on different nodes commute, so the scan continues past
    /// them. Anything structural is a barrier.
    pub fn attempt_coalesce(&mut self, incoming: &Command, groups: &CoalesceGroups) -> Coalesce {
        debug_assert!(!self.spent, "history entries are never spent");
        let (
            Mutation::AttributeSet { node, values },
            Mutation::AttributeSet {
                node: in_node,
                values: in_values,
            },
        ) = (&mut self.mutation, &incoming.mutation)
        else {
            return Coalesce::Stop;
        };

        if node != in_node {
            return Coalesce::Continue;
        }
        let absorbable = in_values.keys().all(|key| {
            values.contains_key(key) || values.keys().any(|held| groups.related(held, key))
        });
        if !absorbable {
            return Coalesce::Stop;
        }
        for (key, value) in in_values {
            values
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        Coalesce::Replace
    }
}

/// Current `(parent id, index)` of a node, or `None` if it has no parent.
fn origin_of(graph: &SceneGraph, child: NodeIndex) -> EditorResult<Option<(NodeId, usize)>> {
    match graph.location(child) {
        Some((parent, index)) => Ok(Some((graph.node(parent)?.id, index))),
        None => Ok(None),
    }
}
