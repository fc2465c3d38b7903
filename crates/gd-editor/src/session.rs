//! Editing session: one document, its type registry, and its history.
//!
//! All tracked edits go through here. Each edit is checked against the
//! node's kind before anything is mutated, turned into a [`Command`], and run
//! through [`HistoryEngine::execute`] so the inverse lands on the undo stack.

use crate::binding::AttributeBinding;
use crate::commands::{AttrBundle, Command};
use crate::config::HistoryConfig;
use crate::error::{EditorError, EditorResult};
use crate::history::HistoryEngine;
use gd_core::attr::deep_eq_opt;
use gd_core::{
    ModelError, NodeId, NodeIndex, NodeKind, NodeRecord, SceneGraph, SceneNode, TypeRegistry,
    load_detached, load_document, save, save_document,
};
use serde_json::Value;

#[derive(Debug)]
pub struct Session {
    pub graph: SceneGraph,
    pub history: HistoryEngine,
    pub registry: TypeRegistry,
}

impl Session {
    /// An empty document with the built-in node types.
    pub fn new(config: HistoryConfig) -> Self {
        Self::with_graph(SceneGraph::new(), TypeRegistry::builtin(), config)
    }

    pub fn with_graph(graph: SceneGraph, registry: TypeRegistry, config: HistoryConfig) -> Self {
        Self {
            graph,
            history: HistoryEngine::new(config),
            registry,
        }
    }

    /// Open a saved document. Loading is untracked: history starts empty.
    pub fn load(
        record: &NodeRecord,
        registry: TypeRegistry,
        config: HistoryConfig,
    ) -> EditorResult<Self> {
        let graph = load_document(&registry, record)?;
        log::debug!("session opened with {} nodes", graph.attached_count());
        Ok(Self::with_graph(graph, registry, config))
    }

    pub fn from_json(text: &str, config: HistoryConfig) -> EditorResult<Self> {
        let record = NodeRecord::from_json(text)?;
        Self::load(&record, TypeRegistry::builtin(), config)
    }

    pub fn save(&self) -> EditorResult<NodeRecord> {
        Ok(save_document(&self.graph)?)
    }

    pub fn to_json(&self) -> EditorResult<String> {
        Ok(self.save()?.to_json()?)
    }

    pub fn root_id(&self) -> NodeId {
        self.graph.root_id()
    }

    /// A handle for reading, writing, and observing one attribute.
    pub fn bind(&self, node: NodeId, key: impl Into<String>) -> AttributeBinding {
        AttributeBinding::new(node, key)
    }

    pub fn get(&self, node: NodeId, key: &str) -> Option<&Value> {
        self.graph.get(node, key)
    }

    // ─── Attribute edits ─────────────────────────────────────────────────

    /// Tracked write of one attribute. Returns `false` if the value was
    /// already deep-equal and nothing happened.
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        key: impl Into<String>,
        value: Value,
    ) -> EditorResult<bool> {
        self.set_attributes(node, AttrBundle::from([(key.into(), Some(value))]))
    }

    /// Tracked removal of one attribute.
    pub fn unset_attribute(&mut self, node: NodeId, key: impl Into<String>) -> EditorResult<bool> {
        self.set_attributes(node, AttrBundle::from([(key.into(), None)]))
    }

    /// Tracked write of several attributes of one node as a single command.
    ///
    /// Keys whose new value is deep-equal to the current one are dropped; if
    /// none remain, nothing is recorded or notified. Nodes that are not part
    /// of the document yet (prepared for a create, or removed by a delete)
    /// are written raw, without a history entry.
    pub fn set_attributes(&mut self, node: NodeId, values: AttrBundle) -> EditorResult<bool> {
        let idx = self.graph.require(node)?;
        let current = self.graph.node(idx)?;

        let changes: AttrBundle = values
            .into_iter()
            .filter(|(key, value)| !deep_eq_opt(current.get(key), value.as_ref()))
            .collect();
        if changes.is_empty() {
            return Ok(false);
        }

        let mut candidate = current.attributes.clone();
        for (key, value) in &changes {
            match value {
                Some(v) => candidate.insert(key.clone(), v.clone()),
                None => candidate.remove(key),
            };
        }
        current.kind.validate(&candidate)?;

        if !self.graph.is_attached(idx) {
            log::debug!("untracked write to detached {node}");
            for (key, value) in changes {
                self.graph.undo_state_set(node, &key, value)?;
            }
            return Ok(true);
        }

        self.history
            .execute(&mut self.graph, Command::attribute_bundle(node, changes))?;
        Ok(true)
    }

    // ─── Structural edits ────────────────────────────────────────────────

    /// Put a new node into the document arena without attaching it.
    /// Its attributes can still be edited untracked before [`Session::insert`].
    pub fn prepare(&mut self, node: SceneNode) -> EditorResult<NodeId> {
        if node.kind == NodeKind::Document {
            return Err(EditorError::InvalidKind(node.kind));
        }
        node.kind.validate(&node.attributes)?;
        let id = node.id;
        self.graph.add_detached(node)?;
        Ok(id)
    }

    /// Tracked attach of a prepared (or previously deleted) node.
    ///
    /// The node must have no parent at all. A node that still sits inside a
    /// deleted subtree is rejected; restore the subtree with undo instead.
    pub fn insert(&mut self, node: NodeId, parent: NodeId, index: usize) -> EditorResult<()> {
        let idx = self.graph.require(node)?;
        if idx == self.graph.root || self.graph.location(idx).is_some() {
            return Err(EditorError::AlreadyPlaced(node));
        }
        self.require_attached(parent)?;
        self.history
            .execute(&mut self.graph, Command::create(node, parent, index))?;
        Ok(())
    }

    /// Tracked create: add `node` under `parent` at `index` (clamped).
    pub fn create_node(
        &mut self,
        parent: NodeId,
        index: usize,
        node: SceneNode,
    ) -> EditorResult<NodeId> {
        self.require_attached(parent)?;
        let id = self.prepare(node)?;
        self.insert(id, parent, index)?;
        Ok(id)
    }

    /// Tracked delete. The node stays in the arena so undo can restore it.
    pub fn delete_node(&mut self, node: NodeId) -> EditorResult<()> {
        let (parent, index) = self.attached_location(node)?;
        self.history
            .execute(&mut self.graph, Command::delete(node, parent, index))?;
        Ok(())
    }

    /// Tracked move of `node` into `parent` at `index` (clamped).
    pub fn move_node(&mut self, node: NodeId, parent: NodeId, index: usize) -> EditorResult<()> {
        let (_, from_index) = self.attached_location(node)?;
        self.require_attached(parent)?;
        self.history
            .execute(&mut self.graph, Command::move_node(node, parent, from_index, index))?;
        Ok(())
    }

    // ─── Clipboard ───────────────────────────────────────────────────────

    /// Snapshot a subtree for the clipboard. Transient keys are dropped.
    pub fn copy(&self, node: NodeId) -> EditorResult<NodeRecord> {
        let idx = self.graph.require(node)?;
        Ok(save(&self.graph, idx)?)
    }

    /// Insert clipboard records under `parent` starting at `index`.
    ///
    /// Every record is validated before anything is inserted. Each pasted
    /// subtree gets fresh IDs and is attached by exactly one create, so one
    /// undo per record removes it again. Returns the new top-level IDs.
    pub fn paste(
        &mut self,
        parent: NodeId,
        index: usize,
        records: &[NodeRecord],
    ) -> EditorResult<Vec<NodeId>> {
        self.require_attached(parent)?;
        let built = records
            .iter()
            .map(|record| self.load_clip(record))
            .collect::<EditorResult<Vec<_>>>()?;
        for (offset, &id) in built.iter().enumerate() {
            self.history.execute(
                &mut self.graph,
                Command::create(id, parent, index.saturating_add(offset)),
            )?;
        }
        log::debug!("pasted {} subtrees under {parent}", built.len());
        Ok(built)
    }

    /// Copy `node` and paste the copy right after it.
    pub fn duplicate(&mut self, node: NodeId) -> EditorResult<NodeId> {
        let (parent, index) = self.attached_location(node)?;
        let record = self.copy(node)?;
        let copy = self.load_clip(&record)?;
        self.history
            .execute(&mut self.graph, Command::create(copy, parent, index + 1))?;
        Ok(copy)
    }

    /// Build a clipboard record as a detached subtree with fresh IDs.
    fn load_clip(&mut self, record: &NodeRecord) -> EditorResult<NodeId> {
        let idx = load_detached(&mut self.graph, &self.registry, record)?;
        Ok(self.graph.node(idx)?.id)
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> EditorResult<bool> {
        self.history.undo(&mut self.graph)
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        self.history.redo(&mut self.graph)
    }

    /// End the current gesture so the next edit gets its own undo step.
    pub fn seal(&mut self) {
        self.history.seal();
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    fn require_attached(&self, node: NodeId) -> EditorResult<NodeIndex> {
        let idx = self.graph.require(node)?;
        if !self.graph.is_attached(idx) {
            return Err(EditorError::NotAttached(node));
        }
        Ok(idx)
    }

    fn attached_location(&self, node: NodeId) -> EditorResult<(NodeId, usize)> {
        let idx = self.require_attached(node)?;
        if idx == self.graph.root {
            return Err(ModelError::RootImmutable.into());
        }
        let (parent, index) = self
            .graph
            .location(idx)
            .ok_or(EditorError::NotAttached(node))?;
        Ok((self.graph.node(parent)?.id, index))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}
