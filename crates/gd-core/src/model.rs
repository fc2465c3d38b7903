//! Core scene-graph data model for graphics documents.
//!
//! The document is a tree stored in an arena: a `StableDiGraph` holds every
//! node ever created in this document, with edges going parent → child.
//! Child order (render / z-order) is kept explicitly per parent, since graph
//! edges carry no order. Nodes removed by a delete are only *detached*: they
//! keep their arena slot and index so a later redo can reattach them.

use crate::attr::{Attributes, deep_eq_opt, from_attributes};
use crate::binding::Bindings;
use crate::error::{ModelError, ModelResult};
use crate::id::NodeId;
use crate::kind::NodeKind;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

// ─── Scene Graph Nodes ───────────────────────────────────────────────────

/// A single node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Runtime identifier, unique within the document.
    pub id: NodeId,

    /// What kind of element this is.
    pub kind: NodeKind,

    /// Attribute values, validated against the kind's typed record.
    pub attributes: Attributes,
}

impl SceneNode {
    /// A new node of `kind` with a fresh ID and default attributes.
    pub fn new(kind: NodeKind) -> Self {
        Self::with_attributes(kind, kind.default_attributes())
    }

    /// A new node of `kind` with a fresh ID and the given attributes.
    pub fn with_attributes(kind: NodeKind, attributes: Attributes) -> Self {
        Self {
            id: NodeId::fresh(kind.type_tag()),
            kind,
            attributes,
        }
    }

    /// Read one attribute. No side effects.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Decode the attributes as the typed record `T`.
    pub fn props<T: DeserializeOwned>(&self) -> ModelResult<T> {
        from_attributes(&self.attributes).map_err(|source| ModelError::InvalidAttributes {
            kind: self.kind.type_tag(),
            source,
        })
    }
}

// ─── Scene Graph ─────────────────────────────────────────────────────────

/// A complete document: one `Document` root and all of its descendants,
/// plus any detached nodes still referenced by history.
#[derive(Debug)]
pub struct SceneGraph {
    /// Node arena. Edges go parent → child.
    pub graph: StableDiGraph<SceneNode, ()>,

    /// The document root.
    pub root: NodeIndex,

    /// Index from NodeId → NodeIndex for fast lookup.
    pub id_index: HashMap<NodeId, NodeIndex>,

    /// View subscriptions notified by raw attribute writes.
    pub bindings: Bindings,

    /// Ordered children per parent. Absent means no children.
    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,
}

impl SceneGraph {
    /// Create an empty document with default root attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(SceneNode::new(NodeKind::Document))
    }

    /// Create an empty document around an existing root node.
    pub fn with_root(root_node: SceneNode) -> Self {
        let mut graph = StableDiGraph::new();
        let id = root_node.id;
        let root = graph.add_node(root_node);

        let mut id_index = HashMap::new();
        id_index.insert(id, root);

        Self {
            graph,
            root,
            id_index,
            bindings: Bindings::new(),
            child_order: HashMap::new(),
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.graph[self.root].id
    }

    // ─── Untracked construction ──────────────────────────────────────────

    /// Put a node into the arena without attaching it anywhere.
    pub fn add_detached(&mut self, node: SceneNode) -> ModelResult<NodeIndex> {
        if self.id_index.contains_key(&node.id) {
            return Err(ModelError::DuplicateId(node.id));
        }
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        Ok(idx)
    }

    /// Add a node as the last child of `parent`. Returns the new node's index.
    pub fn add_node(&mut self, parent: NodeIndex, node: SceneNode) -> ModelResult<NodeIndex> {
        let len = self.children(parent).len();
        self.insert_node(parent, len, node)
    }

    /// Add a node as a child of `parent` at `index` (clamped).
    pub fn insert_node(
        &mut self,
        parent: NodeIndex,
        index: usize,
        node: SceneNode,
    ) -> ModelResult<NodeIndex> {
        self.node(parent)?;
        let idx = self.add_detached(node)?;
        self.attach(idx, parent, index)?;
        Ok(idx)
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    /// Look up a node by its ID.
    pub fn get_by_id(&self, id: NodeId) -> Option<&SceneNode> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    /// Look up a node mutably by its ID. Writes through this reference
    /// bypass both history and subscriptions.
    pub fn get_by_id_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    /// Get the index for a NodeId.
    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    /// Like [`index_of`](Self::index_of), failing with `NodeNotFound`.
    pub fn require(&self, id: NodeId) -> ModelResult<NodeIndex> {
        self.index_of(id).ok_or(ModelError::NodeNotFound(id))
    }

    pub fn node(&self, idx: NodeIndex) -> ModelResult<&SceneNode> {
        self.graph
            .node_weight(idx)
            .ok_or(ModelError::StaleIndex(idx))
    }

    /// Read one attribute of a node.
    pub fn get(&self, id: NodeId, key: &str) -> Option<&Value> {
        self.get_by_id(id).and_then(|n| n.get(key))
    }

    // ─── Topology ────────────────────────────────────────────────────────

    /// Get the parent index of a node, if it is attached.
    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
    }

    /// Children of a node in render order (first = back-most).
    pub fn children(&self, idx: NodeIndex) -> &[NodeIndex] {
        self.child_order.get(&idx).map_or(&[], Vec::as_slice)
    }

    /// Current `(parent, index)` of a node, or `None` if detached.
    pub fn location(&self, idx: NodeIndex) -> Option<(NodeIndex, usize)> {
        let parent = self.parent(idx)?;
        let pos = self.children(parent).iter().position(|&c| c == idx)?;
        Some((parent, pos))
    }

    /// Whether a node is reachable from the document root.
    pub fn is_attached(&self, idx: NodeIndex) -> bool {
        let mut current = idx;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    /// Check if `ancestor` is a parent/grandparent/etc. of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: NodeIndex, descendant: NodeIndex) -> bool {
        let mut current = descendant;
        while let Some(parent) = self.parent(current) {
            if parent == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Attach `child` under `parent` at `index`, clamped to `[0, len]`.
    ///
    /// A child that is currently attached elsewhere is detached first, so this
    /// is also the move primitive. Attaching a node exactly where it already is
    /// leaves the tree unchanged. Returns the index actually used.
    pub fn attach(&mut self, child: NodeIndex, parent: NodeIndex, index: usize) -> ModelResult<usize> {
        if child == self.root {
            return Err(ModelError::RootImmutable);
        }
        let child_id = self.node(child)?.id;
        let parent_id = self.node(parent)?.id;
        if child == parent || self.is_ancestor_of(child, parent) {
            return Err(ModelError::CycleDetected {
                node: child_id,
                parent: parent_id,
            });
        }

        self.unlink(child);
        let siblings = self.child_order.entry(parent).or_default();
        let at = index.min(siblings.len());
        siblings.insert(at, child);
        self.graph.add_edge(parent, child, ());
        Ok(at)
    }

    /// Detach a node from its parent, keeping it (and its subtree) in the arena.
    /// Returns where it was, or `None` if it was already detached.
    pub fn detach(&mut self, child: NodeIndex) -> ModelResult<Option<(NodeIndex, usize)>> {
        if child == self.root {
            return Err(ModelError::RootImmutable);
        }
        self.node(child)?;
        Ok(self.unlink(child))
    }

    fn unlink(&mut self, child: NodeIndex) -> Option<(NodeIndex, usize)> {
        let (parent, pos) = self.location(child)?;
        if let Some(siblings) = self.child_order.get_mut(&parent) {
            siblings.remove(pos);
            if siblings.is_empty() {
                self.child_order.remove(&parent);
            }
        }
        if let Some(edge) = self.graph.find_edge(parent, child) {
            self.graph.remove_edge(edge);
        }
        Some((parent, pos))
    }

    // ─── Attribute writes ────────────────────────────────────────────────

    /// Raw attribute write: update the map and notify subscribers, without
    /// recording history. `None` removes the key (subscribers get `null`).
    ///
    /// This is the only write path command replay uses. Returns the previous
    /// value. Writing a value deep-equal to the current one is a no-op.
    pub fn undo_state_set(
        &mut self,
        id: NodeId,
        key: &str,
        value: Option<Value>,
    ) -> ModelResult<Option<Value>> {
        let node = self.get_by_id_mut(id).ok_or(ModelError::NodeNotFound(id))?;
        if deep_eq_opt(node.attributes.get(key), value.as_ref()) {
            return Ok(node.attributes.get(key).cloned());
        }
        let previous = match &value {
            Some(v) => node.attributes.insert(key.to_string(), v.clone()),
            None => node.attributes.remove(key),
        };
        self.bindings
            .notify(id, key, value.as_ref().unwrap_or(&Value::Null));
        Ok(previous)
    }

    // ─── Traversal ───────────────────────────────────────────────────────

    /// Depth-first, render-order walk of the attached tree starting at the root.
    pub fn walk(&self) -> Walk<'_> {
        self.walk_from(self.root)
    }

    /// Depth-first, render-order walk of the subtree rooted at `start`.
    pub fn walk_from(&self, start: NodeIndex) -> Walk<'_> {
        Walk {
            graph: self,
            stack: vec![(start, 0)],
        }
    }

    /// Number of nodes reachable from the root (including it).
    pub fn attached_count(&self) -> usize {
        self.walk().count()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`SceneGraph::walk`]. Yields `(depth, index, node)`.
pub struct Walk<'a> {
    graph: &'a SceneGraph,
    stack: Vec<(NodeIndex, usize)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, NodeIndex, &'a SceneNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (idx, depth) = self.stack.pop()?;
        let node = self.graph.graph.node_weight(idx)?;
        for &child in self.graph.children(idx).iter().rev() {
            self.stack.push((child, depth + 1));
        }
        Some((depth, idx, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{Vec2, keys, value_of};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn rect(name: &str) -> SceneNode {
        let mut node = SceneNode::new(NodeKind::Rect);
        node.id = NodeId::intern(name);
        node
    }

    #[test]
    fn scene_graph_basics() {
        let mut sg = SceneGraph::new();
        let idx = sg.add_node(sg.root, rect("box1")).unwrap();

        assert!(sg.get_by_id(NodeId::intern("box1")).is_some());
        assert_eq!(sg.children(sg.root), &[idx]);
        assert_eq!(sg.parent(idx), Some(sg.root));
        assert_eq!(sg.location(idx), Some((sg.root, 0)));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut sg = SceneGraph::new();
        sg.add_node(sg.root, rect("dup")).unwrap();
        let err = sg.add_node(sg.root, rect("dup")).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateId(_)));
    }

    #[test]
    fn insert_clamps_index() {
        let mut sg = SceneGraph::new();
        let a = sg.add_node(sg.root, rect("clamp_a")).unwrap();
        let b = sg.insert_node(sg.root, 99, rect("clamp_b")).unwrap();
        let c = sg.insert_node(sg.root, 0, rect("clamp_c")).unwrap();
        assert_eq!(sg.children(sg.root), &[c, a, b]);
    }

    #[test]
    fn detach_keeps_node_in_arena() {
        let mut sg = SceneGraph::new();
        let group = sg.add_node(sg.root, SceneNode::new(NodeKind::Group)).unwrap();
        let leaf = sg.add_node(group, rect("kept")).unwrap();

        assert_eq!(sg.detach(group).unwrap(), Some((sg.root, 0)));
        assert!(!sg.is_attached(group));
        assert!(!sg.is_attached(leaf));
        assert!(sg.get_by_id(NodeId::intern("kept")).is_some());
        // Subtree stays intact while detached.
        assert_eq!(sg.children(group), &[leaf]);
        assert_eq!(sg.detach(group).unwrap(), None);

        sg.attach(group, sg.root, 0).unwrap();
        assert!(sg.is_attached(leaf));
    }

    #[test]
    fn attach_rejects_cycles_and_root() {
        let mut sg = SceneGraph::new();
        let outer = sg.add_node(sg.root, SceneNode::new(NodeKind::Group)).unwrap();
        let inner = sg.add_node(outer, SceneNode::new(NodeKind::Group)).unwrap();

        assert!(matches!(
            sg.attach(outer, inner, 0),
            Err(ModelError::CycleDetected { .. })
        ));
        assert!(matches!(sg.attach(outer, outer, 0), Err(ModelError::CycleDetected { .. })));
        assert!(matches!(sg.attach(sg.root, outer, 0), Err(ModelError::RootImmutable)));
        assert!(matches!(sg.detach(sg.root), Err(ModelError::RootImmutable)));
    }

    #[test]
    fn attach_in_place_is_idempotent() {
        let mut sg = SceneGraph::new();
        let a = sg.add_node(sg.root, rect("idem_a")).unwrap();
        let b = sg.add_node(sg.root, rect("idem_b")).unwrap();
        assert_eq!(sg.attach(a, sg.root, 0).unwrap(), 0);
        assert_eq!(sg.children(sg.root), &[a, b]);
        assert_eq!(sg.graph.edge_count(), 2);
    }

    #[test]
    fn raw_write_notifies_and_returns_previous() {
        let mut sg = SceneGraph::new();
        sg.add_node(sg.root, rect("raw")).unwrap();
        let id = NodeId::intern("raw");

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        sg.bindings
            .subscribe(id, keys::ANGLE, move |v| sink.borrow_mut().push(v.clone()));

        let prev = sg.undo_state_set(id, keys::ANGLE, Some(json!(30))).unwrap();
        assert_eq!(prev, Some(json!(0.0)));
        let prev = sg.undo_state_set(id, keys::ANGLE, None).unwrap();
        assert_eq!(prev, Some(json!(30)));
        assert!(sg.get(id, keys::ANGLE).is_none());

        assert_eq!(*seen.borrow(), vec![json!(30), Value::Null]);
    }

    #[test]
    fn raw_write_on_unbound_slot_updates_map_only() {
        let mut sg = SceneGraph::new();
        sg.add_node(sg.root, rect("quiet")).unwrap();
        let id = NodeId::intern("quiet");
        let pos = value_of(&Vec2::new(0.5, 0.5));
        sg.undo_state_set(id, keys::POSITION, Some(pos.clone())).unwrap();
        assert_eq!(sg.get(id, keys::POSITION), Some(&pos));
    }

    #[test]
    fn walk_is_depth_first_in_render_order() {
        let mut sg = SceneGraph::new();
        let group = sg.add_node(sg.root, SceneNode::new(NodeKind::Group)).unwrap();
        let a = sg.add_node(group, rect("walk_a")).unwrap();
        let b = sg.add_node(sg.root, rect("walk_b")).unwrap();
        let c = sg.insert_node(group, 0, rect("walk_c")).unwrap();

        let order: Vec<(usize, NodeIndex)> = sg.walk().map(|(d, idx, _)| (d, idx)).collect();
        assert_eq!(
            order,
            vec![(0, sg.root), (1, group), (2, c), (2, a), (1, b)]
        );
        assert_eq!(sg.attached_count(), 5);
    }

    #[test]
    fn typed_props_read_back() {
        let sg = SceneGraph::new();
        let doc: crate::attr::DocumentProps = sg.graph[sg.root].props().unwrap();
        assert_eq!(doc.size.width, 1920.0);
    }
}
