//! Save / Load of scene-graph trees as nested records.
//!
//! A record is `{ typeTag, attributes, children }`, recursively. It is the
//! JSON-compatible shape handed to the persistence collaborator, and it is
//! also available as MessagePack for compact storage.
//!
//! Node IDs and transient (`_`-prefixed) attributes are runtime-only: Save
//! omits them and Load assigns fresh IDs. Load validates the whole record
//! tree (type tags, shape, typed attributes) before touching the graph, so a
//! failed load never leaves half a subtree behind.

use crate::attr::{Attributes, is_transient};
use crate::error::{ModelError, ModelResult};
use crate::kind::{NodeKind, TypeRegistry};
use crate::model::{SceneGraph, SceneNode};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TYPE_TAG: &str = "typeTag";
const ATTRIBUTES: &str = "attributes";
const CHILDREN: &str = "children";

/// Persisted form of one node and its subtree. Child order is render order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub type_tag: String,
    pub attributes: Attributes,
    pub children: Vec<NodeRecord>,
}

impl NodeRecord {
    pub fn new(kind: NodeKind, attributes: Attributes) -> Self {
        Self {
            type_tag: kind.type_tag().to_string(),
            attributes,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<NodeRecord>) -> Self {
        self.children = children;
        self
    }

    /// Read a record from an untyped JSON value, reporting the first missing
    /// or mistyped field with its path (e.g. `$.children[2].attributes`).
    pub fn from_value(value: &Value) -> ModelResult<Self> {
        Self::from_value_at(value, "$")
    }

    fn from_value_at(value: &Value, path: &str) -> ModelResult<Self> {
        let Value::Object(fields) = value else {
            return Err(ModelError::malformed(path, "expected an object"));
        };
        let type_tag = match fields.get(TYPE_TAG) {
            Some(Value::String(tag)) => tag.clone(),
            Some(_) => return Err(ModelError::malformed(path, "`typeTag` must be a string")),
            None => return Err(ModelError::malformed(path, "missing `typeTag`")),
        };
        let attributes = match fields.get(ATTRIBUTES) {
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(ModelError::malformed(path, "`attributes` must be an object"));
            }
            None => return Err(ModelError::malformed(path, "missing `attributes`")),
        };
        let children = match fields.get(CHILDREN) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, child)| Self::from_value_at(child, &format!("{path}.children[{i}]")))
                .collect::<ModelResult<Vec<_>>>()?,
            Some(_) => return Err(ModelError::malformed(path, "`children` must be an array")),
            None => return Err(ModelError::malformed(path, "missing `children`")),
        };
        Ok(Self {
            type_tag,
            attributes,
            children,
        })
    }

    pub fn from_json(text: &str) -> ModelResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_msgpack(&self) -> ModelResult<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> ModelResult<Self> {
        let value: Value = rmp_serde::from_slice(bytes)?;
        Self::from_value(&value)
    }

    /// Total number of records in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeRecord::node_count).sum::<usize>()
    }
}

// ─── Save ────────────────────────────────────────────────────────────────

/// Save the subtree rooted at `idx`.
pub fn save(graph: &SceneGraph, idx: NodeIndex) -> ModelResult<NodeRecord> {
    let node = graph.node(idx)?;
    let attributes = node
        .attributes
        .iter()
        .filter(|(key, _)| !is_transient(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let children = graph
        .children(idx)
        .iter()
        .map(|&child| save(graph, child))
        .collect::<ModelResult<Vec<_>>>()?;
    Ok(NodeRecord {
        type_tag: node.kind.type_tag().to_string(),
        attributes,
        children,
    })
}

/// Save the whole attached document.
pub fn save_document(graph: &SceneGraph) -> ModelResult<NodeRecord> {
    save(graph, graph.root)
}

// ─── Load ────────────────────────────────────────────────────────────────

/// A record whose tags and attributes have already been checked.
struct Resolved<'r> {
    kind: NodeKind,
    record: &'r NodeRecord,
    children: Vec<Resolved<'r>>,
}

fn resolve<'r>(
    registry: &TypeRegistry,
    record: &'r NodeRecord,
    path: &str,
    is_root: bool,
) -> ModelResult<Resolved<'r>> {
    let kind = registry.resolve(&record.type_tag)?;
    if kind == NodeKind::Document && !is_root {
        return Err(ModelError::malformed(
            path,
            "a document can only appear as the root record",
        ));
    }
    kind.validate(&record.attributes)?;
    let children = record
        .children
        .iter()
        .enumerate()
        .map(|(i, child)| resolve(registry, child, &format!("{path}.children[{i}]"), false))
        .collect::<ModelResult<Vec<_>>>()?;
    Ok(Resolved {
        kind,
        record,
        children,
    })
}

fn runtime_attributes(record: &NodeRecord) -> Attributes {
    record
        .attributes
        .iter()
        .filter(|(key, _)| !is_transient(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn build(graph: &mut SceneGraph, resolved: &Resolved<'_>) -> ModelResult<NodeIndex> {
    let node = SceneNode::with_attributes(resolved.kind, runtime_attributes(resolved.record));
    let idx = graph.add_detached(node)?;
    for child in &resolved.children {
        let child_idx = build(graph, child)?;
        let end = graph.children(idx).len();
        graph.attach(child_idx, idx, end)?;
    }
    Ok(idx)
}

/// Load a record as a new subtree that is not attached anywhere yet.
/// Used by paste/duplicate, which attach the result with a tracked create.
pub fn load_detached(
    graph: &mut SceneGraph,
    registry: &TypeRegistry,
    record: &NodeRecord,
) -> ModelResult<NodeIndex> {
    let resolved = resolve(registry, record, "$", false)?;
    build(graph, &resolved)
}

/// Load a record as the last child of `parent`. Untracked: no history entry.
pub fn load(
    graph: &mut SceneGraph,
    registry: &TypeRegistry,
    record: &NodeRecord,
    parent: NodeIndex,
) -> ModelResult<NodeIndex> {
    graph.node(parent)?;
    let idx = load_detached(graph, registry, record)?;
    let end = graph.children(parent).len();
    graph.attach(idx, parent, end)?;
    Ok(idx)
}

/// Load a whole document. The root record must be a `document`.
pub fn load_document(registry: &TypeRegistry, record: &NodeRecord) -> ModelResult<SceneGraph> {
    let resolved = resolve(registry, record, "$", true)?;
    if resolved.kind != NodeKind::Document {
        return Err(ModelError::malformed(
            "$",
            format!("root record must be a document, found `{}`", record.type_tag),
        ));
    }
    let mut graph = SceneGraph::with_root(SceneNode::with_attributes(
        NodeKind::Document,
        runtime_attributes(record),
    ));
    let root = graph.root;
    for child in &resolved.children {
        let child_idx = build(&mut graph, child)?;
        let end = graph.children(root).len();
        graph.attach(child_idx, root, end)?;
    }
    log::debug!(
        "loaded document with {} nodes",
        graph.attached_count()
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::keys;
    use serde_json::json;

    fn sample() -> SceneGraph {
        let mut sg = SceneGraph::new();
        let group = sg.add_node(sg.root, SceneNode::new(NodeKind::Group)).unwrap();
        let mut text = SceneNode::new(NodeKind::Text);
        text.attributes.insert(keys::TEXT.into(), json!("Sale"));
        text.attributes.insert("_viewKey".into(), json!(17));
        sg.add_node(group, text).unwrap();
        sg.add_node(group, SceneNode::new(NodeKind::Image)).unwrap();
        sg.add_node(sg.root, SceneNode::new(NodeKind::Line)).unwrap();
        sg
    }

    #[test]
    fn save_omits_transient_attributes() {
        let record = save_document(&sample()).unwrap();
        let text = &record.children[0].children[0];
        assert_eq!(text.type_tag, "text");
        assert_eq!(text.attributes[keys::TEXT], json!("Sale"));
        assert!(!text.attributes.contains_key("_viewKey"));
        assert_eq!(record.node_count(), 5);
    }

    #[test]
    fn load_preserves_order_and_assigns_fresh_ids() {
        let original = sample();
        let record = save_document(&original).unwrap();
        let loaded = load_document(&TypeRegistry::builtin(), &record).unwrap();

        assert_eq!(save_document(&loaded).unwrap(), record);
        for id in loaded.id_index.keys() {
            assert!(original.get_by_id(*id).is_none(), "{id} reused");
        }
    }

    #[test]
    fn unknown_type_fails_instead_of_skipping() {
        let record = NodeRecord::new(NodeKind::Document, Attributes::new()).with_children(vec![
            NodeRecord::new(NodeKind::Rect, Attributes::new()),
            NodeRecord {
                type_tag: "star".into(),
                attributes: Attributes::new(),
                children: vec![],
            },
        ]);
        let err = load_document(&TypeRegistry::builtin(), &record).unwrap_err();
        assert!(matches!(err, ModelError::UnknownType(ref t) if t == "star"));
    }

    #[test]
    fn missing_children_is_malformed() {
        let value = json!({
            "typeTag": "document",
            "attributes": {},
            "children": [{ "typeTag": "rect", "attributes": {} }]
        });
        let err = NodeRecord::from_value(&value).unwrap_err();
        match err {
            ModelError::MalformedRecord { path, reason } => {
                assert_eq!(path, "$.children[0]");
                assert!(reason.contains("children"));
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn missing_attributes_is_malformed() {
        let value = json!({ "typeTag": "document", "children": [] });
        assert!(matches!(
            NodeRecord::from_value(&value),
            Err(ModelError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn nested_document_is_malformed() {
        let record = NodeRecord::new(NodeKind::Document, Attributes::new())
            .with_children(vec![NodeRecord::new(NodeKind::Document, Attributes::new())]);
        let err = load_document(&TypeRegistry::builtin(), &record).unwrap_err();
        assert!(matches!(err, ModelError::MalformedRecord { ref path, .. } if path == "$.children[0]"));
    }

    #[test]
    fn root_must_be_document() {
        let record = NodeRecord::new(NodeKind::Rect, Attributes::new());
        assert!(matches!(
            load_document(&TypeRegistry::builtin(), &record),
            Err(ModelError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn failed_load_leaves_graph_untouched() {
        let mut sg = sample();
        let before = save_document(&sg).unwrap();
        let arena_before = sg.graph.node_count();

        let mut bad_attrs = Attributes::new();
        bad_attrs.insert(keys::SIZE.into(), json!("huge"));
        let record = NodeRecord::new(NodeKind::Group, Attributes::new())
            .with_children(vec![NodeRecord::new(NodeKind::Rect, bad_attrs)]);

        let root = sg.root;
        let err = load(&mut sg, &TypeRegistry::builtin(), &record, root).unwrap_err();
        assert!(matches!(err, ModelError::InvalidAttributes { kind: "rect", .. }));
        assert_eq!(sg.graph.node_count(), arena_before);
        assert_eq!(save_document(&sg).unwrap(), before);
    }

    #[test]
    fn msgpack_matches_json_shape() {
        let record = save_document(&sample()).unwrap();
        let bytes = record.to_msgpack().unwrap();
        assert_eq!(NodeRecord::from_msgpack(&bytes).unwrap(), record);
    }
}
