//! Node kinds and the registry that maps them to stable serialized names.

use crate::attr::{
    Attributes, CircleProps, DocumentProps, GroupProps, ImageProps, LineProps, RectProps,
    TextProps, from_attributes, to_attributes,
};
use crate::error::{ModelError, ModelResult};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;

/// The closed set of node kinds a document can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root of the document (the canvas).
    Document,
    /// Container with its own transform.
    Group,
    Rect,
    /// Circle / ellipse, bounded by its size box.
    Circle,
    Text,
    Image,
    Line,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Document,
        NodeKind::Group,
        NodeKind::Rect,
        NodeKind::Circle,
        NodeKind::Text,
        NodeKind::Image,
        NodeKind::Line,
    ];

    /// The canonical serialized name of this kind.
    pub const fn type_tag(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Group => "group",
            NodeKind::Rect => "rect",
            NodeKind::Circle => "circle",
            NodeKind::Text => "text",
            NodeKind::Image => "image",
            NodeKind::Line => "line",
        }
    }

    /// Attributes of a freshly constructed node of this kind.
    pub fn default_attributes(self) -> Attributes {
        match self {
            NodeKind::Document => to_attributes(&DocumentProps::default()),
            NodeKind::Group => to_attributes(&GroupProps::default()),
            NodeKind::Rect => to_attributes(&RectProps::default()),
            NodeKind::Circle => to_attributes(&CircleProps::default()),
            NodeKind::Text => to_attributes(&TextProps::default()),
            NodeKind::Image => to_attributes(&ImageProps::default()),
            NodeKind::Line => to_attributes(&LineProps::default()),
        }
    }

    /// Check that `attributes` fit this kind's typed record.
    ///
    /// Missing keys fall back to defaults and unknown keys are ignored;
    /// a known key holding a value of the wrong shape is rejected.
    pub fn validate(self, attributes: &Attributes) -> ModelResult<()> {
        match self {
            NodeKind::Document => check::<DocumentProps>(self, attributes),
            NodeKind::Group => check::<GroupProps>(self, attributes),
            NodeKind::Rect => check::<RectProps>(self, attributes),
            NodeKind::Circle => check::<CircleProps>(self, attributes),
            NodeKind::Text => check::<TextProps>(self, attributes),
            NodeKind::Image => check::<ImageProps>(self, attributes),
            NodeKind::Line => check::<LineProps>(self, attributes),
        }
    }
}

fn check<T: DeserializeOwned>(kind: NodeKind, attributes: &Attributes) -> ModelResult<()> {
    from_attributes::<T>(attributes)
        .map(|_| ())
        .map_err(|source| ModelError::InvalidAttributes {
            kind: kind.type_tag(),
            source,
        })
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

// ─── Registry ────────────────────────────────────────────────────────────

/// Bidirectional mapping between node kinds and serialized type tags.
///
/// Every kind is registered under its canonical tag. Extra aliases can be
/// added so older documents still load; saving always writes the canonical
/// tag, so aliases disappear after one save/load cycle.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    by_name: HashMap<String, NodeKind>,
}

impl TypeRegistry {
    /// A registry holding every built-in kind under its canonical tag.
    pub fn builtin() -> Self {
        let by_name = NodeKind::ALL
            .iter()
            .map(|kind| (kind.type_tag().to_string(), *kind))
            .collect();
        Self { by_name }
    }

    /// Accept `alias` as another name for `kind` when loading.
    /// Returns the kind the alias previously pointed to, if any.
    ///
    /// # Errors
    /// `ReservedTag` if `alias` is a canonical tag: remapping it would make
    /// saved nodes of that kind reload as something else.
    pub fn register_alias(
        &mut self,
        alias: impl Into<String>,
        kind: NodeKind,
    ) -> ModelResult<Option<NodeKind>> {
        let alias = alias.into();
        if NodeKind::ALL.iter().any(|k| k.type_tag() == alias) {
            return Err(ModelError::ReservedTag(alias));
        }
        Ok(self.by_name.insert(alias, kind))
    }

    /// Resolve a serialized tag to its kind.
    pub fn resolve(&self, type_tag: &str) -> ModelResult<NodeKind> {
        self.by_name
            .get(type_tag)
            .copied()
            .ok_or_else(|| ModelError::UnknownType(type_tag.to_string()))
    }

    /// The tag written when saving a node of `kind`.
    pub fn name_of(&self, kind: NodeKind) -> &'static str {
        kind.type_tag()
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.by_name.contains_key(type_tag)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
