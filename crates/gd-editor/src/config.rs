//! History configuration.

use crate::error::{EditorError, EditorResult};
use gd_core::keys;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

/// Default maximum number of undo steps.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// A set of attribute keys that one continuous gesture typically edits together.
pub type KeyGroup = SmallVec<[String; 4]>;

/// Attribute key groups whose edits on the same node coalesce into one
/// history entry (e.g. a resize drag perturbs both `size` and `position`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoalesceGroups(Vec<KeyGroup>);

impl CoalesceGroups {
    pub fn new(groups: impl IntoIterator<Item = KeyGroup>) -> Self {
        Self(groups.into_iter().collect())
    }

    /// No groups: only repeated writes to the same key coalesce.
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// Whether edits to `a` and `b` belong to the same gesture.
    /// A key is always related to itself.
    pub fn related(&self, a: &str, b: &str) -> bool {
        a == b
            || self
                .0
                .iter()
                .any(|group| group.iter().any(|k| k == a) && group.iter().any(|k| k == b))
    }

    pub fn groups(&self) -> &[KeyGroup] {
        &self.0
    }
}

impl Default for CoalesceGroups {
    fn default() -> Self {
        Self(vec![
            smallvec![
                keys::POSITION.to_string(),
                keys::SIZE.to_string(),
                keys::ANGLE.to_string(),
            ],
            smallvec![keys::START.to_string(), keys::END.to_string()],
        ])
    }
}

/// Configuration for [`HistoryEngine`](crate::history::HistoryEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Undo depth cap; the oldest entry is evicted first. `None` = unbounded.
    /// Default: **100**.
    pub max_depth: Option<usize>,

    /// Key groups that coalesce. Default: `{position, size, angle}` and
    /// `{start, end}`.
    pub coalesce_groups: CoalesceGroups,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
            coalesce_groups: CoalesceGroups::default(),
        }
    }
}

impl HistoryConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> EditorResult<Self> {
        serde_json::from_str(text).map_err(EditorError::Config)
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_groups(mut self, groups: CoalesceGroups) -> Self {
        self.coalesce_groups = groups;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_groups_relate_geometry_keys() {
        let groups = CoalesceGroups::default();
        assert!(groups.related("size", "position"));
        assert!(groups.related("angle", "size"));
        assert!(groups.related("start", "end"));
        assert!(groups.related("style", "style"));
        assert!(!groups.related("style", "size"));
        assert!(!groups.related("start", "position"));
    }

    #[test]
    fn from_json_fills_defaults() {
        let config = HistoryConfig::from_json(r#"{ "maxDepth": 5 }"#).unwrap();
        assert_eq!(config.max_depth, Some(5));
        assert_eq!(config.coalesce_groups, CoalesceGroups::default());

        let config = HistoryConfig::from_json(
            r#"{ "maxDepth": null, "coalesceGroups": [["text", "font"]] }"#,
        )
        .unwrap();
        assert_eq!(config.max_depth, None);
        assert!(config.coalesce_groups.related("font", "text"));
        assert!(!config.coalesce_groups.related("size", "position"));
    }

    #[test]
    fn from_json_rejects_bad_shapes() {
        let err = HistoryConfig::from_json(r#"{ "maxDepth": "lots" }"#).unwrap_err();
        assert!(matches!(err, EditorError::Config(_)));
    }
}
