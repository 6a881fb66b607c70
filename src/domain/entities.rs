//! Domain entities: core data structures

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Store-assigned identifier of a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RootId(pub u64);

/// Store-assigned identifier of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named parameter tree, e.g. "geo". The name is the external selector key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    pub id: RootId,
    pub name: String,
}

/// One module inside a root's tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Free-form type tag, returned alongside the name in selections
    #[serde(rename = "type")]
    pub kind: String,
    /// 1-based depth; level 1 nodes hang directly off the root
    pub level: u32,
    pub root_id: RootId,
    pub parent_id: Option<NodeId>,
}

/// Raw node description as it arrives from a caller.
///
/// Only `name` is always required; see [`crate::domain::builder::validate_specs`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub parent_name: Option<String>,
}

impl NodeSpec {
    /// Level 1 spec without a type tag.
    pub fn top(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: Some(1),
            ..Default::default()
        }
    }

    pub fn child(
        name: impl Into<String>,
        kind: impl Into<String>,
        level: u32,
        parent: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind.into()),
            level: Some(level),
            parent_name: Some(parent.into()),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Where a draft node attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    /// Level 1 node, no parent
    None,
    /// Node already in storage
    Existing(NodeId),
    /// Earlier draft of the same batch, by position
    Batch(usize),
}

/// A validated node waiting for the store to assign its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDraft {
    pub name: String,
    pub kind: String,
    pub level: u32,
    pub parent: ParentRef,
}

/// One `{name: type}` element of a flattened path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub name: String,
    pub kind: String,
}

impl PathEntry {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

impl From<&Node> for PathEntry {
    fn from(node: &Node) -> Self {
        Self::new(node.name.clone(), node.kind.clone())
    }
}

// Serialized as a single-key object so groups read `[{"US": "geo"}, {"push": "format"}]`.
impl Serialize for PathEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.kind)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for PathEntry {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        let map = std::collections::BTreeMap::<String, String>::deserialize(deserializer)?;
        let mut entries = map.into_iter();
        match (entries.next(), entries.next()) {
            (Some((name, kind)), None) => Ok(PathEntry { name, kind }),
            _ => Err(D::Error::custom("path entry must have exactly one key")),
        }
    }
}

/// Ordered sequence of entries from an entry node down to a leaf.
pub type FlatPath = Vec<PathEntry>;

/// Result of a selector query: one randomly walked path per matched root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub selection_id: Uuid,
    pub groups: Vec<FlatPath>,
}

/// Full subtree of one level 1 node, flattened in pre-order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumeratedGroup {
    pub root: String,
    pub entry: String,
    pub path: FlatPath,
}

/// Every path of every tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enumeration {
    pub selection_id: Uuid,
    pub groups: Vec<EnumeratedGroup>,
}

impl Enumeration {
    /// Total number of flattened entries across all groups.
    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|g| g.path.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_path_entry_when_serialized_then_single_key_object() {
        let entry = PathEntry::new("US", "geo");
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"US":"geo"}"#);

        let back: PathEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn given_multi_key_object_when_deserializing_path_entry_then_errors() {
        let result: Result<PathEntry, _> = serde_json::from_str(r#"{"a":"x","b":"y"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn given_spec_json_when_deserializing_then_reads_camel_case_fields() {
        let spec: NodeSpec =
            serde_json::from_str(r#"{"name":"push","type":"format","level":2,"parentName":"US"}"#)
                .unwrap();
        assert_eq!(spec, NodeSpec::child("push", "format", 2, "US"));
    }
}
