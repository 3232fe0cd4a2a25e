//! Node types and operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use ulid::Ulid;

/// Open property map carried by nodes and edges
pub type Properties = HashMap<String, serde_json::Value>;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Ulid);

impl NodeId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    pub fn from_string(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

/// A node in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier, never reassigned
    pub id: NodeId,

    /// Caller-defined type tag
    #[serde(rename = "type")]
    pub node_type: String,

    /// Human-readable label (not unique)
    pub label: String,

    /// Arbitrary properties
    #[serde(default)]
    pub properties: Properties,

    /// Confidence score (0.0-1.0)
    pub confidence: f64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Ingestion sessions that contributed to this node
    #[serde(default)]
    pub source_session_ids: BTreeSet<String>,
}

impl Node {
    /// Build a node from a creation request, assigning a fresh id
    pub fn from_new(new: NewNode) -> Self {
        let now = Utc::now();
        Self {
            id: NodeId::new(),
            node_type: new.node_type,
            label: new.label,
            properties: new.properties,
            confidence: new.confidence,
            created_at: now,
            updated_at: now,
            source_session_ids: new.source_session_ids,
        }
    }
}

/// Data for creating a new node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNode {
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub source_session_ids: BTreeSet<String>,
}

pub(crate) fn default_confidence() -> f64 {
    1.0
}

impl NewNode {
    pub fn new(node_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            label: label.into(),
            properties: Properties::new(),
            confidence: default_confidence(),
            source_session_ids: BTreeSet::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.source_session_ids.insert(session_id.into());
        self
    }
}

/// Partial update for an existing node
///
/// `None` fields are left untouched. Whether `properties` is merged over
/// or replaces the stored map is decided by the caller of the update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Apply this update to `node`.
    ///
    /// Returns `(label_or_properties_changed, type_changed)` so the index
    /// maintainer knows which rows to regenerate.
    pub fn apply(self, node: &mut Node, merge_properties: bool) -> (bool, bool) {
        let mut text_changed = false;
        let mut type_changed = false;

        if let Some(node_type) = self.node_type {
            if node_type != node.node_type {
                node.node_type = node_type;
                type_changed = true;
            }
        }
        if let Some(label) = self.label {
            if label != node.label {
                node.label = label;
                text_changed = true;
            }
        }
        if let Some(properties) = self.properties {
            let merged = if merge_properties {
                let mut merged = node.properties.clone();
                merged.extend(properties);
                merged
            } else {
                properties
            };
            if merged != node.properties {
                node.properties = merged;
                text_changed = true;
            }
        }
        if let Some(confidence) = self.confidence {
            node.confidence = confidence;
        }
        if let Some(session_id) = self.session_id {
            node.source_session_ids.insert(session_id);
        }
        node.updated_at = Utc::now();

        (text_changed, type_changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_creation() {
        let node = Node::from_new(
            NewNode::new("person", "Ada Lovelace")
                .with_property("born", 1815)
                .with_session("s1"),
        );

        assert_eq!(node.node_type, "person");
        assert_eq!(node.label, "Ada Lovelace");
        assert_eq!(node.confidence, 1.0);
        assert_eq!(node.properties.get("born"), Some(&json!(1815)));
        assert!(node.source_session_ids.contains("s1"));
        assert_eq!(node.created_at, node.updated_at);
    }

    #[test]
    fn test_merge_update_keeps_existing_properties() {
        let mut node = Node::from_new(
            NewNode::new("person", "Ada")
                .with_property("a", 1)
                .with_property("b", 2),
        );

        let (text_changed, type_changed) = NodeUpdate::new()
            .property("b", 3)
            .property("c", 4)
            .apply(&mut node, true);

        assert!(text_changed);
        assert!(!type_changed);
        assert_eq!(node.properties.len(), 3);
        assert_eq!(node.properties["a"], json!(1));
        assert_eq!(node.properties["b"], json!(3));
    }

    #[test]
    fn test_replace_update_drops_missing_properties() {
        let mut node = Node::from_new(NewNode::new("person", "Ada").with_property("a", 1));

        NodeUpdate::new().property("z", "zed").apply(&mut node, false);

        assert_eq!(node.properties.len(), 1);
        assert!(!node.properties.contains_key("a"));
    }

    #[test]
    fn test_confidence_only_update_does_not_touch_text() {
        let mut node = Node::from_new(NewNode::new("person", "Ada"));
        let (text_changed, type_changed) = NodeUpdate::new()
            .confidence(0.4)
            .node_type("mathematician")
            .apply(&mut node, true);

        assert!(!text_changed);
        assert!(type_changed);
        assert_eq!(node.confidence, 0.4);
    }

    #[test]
    fn test_node_id_roundtrip() {
        let id = NodeId::new();
        let parsed: NodeId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-ulid".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_node_serializes_type_field() {
        let node = Node::from_new(NewNode::new("city", "Paris"));
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], json!("city"));
        let back: Node = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }
}
