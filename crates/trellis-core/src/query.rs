//! Query types for filtering and searching the graph

use crate::edge::Edge;
use crate::error::{Error, Result};
use crate::node::Node;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Filterable node fields
pub const NODE_FIELDS: &[&str] = &["id", "type", "label", "confidence"];

/// Filterable edge fields
pub const EDGE_FIELDS: &[&str] = &["id", "type", "from_node_id", "to_node_id", "confidence"];

/// Entity kind a set of conditions is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Edge,
}

impl EntityKind {
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::Node => NODE_FIELDS,
            Self::Edge => EDGE_FIELDS,
        }
    }
}

/// Conjunctive equality filter: every `field = value` pair must hold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(pub BTreeMap<String, Value>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Reject unknown fields and non-scalar values
    pub fn validate(&self, kind: EntityKind) -> Result<()> {
        for (field, value) in &self.0 {
            if !kind.fields().contains(&field.as_str()) {
                return Err(Error::Validation(format!(
                    "Unknown {:?} field in conditions: {}",
                    kind, field
                )));
            }
            match (field.as_str(), value) {
                ("confidence", Value::Number(_)) => {}
                ("confidence", _) => {
                    return Err(Error::Validation(
                        "Condition on confidence must be a number".to_string(),
                    ))
                }
                (_, Value::String(_)) => {}
                (f, _) => {
                    return Err(Error::Validation(format!(
                        "Condition on {} must be a string",
                        f
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn matches_node(&self, node: &Node) -> bool {
        self.0.iter().all(|(field, value)| match field.as_str() {
            "id" => value.as_str() == Some(node.id.to_string().as_str()),
            "type" => value.as_str() == Some(node.node_type.as_str()),
            "label" => value.as_str() == Some(node.label.as_str()),
            "confidence" => value.as_f64() == Some(node.confidence),
            _ => false,
        })
    }

    pub fn matches_edge(&self, edge: &Edge) -> bool {
        self.0.iter().all(|(field, value)| match field.as_str() {
            "id" => value.as_str() == Some(edge.id.to_string().as_str()),
            "type" => value.as_str() == Some(edge.edge_type.as_str()),
            "from_node_id" => value.as_str() == Some(edge.from_node_id.to_string().as_str()),
            "to_node_id" => value.as_str() == Some(edge.to_node_id.to_string().as_str()),
            "confidence" => value.as_f64() == Some(edge.confidence),
            _ => false,
        })
    }
}

/// Limit/offset window over a result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of rows (None = unbounded)
    #[serde(default)]
    pub limit: Option<usize>,

    /// Rows to skip
    #[serde(default)]
    pub offset: usize,
}

impl Pagination {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// No limit, no offset
    pub fn all() -> Self {
        Self::default()
    }

    /// Apply the window to an iterator
    pub fn apply<T>(&self, items: impl Iterator<Item = T>) -> Vec<T> {
        let items = items.skip(self.offset);
        match self.limit {
            Some(limit) => items.take(limit).collect(),
            None => items.collect(),
        }
    }
}

/// Term-scored search request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free text; split into lowercase terms
    pub text: String,

    /// Maximum hits returned (before the type filter)
    #[serde(default = "default_search_limit")]
    pub limit: usize,

    /// Hits scoring below this are dropped
    #[serde(default)]
    pub min_score: Option<f64>,

    /// Keep only these node types (empty = all), applied after the limit
    #[serde(default)]
    pub node_types: Vec<String>,
}

pub(crate) fn default_search_limit() -> usize {
    20
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: default_search_limit(),
            min_score: None,
            node_types: Vec::new(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_types.push(node_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NewNode;
    use serde_json::json;

    #[test]
    fn test_conditions_validate() {
        assert!(Conditions::new().eq("type", "person").validate(EntityKind::Node).is_ok());
        assert!(Conditions::new().eq("from_node_id", "x").validate(EntityKind::Node).is_err());
        assert!(Conditions::new().eq("from_node_id", "x").validate(EntityKind::Edge).is_ok());
        assert!(Conditions::new().eq("label", json!([1])).validate(EntityKind::Node).is_err());
        assert!(Conditions::new().eq("confidence", "high").validate(EntityKind::Node).is_err());
    }

    #[test]
    fn test_conditions_match_node() {
        let node = Node::from_new(NewNode::new("person", "Ada").with_confidence(0.5));
        assert!(Conditions::new().matches_node(&node));
        assert!(Conditions::new()
            .eq("type", "person")
            .eq("label", "Ada")
            .eq("confidence", 0.5)
            .matches_node(&node));
        assert!(!Conditions::new()
            .eq("type", "person")
            .eq("label", "Bob")
            .matches_node(&node));
        assert!(Conditions::new().eq("id", node.id.to_string()).matches_node(&node));
    }

    #[test]
    fn test_pagination_apply() {
        let window = Pagination::new(2, 1);
        assert_eq!(window.apply(1..=5), vec![2, 3]);
        assert_eq!(Pagination::all().apply(1..=3), vec![1, 2, 3]);
        assert!(Pagination::new(5, 10).apply(1..=3).is_empty());
    }

    #[test]
    fn test_search_query_builder() {
        let query = SearchQuery::new("rust graph")
            .with_limit(5)
            .with_min_score(1.5)
            .with_node_type("crate");

        assert_eq!(query.text, "rust graph");
        assert_eq!(query.limit, 5);
        assert_eq!(query.min_score, Some(1.5));
        assert_eq!(query.node_types, vec!["crate".to_string()]);
    }
}
