//! Secondary index rows and key construction
//!
//! Index keys are plain strings: `type:<T>` classifies nodes and edges by
//! type, `from:<nodeId>:<edgeType>` and `to:<nodeId>:<edgeType>` form the
//! adjacency index. Node and edge ids are ULIDs, so they never contain `:`
//! and a `from:<nodeId>:` prefix selects every outgoing edge of a node.

use crate::edge::Edge;
use crate::node::Node;
use serde::{Deserialize, Serialize};

/// Which entity table an index row points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexFamily {
    Node,
    Edge,
}

impl IndexFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Edge => "edge",
        }
    }
}

/// A classification row `(index_key, entity_id)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    pub family: IndexFamily,
    pub index_key: String,
    pub entity_id: String,
}

impl IndexEntry {
    pub fn node(index_key: impl Into<String>, entity_id: impl ToString) -> Self {
        Self {
            family: IndexFamily::Node,
            index_key: index_key.into(),
            entity_id: entity_id.to_string(),
        }
    }

    pub fn edge(index_key: impl Into<String>, entity_id: impl ToString) -> Self {
        Self {
            family: IndexFamily::Edge,
            index_key: index_key.into(),
            entity_id: entity_id.to_string(),
        }
    }
}

/// A full-text row `(term, node_id, field, weight)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndexEntry {
    pub term: String,
    pub node_id: String,
    pub field: String,
    pub weight: f64,
}

/// Default weight of a single term occurrence
pub const DEFAULT_TERM_WEIGHT: f64 = 1.0;

/// Search field name used for node labels
pub const LABEL_FIELD: &str = "label";

pub fn type_key(entity_type: &str) -> String {
    format!("type:{}", entity_type)
}

pub fn from_key(node_id: &str, edge_type: &str) -> String {
    format!("from:{}:{}", node_id, edge_type)
}

pub fn to_key(node_id: &str, edge_type: &str) -> String {
    format!("to:{}:{}", node_id, edge_type)
}

/// Prefix matching every outgoing adjacency row of a node
pub fn from_prefix(node_id: &str) -> String {
    format!("from:{}:", node_id)
}

/// Prefix matching every incoming adjacency row of a node
pub fn to_prefix(node_id: &str) -> String {
    format!("to:{}:", node_id)
}

/// Lowercase, whitespace-delimited terms of `text`
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(|t| t.to_lowercase()).collect()
}

/// Type row for a node
pub fn node_index_entries(node: &Node) -> Vec<IndexEntry> {
    vec![IndexEntry::node(type_key(&node.node_type), node.id)]
}

/// Adjacency and type rows for an edge
pub fn edge_index_entries(edge: &Edge) -> Vec<IndexEntry> {
    let from = edge.from_node_id.to_string();
    let to = edge.to_node_id.to_string();
    vec![
        IndexEntry::edge(from_key(&from, &edge.edge_type), edge.id),
        IndexEntry::edge(to_key(&to, &edge.edge_type), edge.id),
        IndexEntry::edge(type_key(&edge.edge_type), edge.id),
    ]
}

/// Search rows for a node's label and string-valued properties.
///
/// Repeated terms within a field collapse into one row whose weight is the
/// sum of the occurrences. Property keys are visited in sorted order so the
/// output is stable.
pub fn search_entries(node: &Node) -> Vec<SearchIndexEntry> {
    let node_id = node.id.to_string();
    let mut entries: Vec<SearchIndexEntry> = Vec::new();

    let mut push_field = |field: &str, text: &str| {
        for term in tokenize(text) {
            if let Some(existing) = entries
                .iter_mut()
                .find(|e| e.field == field && e.term == term)
            {
                existing.weight += DEFAULT_TERM_WEIGHT;
            } else {
                entries.push(SearchIndexEntry {
                    term,
                    node_id: node_id.clone(),
                    field: field.to_string(),
                    weight: DEFAULT_TERM_WEIGHT,
                });
            }
        }
    };

    push_field(LABEL_FIELD, &node.label);

    let mut keys: Vec<&String> = node.properties.keys().collect();
    keys.sort();
    for key in keys {
        if let Some(text) = node.properties[key].as_str() {
            push_field(key.as_str(), text);
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::NewEdge;
    use crate::node::{NewNode, NodeId};

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("  Hello   World\tAgain "), vec!["hello", "world", "again"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_edge_index_entries() {
        let a = NodeId::new();
        let b = NodeId::new();
        let edge = Edge::from_new(&NewEdge::new(a, b, "knows"));
        let keys: Vec<String> = edge_index_entries(&edge)
            .into_iter()
            .map(|e| e.index_key)
            .collect();

        assert_eq!(
            keys,
            vec![
                format!("from:{}:knows", a),
                format!("to:{}:knows", b),
                "type:knows".to_string(),
            ]
        );
        assert!(keys[0].starts_with(&from_prefix(&a.to_string())));
    }

    #[test]
    fn test_search_entries_skip_non_string_properties() {
        let node = Node::from_new(
            NewNode::new("person", "Grace Hopper")
                .with_property("role", "rear admiral")
                .with_property("born", 1906),
        );
        let entries = search_entries(&node);

        let terms: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.field.as_str(), e.term.as_str()))
            .collect();
        assert_eq!(
            terms,
            vec![
                ("label", "grace"),
                ("label", "hopper"),
                ("role", "rear"),
                ("role", "admiral"),
            ]
        );
    }

    #[test]
    fn test_search_entries_accumulate_repeated_terms() {
        let node = Node::from_new(NewNode::new("song", "la la land"));
        let entries = search_entries(&node);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].term, "la");
        assert_eq!(entries[0].weight, 2.0);
        assert_eq!(entries[1].weight, 1.0);
    }
}
