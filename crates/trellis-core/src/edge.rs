//! Edge types and operations

use crate::node::{default_confidence, NodeId, Properties};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use ulid::Ulid;

/// Unique identifier for an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub Ulid);

impl EdgeId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    pub fn from_string(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EdgeId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

/// Direction for graph traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "out")]
    Outgoing,
    #[serde(alias = "in")]
    Incoming,
    #[default]
    Both,
}

impl Direction {
    pub fn includes_outgoing(self) -> bool {
        matches!(self, Self::Outgoing | Self::Both)
    }

    pub fn includes_incoming(self) -> bool {
        matches!(self, Self::Incoming | Self::Both)
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "out" | "outgoing" => Ok(Self::Outgoing),
            "in" | "incoming" => Ok(Self::Incoming),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// A directed, typed edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier
    pub id: EdgeId,

    /// Relationship type (e.g. "works_at")
    #[serde(rename = "type")]
    pub edge_type: String,

    /// Source node
    pub from_node_id: NodeId,

    /// Target node
    pub to_node_id: NodeId,

    /// Arbitrary properties
    #[serde(default)]
    pub properties: Properties,

    /// Confidence score (0.0-1.0)
    pub confidence: f64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Ingestion sessions that contributed to this edge
    #[serde(default)]
    pub source_session_ids: BTreeSet<String>,
}

impl Edge {
    /// Build an edge from a creation request, assigning a fresh id
    pub fn from_new(new: &NewEdge) -> Self {
        Self {
            id: EdgeId::new(),
            edge_type: new.edge_type.clone(),
            from_node_id: new.from_node_id,
            to_node_id: new.to_node_id,
            properties: new.properties.clone(),
            confidence: new.confidence,
            created_at: Utc::now(),
            source_session_ids: new.source_session_ids.clone(),
        }
    }

    /// The endpoint opposite to `node`, or `None` if `node` is not an endpoint
    pub fn other_end(&self, node: &NodeId) -> Option<NodeId> {
        if self.from_node_id == *node {
            Some(self.to_node_id)
        } else if self.to_node_id == *node {
            Some(self.from_node_id)
        } else {
            None
        }
    }
}

/// Data for creating a new edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEdge {
    #[serde(rename = "type")]
    pub edge_type: String,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub source_session_ids: BTreeSet<String>,
    /// Also insert the reverse edge
    #[serde(default)]
    pub bidirectional: bool,
}

impl NewEdge {
    pub fn new(from: NodeId, to: NodeId, edge_type: impl Into<String>) -> Self {
        Self {
            edge_type: edge_type.into(),
            from_node_id: from,
            to_node_id: to,
            properties: Properties::new(),
            confidence: default_confidence(),
            source_session_ids: BTreeSet::new(),
            bidirectional: false,
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

    pub fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }

    /// The same request with endpoints swapped. Never bidirectional itself.
    pub fn reversed(&self) -> Self {
        Self {
            from_node_id: self.to_node_id,
            to_node_id: self.from_node_id,
            bidirectional: false,
            ..self.clone()
        }
    }
}

/// Partial update for an existing edge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeUpdate {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl EdgeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edge_type(mut self, edge_type: impl Into<String>) -> Self {
        self.edge_type = Some(edge_type.into());
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

    /// Apply this update to `edge`; returns true when the type changed
    pub fn apply(self, edge: &mut Edge, merge_properties: bool) -> bool {
        let mut type_changed = false;
        if let Some(edge_type) = self.edge_type {
            if edge_type != edge.edge_type {
                edge.edge_type = edge_type;
                type_changed = true;
            }
        }
        if let Some(properties) = self.properties {
            if merge_properties {
                edge.properties.extend(properties);
            } else {
                edge.properties = properties;
            }
        }
        if let Some(confidence) = self.confidence {
            edge.confidence = confidence;
        }
        if let Some(session_id) = self.session_id {
            edge.source_session_ids.insert(session_id);
        }
        type_changed
    }
}
