//! Traversal and path-finding query/result types

use crate::edge::{Direction, Edge};
use crate::node::{Node, NodeId};
use serde::{Deserialize, Serialize};

/// Number of visited entities at which neighborhood relevance saturates
pub const RELEVANCE_SATURATION: usize = 10;

/// Neighborhood expansion query builder (follows SearchQuery pattern)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalQuery {
    /// Starting node
    pub start: NodeId,

    /// Maximum hop count from the start
    #[serde(default = "default_depth")]
    pub max_depth: u32,

    /// Which edges to follow
    #[serde(default)]
    pub direction: Direction,

    /// Follow only these edge types (empty = all types)
    #[serde(default)]
    pub edge_types: Vec<String>,

    /// Expand each node at most once
    #[serde(default = "default_true")]
    pub visit_once: bool,
}

fn default_depth() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

impl TraversalQuery {
    /// Create a new traversal query starting from a node
    pub fn new(start: NodeId) -> Self {
        Self {
            start,
            max_depth: default_depth(),
            direction: Direction::Both,
            edge_types: Vec::new(),
            visit_once: true,
        }
    }

    /// Set maximum traversal depth
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set traversal direction
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Follow only the given edge types
    pub fn filter_edge_types(mut self, types: Vec<String>) -> Self {
        self.edge_types = types;
        self
    }

    /// Allow nodes to be expanded again through different paths.
    ///
    /// Termination then relies on `max_depth` and the engine's node guard.
    pub fn allow_revisits(mut self) -> Self {
        self.visit_once = false;
        self
    }

    pub fn allows_edge_type(&self, edge_type: &str) -> bool {
        self.edge_types.is_empty() || self.edge_types.iter().any(|t| t == edge_type)
    }
}

/// Result of a neighborhood expansion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraversalResult {
    /// Every visited node, in discovery order
    pub nodes: Vec<Node>,

    /// Every edge followed from an expanded node
    pub edges: Vec<Edge>,

    /// Statistics
    pub stats: TraversalStats,

    /// Advisory relevance in [0, 1]; grows with the visited entity count
    pub relevance: f64,
}

impl TraversalResult {
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == *id)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }
}

/// Saturating relevance of a result with `visited` entities
pub fn neighborhood_relevance(visited: usize) -> f64 {
    (visited as f64 / RELEVANCE_SATURATION as f64).min(1.0)
}

/// Traversal statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraversalStats {
    pub nodes_visited: usize,
    pub edges_traversed: usize,
    pub max_depth_reached: u32,
    /// Stopped early because the node guard was hit
    pub truncated: bool,
}

/// Options for shortest-path search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathQuery {
    /// Follow only these edge types (empty = all types)
    #[serde(default)]
    pub edge_types: Vec<String>,

    /// Give up beyond this many hops (None = unbounded)
    #[serde(default)]
    pub max_depth: Option<u32>,
}

impl PathQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_edge_types(mut self, types: Vec<String>) -> Self {
        self.edge_types = types;
        self
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn allows_edge_type(&self, edge_type: &str) -> bool {
        self.edge_types.is_empty() || self.edge_types.iter().any(|t| t == edge_type)
    }
}

/// A single path through the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPath {
    /// Nodes from start to target
    pub nodes: Vec<Node>,

    /// Edges connecting consecutive nodes
    pub edges: Vec<Edge>,

    /// Path length (number of edges)
    pub length: usize,
}

impl GraphPath {
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }
}
