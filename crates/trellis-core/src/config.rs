//! Engine configuration

use crate::limits::{MAX_BATCH_SIZE, MAX_TRAVERSAL_DEPTH};
use serde::{Deserialize, Serialize};

/// Tunables for the graph engine
///
/// Every field has a default, so a partial TOML/JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Depth used when a caller does not give one
    pub default_traversal_depth: u32,

    /// Deepest traversal accepted
    pub max_traversal_depth: u32,

    /// Node expansions after which a revisiting traversal stops and is marked truncated
    pub max_traversal_nodes: usize,

    /// Largest batch accepted by the batch coordinator
    pub max_batch_size: usize,

    /// Search limit used when a caller does not give one
    pub default_search_limit: usize,

    /// PageRank damping factor
    pub pagerank_damping: f64,

    /// PageRank iteration count
    pub pagerank_iterations: usize,

    /// Label propagation round cap
    pub community_max_iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_traversal_depth: 2,
            max_traversal_depth: MAX_TRAVERSAL_DEPTH,
            max_traversal_nodes: 10_000,
            max_batch_size: MAX_BATCH_SIZE,
            default_search_limit: crate::query::default_search_limit(),
            pagerank_damping: 0.85,
            pagerank_iterations: 20,
            community_max_iterations: 10,
        }
    }
}
