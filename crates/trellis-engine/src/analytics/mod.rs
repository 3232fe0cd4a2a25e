//! Graph analytics
//!
//! Every algorithm here is query-driven: neighbor sets come from depth-1
//! traversals through the engine, so no copy of the graph is held beyond
//! the per-algorithm working state.

mod centrality;
mod cliques;
mod clustering;
mod community;
mod components;
mod cycles;
mod pagerank;

pub use cycles::Cycle;
pub use pagerank::PageRankConfig;

use crate::engine::GraphEngine;
use std::collections::HashSet;
use trellis_core::{Conditions, Direction, Edge, NodeId, Pagination, Result, TraversalQuery};

/// Analytics over a [`GraphEngine`]
pub struct GraphAnalytics<'a> {
    engine: &'a GraphEngine,
}

impl GraphEngine {
    pub fn analytics(&self) -> GraphAnalytics<'_> {
        GraphAnalytics::new(self)
    }
}

impl<'a> GraphAnalytics<'a> {
    pub fn new(engine: &'a GraphEngine) -> Self {
        Self { engine }
    }

    /// Every node id, in storage order
    async fn node_ids(&self) -> Result<Vec<NodeId>> {
        Ok(self
            .engine
            .query_nodes(&Conditions::new(), Pagination::all())
            .await?
            .into_iter()
            .map(|n| n.id)
            .collect())
    }

    /// Edges examined by a depth-1 traversal from `node`
    async fn incident_edges(&self, node: &NodeId, direction: Direction) -> Result<Vec<Edge>> {
        let query = TraversalQuery::new(*node)
            .with_depth(1)
            .with_direction(direction);
        Ok(self.engine.traverse(&query).await?.edges)
    }

    /// Distinct neighbors of `node` in the undirected view, excluding itself,
    /// in discovery order
    async fn undirected_neighbors(&self, node: &NodeId) -> Result<Vec<NodeId>> {
        let mut seen = HashSet::new();
        let mut neighbors = Vec::new();
        for edge in self.incident_edges(node, Direction::Both).await? {
            if let Some(other) = edge.other_end(node) {
                if other != *node && seen.insert(other) {
                    neighbors.push(other);
                }
            }
        }
        Ok(neighbors)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::engine::GraphEngine;
    use std::sync::Arc;
    use trellis_core::{NewEdge, NewNode, NodeId};
    use trellis_storage::MemoryStorage;

    /// Build a graph from labels and `(from, to)` index pairs
    pub async fn graph(labels: &[&str], edges: &[(usize, usize)]) -> (GraphEngine, Vec<NodeId>) {
        let engine = GraphEngine::new(Arc::new(MemoryStorage::new()));
        let mut ids = Vec::new();
        for label in labels {
            ids.push(engine.create_node(NewNode::new("n", *label)).await.unwrap().id);
        }
        for (from, to) in edges {
            engine
                .create_edge(NewEdge::new(ids[*from], ids[*to], "link"))
                .await
                .unwrap();
        }
        (engine, ids)
    }
}
