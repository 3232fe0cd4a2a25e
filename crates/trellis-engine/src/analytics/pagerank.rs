//! PageRank over the outgoing-edge view

use super::GraphAnalytics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trellis_core::{Direction, EngineConfig, NodeId, Result};

/// PageRank configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRankConfig {
    /// Damping factor (usually 0.85)
    pub damping: f64,
    /// Number of iterations
    pub iterations: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            iterations: 20,
        }
    }
}

impl From<&EngineConfig> for PageRankConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            damping: config.pagerank_damping,
            iterations: config.pagerank_iterations,
        }
    }
}

impl GraphAnalytics<'_> {
    /// Fixed-iteration PageRank.
    ///
    /// Ranks start at 1/N. Nodes without outgoing edges spread their rank
    /// evenly over all nodes, so the ranks always sum to 1. In- and
    /// out-edges are re-queried every iteration. Results are in storage order.
    pub async fn page_rank(&self, config: PageRankConfig) -> Result<Vec<(NodeId, f64)>> {
        let ids = self.node_ids().await?;
        let n = ids.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let index: HashMap<NodeId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let d = config.damping;
        let nf = n as f64;
        let mut scores = vec![1.0 / nf; n];
        let mut next_scores = vec![0.0; n];

        for _ in 0..config.iterations {
            // Parallel edges each count toward the out-degree
            let mut out_degree = Vec::with_capacity(n);
            for id in &ids {
                out_degree.push(self.incident_edges(id, Direction::Outgoing).await?.len());
            }
            let dangling: f64 = (0..n)
                .filter(|&i| out_degree[i] == 0)
                .map(|i| scores[i])
                .sum();

            for (target, id) in ids.iter().enumerate() {
                let mut inflow = 0.0;
                for edge in self.incident_edges(id, Direction::Incoming).await? {
                    if let Some(&source) = index.get(&edge.from_node_id) {
                        inflow += scores[source] / out_degree[source].max(1) as f64;
                    }
                }
                next_scores[target] = (1.0 - d) / nf + d * (inflow + dangling / nf);
            }

            std::mem::swap(&mut scores, &mut next_scores);
        }

        tracing::debug!("PageRank over {} nodes, {} iterations", n, config.iterations);
        Ok(ids.into_iter().zip(scores).collect())
    }
}
