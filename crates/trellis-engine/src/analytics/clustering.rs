use super::GraphAnalytics;
use std::collections::HashSet;
use trellis_core::{NodeId, Result};

impl GraphAnalytics<'_> {
    /// Local clustering coefficient: the fraction of neighbor pairs that are
    /// themselves connected. Zero with fewer than two neighbors.
    pub async fn clustering_coefficient(&self, node: &NodeId) -> Result<f64> {
        let neighbors = self.undirected_neighbors(node).await?;
        let k = neighbors.len();
        if k < 2 {
            return Ok(0.0);
        }

        let mut links = 0usize;
        for (i, u) in neighbors.iter().enumerate() {
            let adjacent: HashSet<NodeId> =
                self.undirected_neighbors(u).await?.into_iter().collect();
            links += neighbors[i + 1..]
                .iter()
                .filter(|v| adjacent.contains(v))
                .count();
        }

        let possible = k * (k - 1) / 2;
        Ok(links as f64 / possible as f64)
    }
}
