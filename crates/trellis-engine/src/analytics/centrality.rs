use super::GraphAnalytics;
use trellis_core::{Direction, NodeId, Result};

impl GraphAnalytics<'_> {
    /// Number of edges incident to `node`, in either direction
    pub async fn degree_centrality(&self, node: &NodeId) -> Result<usize> {
        Ok(self.incident_edges(node, Direction::Both).await?.len())
    }

    /// Degree of every node, highest first; equal degrees keep storage order
    pub async fn degree_centralities(&self) -> Result<Vec<(NodeId, usize)>> {
        let mut degrees = Vec::new();
        for id in self.node_ids().await? {
            let degree = self.degree_centrality(&id).await?;
            degrees.push((id, degree));
        }
        degrees.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(degrees)
    }
}

#[cfg(test)]
mod tests {
    use crate::analytics::test_support::graph;

    #[tokio::test]
    async fn test_degree_centrality() {
        // hub with three spokes, one of them pointing inward
        let (engine, ids) = graph(&["hub", "a", "b", "c"], &[(0, 1), (0, 2), (3, 0)]).await;
        let analytics = engine.analytics();

        assert_eq!(analytics.degree_centrality(&ids[0]).await.unwrap(), 3);
        assert_eq!(analytics.degree_centrality(&ids[1]).await.unwrap(), 1);

        let ranked = analytics.degree_centralities().await.unwrap();
        assert_eq!(ranked[0], (ids[0], 3));
        assert_eq!(ranked.len(), 4);
    }
}
