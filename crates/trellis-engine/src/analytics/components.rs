use super::GraphAnalytics;
use std::collections::{HashSet, VecDeque};
use trellis_core::{NodeId, Result};

impl GraphAnalytics<'_> {
    /// Partition all nodes into weakly connected components.
    ///
    /// Components appear in the storage order of their first node; members
    /// appear in BFS order.
    pub async fn connected_components(&self) -> Result<Vec<Vec<NodeId>>> {
        let mut assigned: HashSet<NodeId> = HashSet::new();
        let mut components = Vec::new();

        for root in self.node_ids().await? {
            if !assigned.insert(root) {
                continue;
            }
            let mut component = vec![root];
            let mut queue = VecDeque::from([root]);
            while let Some(current) = queue.pop_front() {
                for neighbor in self.undirected_neighbors(&current).await? {
                    if assigned.insert(neighbor) {
                        component.push(neighbor);
                        queue.push_back(neighbor);
                    }
                }
            }
            components.push(component);
        }

        tracing::debug!("Found {} connected components", components.len());
        Ok(components)
    }
}

#[cfg(test)]
mod tests {
    use crate::analytics::test_support::graph;

    #[tokio::test]
    async fn test_components_ignore_direction() {
        let (engine, ids) = graph(&["a", "b", "c", "d", "e"], &[(1, 0), (1, 2), (3, 4)]).await;
        let components = engine.analytics().connected_components().await.unwrap();

        assert_eq!(components.len(), 2);
        assert_eq!(components[0], vec![ids[0], ids[1], ids[2]]);
        assert_eq!(components[1], vec![ids[3], ids[4]]);
    }

    #[tokio::test]
    async fn test_isolated_nodes_are_singletons() {
        let (engine, _) = graph(&["a", "b"], &[]).await;
        let components = engine.analytics().connected_components().await.unwrap();
        assert_eq!(components.len(), 2);
        assert!(components.iter().all(|c| c.len() == 1));
    }
}
