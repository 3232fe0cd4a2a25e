//! Community detection by synchronous label propagation

use super::GraphAnalytics;
use std::collections::HashMap;
use trellis_core::{Direction, NodeId, Result};

impl GraphAnalytics<'_> {
    /// Group nodes into communities.
    ///
    /// Every node starts in its own community. Each round, all nodes adopt at
    /// once the most frequent label among their neighbors; ties go to the
    /// label met first. Stops when a round changes nothing or after
    /// `max_iterations` rounds (the configured cap when `None`).
    pub async fn detect_communities(
        &self,
        max_iterations: Option<usize>,
    ) -> Result<Vec<Vec<NodeId>>> {
        let max_iterations =
            max_iterations.unwrap_or(self.engine.config().community_max_iterations);
        let ids = self.node_ids().await?;
        let index: HashMap<NodeId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut labels: Vec<usize> = (0..ids.len()).collect();
        let mut rounds = 0;
        while rounds < max_iterations {
            rounds += 1;
            let mut next = Vec::with_capacity(ids.len());
            for (i, id) in ids.iter().enumerate() {
                let neighbors = self.neighbor_indexes(id, &index).await?;
                next.push(most_frequent(&neighbors, &labels).unwrap_or(labels[i]));
            }
            if next == labels {
                break;
            }
            labels = next;
        }

        let mut order: Vec<usize> = Vec::new();
        let mut groups: HashMap<usize, Vec<NodeId>> = HashMap::new();
        for (i, label) in labels.iter().enumerate() {
            groups
                .entry(*label)
                .or_insert_with(|| {
                    order.push(*label);
                    Vec::new()
                })
                .push(ids[i]);
        }

        tracing::debug!("Label propagation settled after {} rounds", rounds);
        Ok(order
            .into_iter()
            .filter_map(|label| groups.remove(&label))
            .collect())
    }

    /// Neighbor positions with multiplicity, one entry per incident edge
    async fn neighbor_indexes(
        &self,
        id: &NodeId,
        index: &HashMap<NodeId, usize>,
    ) -> Result<Vec<usize>> {
        Ok(self
            .incident_edges(id, Direction::Both)
            .await?
            .iter()
            .filter_map(|edge| edge.other_end(id))
            .filter(|other| other != id)
            .filter_map(|other| index.get(&other).copied())
            .collect())
    }
}

/// Most frequent neighbor label; ties go to the label seen first
fn most_frequent(neighbors: &[usize], labels: &[usize]) -> Option<usize> {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for &n in neighbors {
        let label = labels[n];
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }
    let mut best: Option<(usize, usize)> = None;
    for (label, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::graph;

    #[test]
    fn test_most_frequent_breaks_ties_by_first_seen() {
        let labels = vec![7, 3, 3, 7];
        assert_eq!(most_frequent(&[0, 1], &labels), Some(7));
        assert_eq!(most_frequent(&[0, 1, 2], &labels), Some(3));
        assert_eq!(most_frequent(&[], &labels), None);
    }

    #[tokio::test]
    async fn test_star_leaves_share_a_community() {
        // leaves only see the hub, so they always adopt the same label
        let (engine, ids) = graph(&["hub", "a", "b", "c", "d"], &[(0, 1), (0, 2), (0, 3), (0, 4)]).await;
        let communities = engine.analytics().detect_communities(None).await.unwrap();

        let leaf_community = communities.iter().find(|c| c.contains(&ids[1])).unwrap();
        for leaf in &ids[1..] {
            assert!(leaf_community.contains(leaf));
        }
    }

    #[tokio::test]
    async fn test_communities_never_cross_components() {
        let (engine, ids) = graph(
            &["a", "b", "c", "x", "y", "lonely"],
            &[(0, 1), (1, 2), (2, 0), (3, 4)],
        )
        .await;
        let communities = engine.analytics().detect_communities(Some(5)).await.unwrap();

        let total: usize = communities.iter().map(Vec::len).sum();
        assert_eq!(total, ids.len());
        for community in &communities {
            let in_triangle = community.iter().any(|n| ids[..3].contains(n));
            let in_pair = community.iter().any(|n| ids[3..5].contains(n));
            assert!(!(in_triangle && in_pair));
        }
        assert!(communities.contains(&vec![ids[5]]));
    }

    #[tokio::test]
    async fn test_zero_iterations_keeps_singletons() {
        let (engine, _) = graph(&["a", "b"], &[(0, 1)]).await;
        let communities = engine.analytics().detect_communities(Some(0)).await.unwrap();
        assert_eq!(communities.len(), 2);
    }
}
