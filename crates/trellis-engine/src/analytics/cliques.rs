//! Maximal clique enumeration

use super::GraphAnalytics;
use std::collections::HashSet;
use trellis_core::{NodeId, Result};

struct Candidate {
    clique: Vec<NodeId>,
    pending: Vec<NodeId>,
    excluded: Vec<NodeId>,
}

impl GraphAnalytics<'_> {
    /// Maximal cliques of the undirected view with at least `min_size`
    /// members (Bron–Kerbosch without pivoting).
    ///
    /// Runs on an explicit stack; cliques come out in the order a recursive
    /// walk would report them. Neighbor sets are fetched fresh at each step.
    pub async fn find_cliques(&self, min_size: usize) -> Result<Vec<Vec<NodeId>>> {
        let mut cliques = Vec::new();
        let mut stack = vec![Candidate {
            clique: Vec::new(),
            pending: self.node_ids().await?,
            excluded: Vec::new(),
        }];

        while let Some(Candidate {
            clique,
            mut pending,
            mut excluded,
        }) = stack.pop()
        {
            if pending.is_empty() {
                if excluded.is_empty() && !clique.is_empty() && clique.len() >= min_size {
                    cliques.push(clique);
                }
                continue;
            }

            let mut children = Vec::with_capacity(pending.len());
            while !pending.is_empty() {
                let v = pending.remove(0);
                let neighbors: HashSet<NodeId> =
                    self.undirected_neighbors(&v).await?.into_iter().collect();

                let mut grown = clique.clone();
                grown.push(v);
                children.push(Candidate {
                    clique: grown,
                    pending: pending.iter().copied().filter(|n| neighbors.contains(n)).collect(),
                    excluded: excluded.iter().copied().filter(|n| neighbors.contains(n)).collect(),
                });
                excluded.push(v);
            }

            // Reversed so the first candidate is expanded first
            stack.extend(children.into_iter().rev());
        }

        tracing::debug!("Found {} cliques of size >= {}", cliques.len(), min_size);
        Ok(cliques)
    }
}

#[cfg(test)]
mod tests {
    use crate::analytics::test_support::graph;

    #[tokio::test]
    async fn test_triangle_is_a_clique() {
        let (engine, ids) = graph(&["a", "b", "c"], &[(0, 1), (1, 2), (2, 0)]).await;
        let cliques = engine.analytics().find_cliques(3).await.unwrap();
        assert_eq!(cliques, vec![vec![ids[0], ids[1], ids[2]]]);
    }

    #[tokio::test]
    async fn test_pair_below_min_size() {
        let (engine, _) = graph(&["a", "b"], &[(0, 1)]).await;
        assert!(engine.analytics().find_cliques(3).await.unwrap().is_empty());
        assert_eq!(engine.analytics().find_cliques(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_cliques() {
        // two triangles sharing the b-c edge, plus a pendant e
        let (engine, ids) = graph(
            &["a", "b", "c", "d", "e"],
            &[(0, 1), (1, 2), (0, 2), (1, 3), (2, 3), (3, 4)],
        )
        .await;
        let cliques = engine.analytics().find_cliques(3).await.unwrap();
        assert_eq!(
            cliques,
            vec![vec![ids[0], ids[1], ids[2]], vec![ids[1], ids[2], ids[3]]]
        );
    }
}
