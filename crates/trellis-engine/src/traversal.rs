//! Neighborhood expansion and shortest paths
//!
//! Both walks read adjacency through the `from:`/`to:` index rows and never
//! load the whole graph.

use crate::engine::GraphEngine;
use std::collections::{HashMap, HashSet, VecDeque};
use trellis_core::limits::validate_traversal_depth;
use trellis_core::traversal::neighborhood_relevance;
use trellis_core::{
    Direction, Edge, EdgeId, GraphPath, NodeId, PathQuery, Result, TraversalQuery,
    TraversalResult, TraversalStats,
};

impl GraphEngine {
    /// Breadth-first expansion from `query.start`.
    ///
    /// The result holds every visited node and every allowed edge examined
    /// from an expanded node. A missing start node yields an empty result.
    pub async fn traverse(&self, query: &TraversalQuery) -> Result<TraversalResult> {
        validate_traversal_depth(query.max_depth, self.config().max_traversal_depth)?;

        tracing::debug!(
            "Executing traversal: start={}, depth={}, direction={:?}, edge_types={:?}",
            query.start,
            query.max_depth,
            query.direction,
            query.edge_types
        );

        let Some(start) = self.get_node(&query.start).await? else {
            return Ok(TraversalResult::default());
        };

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut seen_edges: HashSet<EdgeId> = HashSet::new();
        let mut queue: VecDeque<(NodeId, u32)> = VecDeque::new();
        let mut nodes = Vec::new();
        let mut edges: Vec<Edge> = Vec::new();
        let mut stats = TraversalStats::default();
        let mut expansions = 0usize;

        visited.insert(start.id);
        queue.push_back((start.id, 0));
        nodes.push(start);

        while let Some((current, depth)) = queue.pop_front() {
            stats.max_depth_reached = stats.max_depth_reached.max(depth);

            if depth >= query.max_depth {
                continue;
            }
            // visit_once walks are bounded by the node count and run to completion
            if !query.visit_once && expansions >= self.config().max_traversal_nodes {
                stats.truncated = true;
                tracing::warn!(
                    "Traversal from {} stopped after {} expansions",
                    query.start,
                    expansions
                );
                break;
            }
            expansions += 1;

            let edge_ids = self
                .adjacent_edge_ids(&current, query.direction, &query.edge_types)
                .await?;
            for edge in self.get_edges(&edge_ids).await? {
                if !query.allows_edge_type(&edge.edge_type) {
                    continue;
                }
                let Some(next) = edge.other_end(&current) else {
                    continue;
                };
                if seen_edges.insert(edge.id) {
                    edges.push(edge);
                }

                let first_visit = visited.insert(next);
                if first_visit {
                    match self.get_node(&next).await? {
                        Some(node) => nodes.push(node),
                        None => {
                            tracing::warn!("Index references missing node {}", next);
                            continue;
                        }
                    }
                }
                if first_visit || !query.visit_once {
                    queue.push_back((next, depth + 1));
                }
            }
        }

        stats.nodes_visited = nodes.len();
        stats.edges_traversed = edges.len();

        tracing::debug!(
            "Traversal visited {} nodes, collected {} edges",
            stats.nodes_visited,
            stats.edges_traversed
        );

        Ok(TraversalResult {
            relevance: neighborhood_relevance(nodes.len()),
            nodes,
            edges,
            stats,
        })
    }

    /// Convenience form of [`traverse`](Self::traverse).
    ///
    /// `depth` defaults to the configured traversal depth.
    pub async fn query_related(
        &self,
        start: &NodeId,
        depth: Option<u32>,
        direction: Direction,
        edge_types: Vec<String>,
    ) -> Result<TraversalResult> {
        let query = TraversalQuery::new(*start)
            .with_depth(depth.unwrap_or(self.config().default_traversal_depth))
            .with_direction(direction)
            .filter_edge_types(edge_types);
        self.traverse(&query).await
    }

    /// Minimum-hop path from `from` to `to` following outgoing edges only.
    ///
    /// Returns `None` when either node is missing or `to` is unreachable
    /// within `query.max_depth` hops.
    pub async fn find_shortest_path(
        &self,
        from: &NodeId,
        to: &NodeId,
        query: &PathQuery,
    ) -> Result<Option<GraphPath>> {
        let Some(start) = self.get_node(from).await? else {
            return Ok(None);
        };
        if from == to {
            return Ok(Some(GraphPath {
                nodes: vec![start],
                edges: Vec::new(),
                length: 0,
            }));
        }
        if self.get_node(to).await?.is_none() {
            return Ok(None);
        }

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut parent: HashMap<NodeId, Edge> = HashMap::new();
        let mut queue: VecDeque<(NodeId, u32)> = VecDeque::new();
        visited.insert(*from);
        queue.push_back((*from, 0));

        let mut found = false;
        'search: while let Some((current, depth)) = queue.pop_front() {
            if query.max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            let edge_ids = self
                .adjacent_edge_ids(&current, Direction::Outgoing, &query.edge_types)
                .await?;
            for edge in self.get_edges(&edge_ids).await? {
                if !query.allows_edge_type(&edge.edge_type) {
                    continue;
                }
                let next = edge.to_node_id;
                if !visited.insert(next) {
                    continue;
                }
                parent.insert(next, edge);
                if next == *to {
                    found = true;
                    break 'search;
                }
                queue.push_back((next, depth + 1));
            }
        }

        if !found {
            tracing::debug!("No path from {} to {}", from, to);
            return Ok(None);
        }

        // Walk parents back from the target
        let mut edges = Vec::new();
        let mut current = *to;
        while current != *from {
            let Some(edge) = parent.remove(&current) else {
                break;
            };
            current = edge.from_node_id;
            edges.push(edge);
        }
        edges.reverse();

        let mut nodes = vec![start];
        for edge in &edges {
            match self.get_node(&edge.to_node_id).await? {
                Some(node) => nodes.push(node),
                None => return Ok(None),
            }
        }

        tracing::debug!("BFS found path of length {}", edges.len());
        Ok(Some(GraphPath {
            length: edges.len(),
            nodes,
            edges,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trellis_core::{EngineConfig, NewEdge, NewNode, Node};
    use trellis_storage::MemoryStorage;

    async fn chain(engine: &GraphEngine, labels: &[&str], edge_type: &str) -> Vec<Node> {
        let mut nodes = Vec::new();
        for label in labels {
            nodes.push(engine.create_node(NewNode::new("n", *label)).await.unwrap());
        }
        for pair in nodes.windows(2) {
            engine
                .create_edge(NewEdge::new(pair[0].id, pair[1].id, edge_type))
                .await
                .unwrap();
        }
        nodes
    }

    fn engine() -> GraphEngine {
        GraphEngine::new(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_depth_zero_returns_start_only() {
        let engine = engine();
        let nodes = chain(&engine, &["A", "B"], "next").await;

        let result = engine
            .traverse(&TraversalQuery::new(nodes[0].id).with_depth(0))
            .await
            .unwrap();
        assert_eq!(result.node_ids(), vec![nodes[0].id]);
        assert!(result.edges.is_empty());
    }

    #[tokio::test]
    async fn test_missing_start_is_empty() {
        let engine = engine();
        let result = engine.traverse(&TraversalQuery::new(NodeId::new())).await.unwrap();
        assert!(result.nodes.is_empty());
        assert_eq!(result.relevance, 0.0);
    }

    #[tokio::test]
    async fn test_direction_filtering() {
        let engine = engine();
        let nodes = chain(&engine, &["A", "B", "C"], "next").await;
        let middle = nodes[1].id;

        let out = engine
            .traverse(&TraversalQuery::new(middle).with_depth(1).with_direction(Direction::Outgoing))
            .await
            .unwrap();
        assert_eq!(out.node_ids(), vec![middle, nodes[2].id]);

        let inc = engine
            .traverse(&TraversalQuery::new(middle).with_depth(1).with_direction(Direction::Incoming))
            .await
            .unwrap();
        assert_eq!(inc.node_ids(), vec![middle, nodes[0].id]);

        let both = engine
            .traverse(&TraversalQuery::new(middle).with_depth(1))
            .await
            .unwrap();
        assert_eq!(both.nodes.len(), 3);
        assert_eq!(both.edges.len(), 2);
        assert_eq!(both.stats.max_depth_reached, 1);
    }

    #[tokio::test]
    async fn test_edge_type_allow_list() {
        let engine = engine();
        let a = engine.create_node(NewNode::new("n", "A")).await.unwrap();
        let b = engine.create_node(NewNode::new("n", "B")).await.unwrap();
        let c = engine.create_node(NewNode::new("n", "C")).await.unwrap();
        engine.create_edge(NewEdge::new(a.id, b.id, "friend")).await.unwrap();
        engine.create_edge(NewEdge::new(a.id, c.id, "enemy")).await.unwrap();

        let result = engine
            .query_related(&a.id, Some(1), Direction::Outgoing, vec!["friend".into()])
            .await
            .unwrap();
        assert!(result.contains_node(&b.id));
        assert!(!result.contains_node(&c.id));
        assert_eq!(result.edges.len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_terminates_and_relevance_saturates() {
        let engine = engine();
        let labels: Vec<String> = (0..12).map(|i| format!("n{}", i)).collect();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let nodes = chain(&engine, &refs, "next").await;
        engine
            .create_edge(NewEdge::new(nodes[11].id, nodes[0].id, "next"))
            .await
            .unwrap();

        let result = engine
            .traverse(&TraversalQuery::new(nodes[0].id).with_depth(20))
            .await
            .unwrap();
        assert_eq!(result.nodes.len(), 12);
        assert_eq!(result.edges.len(), 12);
        assert_eq!(result.relevance, 1.0);
    }

    #[tokio::test]
    async fn test_revisits_bounded_by_node_guard() {
        let config = EngineConfig {
            max_traversal_nodes: 5,
            ..EngineConfig::default()
        };
        let engine = GraphEngine::with_config(Arc::new(MemoryStorage::new()), config);
        let nodes = chain(&engine, &["A", "B"], "next").await;

        let result = engine
            .traverse(&TraversalQuery::new(nodes[0].id).with_depth(10).allow_revisits())
            .await
            .unwrap();
        assert!(result.stats.truncated);
        assert_eq!(result.nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_visit_once_ignores_node_guard() {
        let config = EngineConfig {
            max_traversal_nodes: 3,
            ..EngineConfig::default()
        };
        let engine = GraphEngine::with_config(Arc::new(MemoryStorage::new()), config);
        let nodes = chain(&engine, &["A", "B", "C", "D", "E", "F"], "next").await;

        let result = engine
            .traverse(&TraversalQuery::new(nodes[0].id).with_depth(10))
            .await
            .unwrap();
        assert!(!result.stats.truncated);
        assert_eq!(result.nodes.len(), 6);
        assert_eq!(result.edges.len(), 5);
    }

    #[tokio::test]
    async fn test_depth_above_limit_rejected() {
        let engine = engine();
        let err = engine
            .traverse(&TraversalQuery::new(NodeId::new()).with_depth(1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, trellis_core::Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_shortest_path_prefers_fewest_hops() {
        let engine = engine();
        let nodes = chain(&engine, &["A", "B", "C", "D"], "next").await;
        let shortcut = engine
            .create_edge(NewEdge::new(nodes[0].id, nodes[2].id, "skip"))
            .await
            .unwrap();

        let path = engine
            .find_shortest_path(&nodes[0].id, &nodes[3].id, &PathQuery::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path.length, 2);
        assert_eq!(path.node_ids(), vec![nodes[0].id, nodes[2].id, nodes[3].id]);
        assert_eq!(path.edges[0].id, shortcut.id);

        let restricted = engine
            .find_shortest_path(
                &nodes[0].id,
                &nodes[3].id,
                &PathQuery::new().filter_edge_types(vec!["next".into()]),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(restricted.length, 3);
    }

    #[tokio::test]
    async fn test_shortest_path_outgoing_only_and_depth_cap() {
        let engine = engine();
        let nodes = chain(&engine, &["A", "B", "C"], "next").await;

        let backwards = engine
            .find_shortest_path(&nodes[2].id, &nodes[0].id, &PathQuery::new())
            .await
            .unwrap();
        assert!(backwards.is_none());

        let capped = engine
            .find_shortest_path(&nodes[0].id, &nodes[2].id, &PathQuery::new().with_max_depth(1))
            .await
            .unwrap();
        assert!(capped.is_none());

        let same = engine
            .find_shortest_path(&nodes[1].id, &nodes[1].id, &PathQuery::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(same.length, 0);
        assert_eq!(same.nodes.len(), 1);
    }
}
