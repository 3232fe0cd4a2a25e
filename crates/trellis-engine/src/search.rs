//! Term search over the engine-maintained search index

use crate::engine::GraphEngine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trellis_core::index::tokenize;
use trellis_core::{Node, NodeId, Result, SearchQuery};

/// A scored search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub node: Node,
    pub score: f64,
}

impl GraphEngine {
    /// Score nodes by the summed weight of search rows matching the query.
    ///
    /// Each query term matches every indexed term containing it. Hits below
    /// `min_score` are dropped, the rest sorted by descending score (ties
    /// keep discovery order) and cut to `limit`; the node-type filter is
    /// applied last, so it can return fewer than `limit` hits.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        let terms = tokenize(&query.text);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut order: Vec<String> = Vec::new();
        let mut scores: HashMap<String, f64> = HashMap::new();
        for term in &terms {
            for row in self.backend().search_terms(term).await? {
                match scores.get_mut(&row.node_id) {
                    Some(score) => *score += row.weight,
                    None => {
                        order.push(row.node_id.clone());
                        scores.insert(row.node_id, row.weight);
                    }
                }
            }
        }

        let mut ranked: Vec<(String, f64)> = order
            .into_iter()
            .filter_map(|id| scores.get(&id).map(|score| (id, *score)))
            .filter(|(_, score)| query.min_score.map_or(true, |min| *score >= min))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(query.limit);

        let mut hits = Vec::with_capacity(ranked.len());
        for (raw_id, score) in ranked {
            let Ok(id) = NodeId::from_string(&raw_id) else {
                tracing::warn!("Skipping search row with malformed node id {}", raw_id);
                continue;
            };
            let Some(node) = self.get_node(&id).await? else {
                tracing::warn!("Skipping search row for missing node {}", raw_id);
                continue;
            };
            if !query.node_types.is_empty() && !query.node_types.contains(&node.node_type) {
                continue;
            }
            hits.push(SearchHit { node, score });
        }

        tracing::debug!("Search {:?} returned {} hits", query.text, hits.len());
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trellis_core::{NewNode, NodeUpdate};
    use trellis_storage::MemoryStorage;

    fn engine() -> GraphEngine {
        GraphEngine::new(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_search_scores_by_summed_weight() {
        let engine = engine();
        let both = engine
            .create_node(NewNode::new("doc", "graph engine"))
            .await
            .unwrap();
        let one = engine
            .create_node(NewNode::new("doc", "graph theory"))
            .await
            .unwrap();
        engine.create_node(NewNode::new("doc", "unrelated")).await.unwrap();

        let hits = engine.search(&SearchQuery::new("Graph Engine")).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node.id, both.id);
        assert_eq!(hits[0].score, 2.0);
        assert_eq!(hits[1].node.id, one.id);
        assert_eq!(hits[1].score, 1.0);
    }

    #[tokio::test]
    async fn test_search_substring_and_properties() {
        let engine = engine();
        let node = engine
            .create_node(NewNode::new("paper", "Untitled").with_property("abstract", "paragraphs about graphs"))
            .await
            .unwrap();

        let hits = engine.search(&SearchQuery::new("graph")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node.id, node.id);
        // "paragraphs" and "graphs" both contain the term
        assert_eq!(hits[0].score, 2.0);
    }

    #[tokio::test]
    async fn test_search_min_score_limit_and_type_filter() {
        let engine = engine();
        let strong = engine
            .create_node(NewNode::new("person", "rust rust"))
            .await
            .unwrap();
        engine.create_node(NewNode::new("tool", "rust")).await.unwrap();

        let hits = engine
            .search(&SearchQuery::new("rust").with_min_score(2.0))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node.id, strong.id);

        let limited = engine.search(&SearchQuery::new("rust").with_limit(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].node.id, strong.id);

        // the type filter runs after the limit
        let filtered = engine
            .search(&SearchQuery::new("rust").with_limit(1).with_node_type("tool"))
            .await
            .unwrap();
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn test_search_reflects_label_updates() {
        let engine = engine();
        let node = engine.create_node(NewNode::new("doc", "old title")).await.unwrap();
        engine
            .update_node(&node.id, NodeUpdate::new().label("new title"), true)
            .await
            .unwrap();

        assert!(engine.search(&SearchQuery::new("old")).await.unwrap().is_empty());
        let hits = engine.search(&SearchQuery::new("new")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 1.0);

        engine.delete_node(&node.id).await.unwrap();
        assert!(engine.search(&SearchQuery::new("title")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_returns_nothing() {
        let engine = engine();
        engine.create_node(NewNode::new("doc", "anything")).await.unwrap();
        assert!(engine.search(&SearchQuery::new("   ")).await.unwrap().is_empty());
    }
}
