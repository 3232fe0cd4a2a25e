//! End-to-end engine behaviour against every backend

use std::sync::Arc;

use tempfile::TempDir;
use trellis_core::{
    Conditions, Direction, Error, NewEdge, NewNode, Pagination, PathQuery, SearchQuery,
    TraversalQuery,
};
use trellis_engine::{GraphEngine, PageRankConfig};
use trellis_storage::{MemoryStorage, StorageBackend};

#[cfg(feature = "sqlite")]
use trellis_storage::SqliteStorage;

#[cfg(feature = "redb")]
use trellis_storage::RedbStorage;

/// One engine per compiled-in backend; the temp dir keeps file backends alive
async fn engines() -> Vec<(GraphEngine, Option<TempDir>)> {
    let mut backends: Vec<(Arc<dyn StorageBackend>, Option<TempDir>)> =
        vec![(Arc::new(MemoryStorage::new()), None)];

    #[cfg(feature = "sqlite")]
    backends.push((Arc::new(SqliteStorage::in_memory().unwrap()), None));

    #[cfg(feature = "redb")]
    {
        let dir = tempfile::tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("graph.redb")).unwrap();
        backends.push((Arc::new(storage), Some(dir)));
    }

    let mut engines = Vec::new();
    for (backend, dir) in backends {
        let engine = GraphEngine::new(backend);
        engine.initialize().await.unwrap();
        engines.push((engine, dir));
    }
    engines
}

#[tokio::test]
async fn get_after_create_returns_equal_node() {
    for (engine, _dir) in engines().await {
        let node = engine
            .create_node(
                NewNode::new("concept", "Graph Theory")
                    .with_property("year", 1736)
                    .with_property("weight", 0.9999999999999999 * 123.456)
                    .with_property("ratio", 0.1 + 0.2)
                    .with_confidence(0.9999999999999999),
            )
            .await
            .unwrap();
        let fetched = engine.get_node(&node.id).await.unwrap();
        assert_eq!(fetched, Some(node), "backend {}", engine.backend().name());
    }
}

#[tokio::test]
async fn delete_node_cascades_to_edges() {
    for (engine, _dir) in engines().await {
        let a = engine.create_node(NewNode::new("n", "A")).await.unwrap();
        let b = engine.create_node(NewNode::new("n", "B")).await.unwrap();
        engine.create_edge(NewEdge::new(a.id, b.id, "to")).await.unwrap();
        engine.create_edge(NewEdge::new(b.id, a.id, "back")).await.unwrap();

        assert!(engine.delete_node(&a.id).await.unwrap());

        let remaining = engine
            .query_edges(&Conditions::new(), Pagination::all())
            .await
            .unwrap();
        assert!(remaining.is_empty(), "backend {}", engine.backend().name());

        let stats = engine.stats().await.unwrap();
        assert_eq!(stats.node_count, 1);
        assert_eq!(stats.edge_count, 0);
        // B keeps its type row and one search row
        assert_eq!(stats.index_count, 2, "backend {}", engine.backend().name());
    }
}

#[tokio::test]
async fn edge_to_missing_node_fails() {
    for (engine, _dir) in engines().await {
        let a = engine.create_node(NewNode::new("n", "A")).await.unwrap();
        let ghost = trellis_core::NodeId::new();
        let err = engine
            .create_edge(NewEdge::new(ghost, a.id, "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EndpointNotFound { node_id } if node_id == ghost.to_string()));
    }
}

#[tokio::test]
async fn bidirectional_edges_are_discoverable_both_ways() {
    for (engine, _dir) in engines().await {
        let a = engine.create_node(NewNode::new("n", "A")).await.unwrap();
        let b = engine.create_node(NewNode::new("n", "B")).await.unwrap();
        engine
            .create_edge(NewEdge::new(a.id, b.id, "peer").bidirectional())
            .await
            .unwrap();

        let from_a = engine
            .query_edges(&Conditions::new().eq("from_node_id", a.id.to_string()), Pagination::all())
            .await
            .unwrap();
        let from_b = engine
            .query_edges(&Conditions::new().eq("from_node_id", b.id.to_string()), Pagination::all())
            .await
            .unwrap();
        assert_eq!(from_a.len(), 1);
        assert_eq!(from_b.len(), 1);
        assert_eq!(from_b[0].to_node_id, a.id);

        let out_of_b = engine
            .traverse(&TraversalQuery::new(b.id).with_depth(1).with_direction(Direction::Outgoing))
            .await
            .unwrap();
        assert!(out_of_b.contains_node(&a.id));
    }
}

#[tokio::test]
async fn depth_zero_traversal_is_start_only() {
    for (engine, _dir) in engines().await {
        let a = engine.create_node(NewNode::new("n", "A")).await.unwrap();
        let b = engine.create_node(NewNode::new("n", "B")).await.unwrap();
        engine.create_edge(NewEdge::new(a.id, b.id, "x")).await.unwrap();

        let result = engine
            .traverse(&TraversalQuery::new(a.id).with_depth(0))
            .await
            .unwrap();
        assert_eq!(result.node_ids(), vec![a.id]);
        assert!(result.edges.is_empty());
    }
}

#[tokio::test]
async fn shortest_path_through_middle_node() {
    for (engine, _dir) in engines().await {
        let a = engine.create_node(NewNode::new("n", "A")).await.unwrap();
        let m = engine.create_node(NewNode::new("n", "M")).await.unwrap();
        let b = engine.create_node(NewNode::new("n", "B")).await.unwrap();
        engine.create_edge(NewEdge::new(a.id, m.id, "x")).await.unwrap();
        engine.create_edge(NewEdge::new(m.id, b.id, "x")).await.unwrap();

        let path = engine
            .find_shortest_path(&a.id, &b.id, &PathQuery::new())
            .await
            .unwrap()
            .expect("path exists");
        assert_eq!(path.length, 2);
        assert_eq!(path.node_ids(), vec![a.id, m.id, b.id]);

        let reverse = engine
            .find_shortest_path(&b.id, &a.id, &PathQuery::new())
            .await
            .unwrap();
        assert!(reverse.is_none());
    }
}

#[tokio::test]
async fn batch_counts_add_up() {
    for (engine, _dir) in engines().await {
        let items = vec![
            NewNode::new("n", "one"),
            NewNode::new("n", "two").with_confidence(2.0),
            NewNode::new("n", "three"),
        ];
        let result = engine.batch_create_nodes(items).await.unwrap();
        assert_eq!(result.success_count() + result.failure_count(), 3);
        assert_eq!(result.success_count(), 2);
        assert_eq!(engine.stats().await.unwrap().node_count, 2);
    }
}

#[tokio::test]
async fn search_orders_by_score_and_respects_min_score() {
    for (engine, _dir) in engines().await {
        let best = engine
            .create_node(NewNode::new("doc", "rust graph").with_property("body", "graph storage"))
            .await
            .unwrap();
        let ok = engine
            .create_node(NewNode::new("doc", "graph"))
            .await
            .unwrap();
        engine.create_node(NewNode::new("doc", "python")).await.unwrap();

        let hits = engine.search(&SearchQuery::new("graph rust")).await.unwrap();
        assert_eq!(hits.len(), 2, "backend {}", engine.backend().name());
        assert_eq!(hits[0].node.id, best.id);
        assert_eq!(hits[0].score, 3.0);
        assert_eq!(hits[1].node.id, ok.id);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));

        let strict = engine
            .search(&SearchQuery::new("graph rust").with_min_score(2.0))
            .await
            .unwrap();
        assert_eq!(strict.len(), 1);
        assert!(strict.iter().all(|h| h.score >= 2.0));
    }
}

#[tokio::test]
async fn page_rank_uniform_without_edges() {
    for (engine, _dir) in engines().await {
        for label in ["a", "b", "c", "d", "e"] {
            engine.create_node(NewNode::new("n", label)).await.unwrap();
        }
        let ranks = engine
            .analytics()
            .page_rank(PageRankConfig::default())
            .await
            .unwrap();
        assert_eq!(ranks.len(), 5);
        assert!(ranks.iter().all(|(_, r)| (r - 0.2).abs() < 1e-9));
    }
}

#[tokio::test]
async fn triangle_clique_detection() {
    for (engine, _dir) in engines().await {
        let a = engine.create_node(NewNode::new("n", "A")).await.unwrap();
        let b = engine.create_node(NewNode::new("n", "B")).await.unwrap();
        let c = engine.create_node(NewNode::new("n", "C")).await.unwrap();
        engine.create_edge(NewEdge::new(a.id, b.id, "x")).await.unwrap();
        engine.create_edge(NewEdge::new(b.id, c.id, "x")).await.unwrap();

        assert!(engine.analytics().find_cliques(3).await.unwrap().is_empty());

        engine.create_edge(NewEdge::new(c.id, a.id, "x")).await.unwrap();
        let cliques = engine.analytics().find_cliques(3).await.unwrap();
        assert_eq!(cliques.len(), 1);
        let mut members = cliques[0].clone();
        members.sort();
        let mut expected = vec![a.id, b.id, c.id];
        expected.sort();
        assert_eq!(members, expected);
    }
}

#[tokio::test]
async fn rebuild_indexes_restores_lookups() {
    for (engine, _dir) in engines().await {
        let a = engine.create_node(NewNode::new("person", "Ada")).await.unwrap();
        let b = engine.create_node(NewNode::new("person", "Babbage")).await.unwrap();
        engine.create_edge(NewEdge::new(a.id, b.id, "knows")).await.unwrap();
        let before = engine.stats().await.unwrap();

        let report = engine.rebuild_indexes().await.unwrap();
        assert_eq!(report.nodes_indexed, 2);
        assert_eq!(report.edges_indexed, 1);
        assert_eq!(engine.stats().await.unwrap(), before);
        assert_eq!(engine.edges_from(&a.id, Some("knows")).await.unwrap().len(), 1);
        assert_eq!(engine.nodes_by_type("person").await.unwrap().len(), 2);
    }
}
