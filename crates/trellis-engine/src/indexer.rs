//! Secondary index maintenance
//!
//! Every mutation of a node or edge is turned into one [`Transaction`] that
//! carries the entity write and the index writes describing it. The three
//! index families are the `type:` rows, the `from:`/`to:` adjacency rows and
//! the search rows.

use crate::engine::GraphEngine;
use serde::{Deserialize, Serialize};
use trellis_core::index::{edge_index_entries, node_index_entries, search_entries};
use trellis_core::{Conditions, Edge, EdgeId, IndexFamily, Node, NodeId, Pagination, Result};
use trellis_storage::{Transaction, WriteOp};

/// Writes for a freshly created node
pub fn insert_node(tx: &mut Transaction, node: &Node) {
    tx.push(WriteOp::PutNode(node.clone()));
    push_node_rows(tx, node);
}

/// Writes for an updated node.
///
/// Search rows are rebuilt as a whole when the label or properties changed;
/// the type row is replaced when the type changed.
pub fn update_node(tx: &mut Transaction, node: &Node, text_changed: bool, type_changed: bool) {
    let id = node.id.to_string();
    if type_changed {
        tx.push(WriteOp::DeleteIndexRows {
            family: IndexFamily::Node,
            entity_id: id.clone(),
        });
    }
    if text_changed {
        tx.push(WriteOp::DeleteSearchRows { node_id: id });
    }
    tx.push(WriteOp::PutNode(node.clone()));
    if type_changed {
        tx.extend(node_index_entries(node).into_iter().map(WriteOp::InsertIndex));
    }
    if text_changed {
        tx.extend(search_entries(node).into_iter().map(WriteOp::InsertSearch));
    }
}

/// Writes removing a node, its incident edges and its index rows
pub fn delete_node(tx: &mut Transaction, node_id: &NodeId, incident_edges: &[EdgeId]) {
    tx.extend(incident_edges.iter().copied().map(WriteOp::DeleteEdge));
    tx.push(WriteOp::DeleteIndexRows {
        family: IndexFamily::Node,
        entity_id: node_id.to_string(),
    })
    .push(WriteOp::DeleteSearchRows {
        node_id: node_id.to_string(),
    })
    .push(WriteOp::DeleteNode(*node_id));
}

/// Writes for a freshly created edge
pub fn insert_edge(tx: &mut Transaction, edge: &Edge) {
    tx.push(WriteOp::PutEdge(edge.clone()));
    tx.extend(edge_index_entries(edge).into_iter().map(WriteOp::InsertIndex));
}

/// Writes for an updated edge; adjacency rows are rewritten on a type change
pub fn update_edge(tx: &mut Transaction, edge: &Edge, type_changed: bool) {
    if type_changed {
        tx.push(WriteOp::DeleteIndexRows {
            family: IndexFamily::Edge,
            entity_id: edge.id.to_string(),
        });
    }
    tx.push(WriteOp::PutEdge(edge.clone()));
    if type_changed {
        tx.extend(edge_index_entries(edge).into_iter().map(WriteOp::InsertIndex));
    }
}

/// Edge rows go with the edge itself; backends drop them on deletion.
pub fn delete_edge(tx: &mut Transaction, edge_id: &EdgeId) {
    tx.push(WriteOp::DeleteEdge(*edge_id));
}

fn push_node_rows(tx: &mut Transaction, node: &Node) {
    tx.extend(node_index_entries(node).into_iter().map(WriteOp::InsertIndex));
    tx.extend(search_entries(node).into_iter().map(WriteOp::InsertSearch));
}

/// Outcome of [`GraphEngine::rebuild_indexes`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    pub nodes_indexed: usize,
    pub edges_indexed: usize,
}

impl GraphEngine {
    /// Drop and regenerate every index row from the entity tables.
    ///
    /// Used to repair a store written by a backend without transactions.
    pub async fn rebuild_indexes(&self) -> Result<RebuildReport> {
        let nodes = self.backend().query_nodes(&Conditions::new(), Pagination::all()).await?;
        let edges = self.backend().query_edges(&Conditions::new(), Pagination::all()).await?;

        let mut tx = Transaction::new();
        for node in &nodes {
            tx.push(WriteOp::DeleteIndexRows {
                family: IndexFamily::Node,
                entity_id: node.id.to_string(),
            })
            .push(WriteOp::DeleteSearchRows {
                node_id: node.id.to_string(),
            });
            push_node_rows(&mut tx, node);
        }
        for edge in &edges {
            tx.push(WriteOp::DeleteIndexRows {
                family: IndexFamily::Edge,
                entity_id: edge.id.to_string(),
            });
            tx.extend(edge_index_entries(edge).into_iter().map(WriteOp::InsertIndex));
        }
        self.commit(tx).await?;

        let report = RebuildReport {
            nodes_indexed: nodes.len(),
            edges_indexed: edges.len(),
        };
        tracing::info!(
            "Rebuilt indexes for {} nodes and {} edges",
            report.nodes_indexed,
            report.edges_indexed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{NewEdge, NewNode};

    #[test]
    fn test_insert_node_writes_type_and_search_rows() {
        let node = Node::from_new(NewNode::new("person", "Ada Lovelace"));
        let mut tx = Transaction::new();
        insert_node(&mut tx, &node);

        // node + type row + two search terms
        assert_eq!(tx.len(), 4);
        assert!(matches!(tx.ops()[0], WriteOp::PutNode(_)));
    }

    #[test]
    fn test_update_node_only_touches_changed_families() {
        let node = Node::from_new(NewNode::new("person", "Ada"));

        let mut tx = Transaction::new();
        update_node(&mut tx, &node, false, false);
        assert_eq!(tx.ops(), &[WriteOp::PutNode(node.clone())]);

        let mut tx = Transaction::new();
        update_node(&mut tx, &node, true, false);
        assert!(tx
            .ops()
            .iter()
            .any(|op| matches!(op, WriteOp::DeleteSearchRows { .. })));
        assert!(!tx
            .ops()
            .iter()
            .any(|op| matches!(op, WriteOp::DeleteIndexRows { .. })));
    }

    #[test]
    fn test_edge_rows_rewritten_on_type_change() {
        let edge = Edge::from_new(&NewEdge::new(NodeId::new(), NodeId::new(), "likes"));
        let mut tx = Transaction::new();
        update_edge(&mut tx, &edge, true);
        let inserts = tx
            .ops()
            .iter()
            .filter(|op| matches!(op, WriteOp::InsertIndex(_)))
            .count();
        assert_eq!(inserts, 3);
    }
}
