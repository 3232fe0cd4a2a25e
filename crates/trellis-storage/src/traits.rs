//! Storage backend trait definitions
//!
//! A backend offers key-indexed CRUD over four tables (nodes, edges, index
//! rows, search rows), conditional queries, and a transaction primitive.
//! All writes go through [`StorageBackend::run_in_transaction`] so an entity
//! and its index rows land together whenever the backend is transactional.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_core::{
    Conditions, Edge, EdgeId, IndexEntry, IndexFamily, Node, NodeId, Pagination,
    SearchIndexEntry,
};

/// A row returned by a raw query, keyed by column name
pub type Row = serde_json::Map<String, Value>;

/// How index rows are selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexLookup {
    /// Rows whose key equals the given key
    Exact(String),
    /// Rows whose key starts with the given prefix
    Prefix(String),
}

impl IndexLookup {
    pub fn matches(&self, index_key: &str) -> bool {
        match self {
            Self::Exact(key) => index_key == key,
            Self::Prefix(prefix) => index_key.starts_with(prefix.as_str()),
        }
    }
}

/// A single write inside a transaction
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert or overwrite a node
    PutNode(Node),
    /// Remove a node row (index and search rows are removed by explicit ops)
    DeleteNode(NodeId),
    /// Insert or overwrite an edge
    PutEdge(Edge),
    /// Remove an edge row together with its edge-index rows
    DeleteEdge(EdgeId),
    /// Insert an index row (no-op if it already exists)
    InsertIndex(IndexEntry),
    /// Remove every index row of an entity
    DeleteIndexRows { family: IndexFamily, entity_id: String },
    /// Insert a search row, adding its weight to an existing row
    InsertSearch(SearchIndexEntry),
    /// Remove every search row of a node
    DeleteSearchRows { node_id: String },
}

/// An ordered list of writes applied as one unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    ops: Vec<WriteOp>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn extend(&mut self, ops: impl IntoIterator<Item = WriteOp>) -> &mut Self {
        self.ops.extend(ops);
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Row counts reported by a backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub node_count: usize,
    pub edge_count: usize,
    /// Node-index, edge-index and search rows combined
    pub index_count: usize,
}

/// Trait for storage backend implementations
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name used in logs and errors
    fn name(&self) -> &'static str;

    /// Create tables (idempotent)
    async fn initialize_schema(&self) -> StorageResult<()>;

    /// Close the storage connection
    async fn close(&self) -> StorageResult<()>;

    /// Health check
    async fn health_check(&self) -> StorageResult<bool>;

    /// Whether `run_in_transaction` is all-or-nothing
    fn supports_transactions(&self) -> bool {
        true
    }

    /// Apply every write in `tx` as one unit
    async fn run_in_transaction(&self, tx: Transaction) -> StorageResult<()>;

    /// Run a raw backend query with positional parameters
    async fn execute(&self, _query: &str, _params: &[Value]) -> StorageResult<Vec<Row>> {
        Err(StorageError::Unsupported {
            backend: self.name(),
            operation: "execute",
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Node Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a node by id
    async fn get_node(&self, id: &NodeId) -> StorageResult<Option<Node>>;

    /// Get several nodes; missing ids are skipped
    async fn get_nodes(&self, ids: &[NodeId]) -> StorageResult<Vec<Node>> {
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = self.get_node(id).await? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// Nodes matching every condition, in storage order
    async fn query_nodes(
        &self,
        conditions: &Conditions,
        pagination: Pagination,
    ) -> StorageResult<Vec<Node>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Edge Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get an edge by id
    async fn get_edge(&self, id: &EdgeId) -> StorageResult<Option<Edge>>;

    /// Get several edges; missing ids are skipped
    async fn get_edges(&self, ids: &[EdgeId]) -> StorageResult<Vec<Edge>> {
        let mut edges = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(edge) = self.get_edge(id).await? {
                edges.push(edge);
            }
        }
        Ok(edges)
    }

    /// Edges matching every condition, in storage order
    async fn query_edges(
        &self,
        conditions: &Conditions,
        pagination: Pagination,
    ) -> StorageResult<Vec<Edge>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Index Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Entity ids of index rows selected by `lookup`
    async fn lookup_index(
        &self,
        family: IndexFamily,
        lookup: &IndexLookup,
    ) -> StorageResult<Vec<String>>;

    /// Search rows whose term contains `term` as a substring
    async fn search_terms(&self, term: &str) -> StorageResult<Vec<SearchIndexEntry>>;

    /// All search rows of one node
    async fn search_rows_for_node(&self, node_id: &NodeId)
        -> StorageResult<Vec<SearchIndexEntry>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Reclaim space / compact
    async fn vacuum(&self) -> StorageResult<()>;

    /// Row counts
    async fn stats(&self) -> StorageResult<StorageStats>;
}

/// Validate conditions for a backend query, mapping the error kind
pub(crate) fn check_conditions(
    conditions: &Conditions,
    kind: trellis_core::EntityKind,
) -> StorageResult<()> {
    conditions
        .validate(kind)
        .map_err(|e| StorageError::InvalidCondition(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_lookup_matches() {
        assert!(IndexLookup::Exact("type:a".into()).matches("type:a"));
        assert!(!IndexLookup::Exact("type:a".into()).matches("type:ab"));
        assert!(IndexLookup::Prefix("from:X:".into()).matches("from:X:knows"));
        assert!(!IndexLookup::Prefix("from:X:".into()).matches("to:X:knows"));
    }

    #[test]
    fn test_transaction_builder() {
        let mut tx = Transaction::new();
        tx.push(WriteOp::DeleteNode(NodeId::new()))
            .push(WriteOp::DeleteSearchRows { node_id: "n".into() });
        assert_eq!(tx.len(), 2);
        assert!(Transaction::new().is_empty());
    }
}
