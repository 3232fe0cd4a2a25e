//! In-memory storage backend for testing

use crate::error::{StorageError, StorageResult};
use crate::traits::{check_conditions, IndexLookup, StorageBackend, StorageStats, Transaction, WriteOp};
use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use trellis_core::{
    Conditions, Edge, EdgeId, EntityKind, IndexFamily, Node, NodeId, Pagination,
    SearchIndexEntry,
};

type SearchKey = (String, String, String);

#[derive(Default)]
struct Tables {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    node_index: IndexSet<(String, String)>,
    edge_index: IndexSet<(String, String)>,
    search: IndexMap<SearchKey, f64>,
}

impl Tables {
    fn index_mut(&mut self, family: IndexFamily) -> &mut IndexSet<(String, String)> {
        match family {
            IndexFamily::Node => &mut self.node_index,
            IndexFamily::Edge => &mut self.edge_index,
        }
    }

    fn index(&self, family: IndexFamily) -> &IndexSet<(String, String)> {
        match family {
            IndexFamily::Node => &self.node_index,
            IndexFamily::Edge => &self.edge_index,
        }
    }

    fn apply(&mut self, op: WriteOp) {
        match op {
            WriteOp::PutNode(node) => {
                self.nodes.insert(node.id, node);
            }
            WriteOp::DeleteNode(id) => {
                self.nodes.shift_remove(&id);
            }
            WriteOp::PutEdge(edge) => {
                self.edges.insert(edge.id, edge);
            }
            WriteOp::DeleteEdge(id) => {
                if self.edges.shift_remove(&id).is_some() {
                    let id = id.to_string();
                    self.edge_index.retain(|(_, entity)| *entity != id);
                }
            }
            WriteOp::InsertIndex(entry) => {
                self.index_mut(entry.family)
                    .insert((entry.index_key, entry.entity_id));
            }
            WriteOp::DeleteIndexRows { family, entity_id } => {
                self.index_mut(family)
                    .retain(|(_, entity)| *entity != entity_id);
            }
            WriteOp::InsertSearch(entry) => {
                *self
                    .search
                    .entry((entry.term, entry.node_id, entry.field))
                    .or_insert(0.0) += entry.weight;
            }
            WriteOp::DeleteSearchRows { node_id } => {
                self.search.retain(|(_, node, _), _| *node != node_id);
            }
        }
    }
}

fn search_entry(key: &SearchKey, weight: f64) -> SearchIndexEntry {
    SearchIndexEntry {
        term: key.0.clone(),
        node_id: key.1.clone(),
        field: key.2.clone(),
        weight,
    }
}

/// In-memory storage backend
///
/// Useful for testing and temporary graphs. Storage order is insertion
/// order. Transactions apply under a single write lock, so they are
/// all-or-nothing with respect to other callers.
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn initialize_schema(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        Ok(true)
    }

    async fn run_in_transaction(&self, tx: Transaction) -> StorageResult<()> {
        let mut tables = self.write()?;
        for op in tx.into_ops() {
            tables.apply(op);
        }
        Ok(())
    }

    // Node operations

    async fn get_node(&self, id: &NodeId) -> StorageResult<Option<Node>> {
        Ok(self.read()?.nodes.get(id).cloned())
    }

    async fn query_nodes(
        &self,
        conditions: &Conditions,
        pagination: Pagination,
    ) -> StorageResult<Vec<Node>> {
        check_conditions(conditions, EntityKind::Node)?;
        let tables = self.read()?;
        Ok(pagination.apply(
            tables
                .nodes
                .values()
                .filter(|n| conditions.matches_node(n))
                .cloned(),
        ))
    }

    // Edge operations

    async fn get_edge(&self, id: &EdgeId) -> StorageResult<Option<Edge>> {
        Ok(self.read()?.edges.get(id).cloned())
    }

    async fn query_edges(
        &self,
        conditions: &Conditions,
        pagination: Pagination,
    ) -> StorageResult<Vec<Edge>> {
        check_conditions(conditions, EntityKind::Edge)?;
        let tables = self.read()?;
        Ok(pagination.apply(
            tables
                .edges
                .values()
                .filter(|e| conditions.matches_edge(e))
                .cloned(),
        ))
    }

    // Index operations

    async fn lookup_index(
        &self,
        family: IndexFamily,
        lookup: &IndexLookup,
    ) -> StorageResult<Vec<String>> {
        let tables = self.read()?;
        Ok(tables
            .index(family)
            .iter()
            .filter(|(key, _)| lookup.matches(key))
            .map(|(_, entity)| entity.clone())
            .collect())
    }

    async fn search_terms(&self, term: &str) -> StorageResult<Vec<SearchIndexEntry>> {
        let tables = self.read()?;
        Ok(tables
            .search
            .iter()
            .filter(|(key, _)| key.0.contains(term))
            .map(|(key, weight)| search_entry(key, *weight))
            .collect())
    }

    async fn search_rows_for_node(
        &self,
        node_id: &NodeId,
    ) -> StorageResult<Vec<SearchIndexEntry>> {
        let node_id = node_id.to_string();
        let tables = self.read()?;
        Ok(tables
            .search
            .iter()
            .filter(|(key, _)| key.1 == node_id)
            .map(|(key, weight)| search_entry(key, *weight))
            .collect())
    }

    // Maintenance

    async fn vacuum(&self) -> StorageResult<()> {
        let mut tables = self.write()?;
        tables.nodes.shrink_to_fit();
        tables.edges.shrink_to_fit();
        tables.node_index.shrink_to_fit();
        tables.edge_index.shrink_to_fit();
        tables.search.shrink_to_fit();
        Ok(())
    }

    async fn stats(&self) -> StorageResult<StorageStats> {
        let tables = self.read()?;
        Ok(StorageStats {
            node_count: tables.nodes.len(),
            edge_count: tables.edges.len(),
            index_count: tables.node_index.len() + tables.edge_index.len() + tables.search.len(),
        })
    }
}
