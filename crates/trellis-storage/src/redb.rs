//! ReDB storage backend
//!
//! Index and search rows are stored as composite keys joined by `\0`, so a
//! prefix lookup is a range scan starting at the prefix.

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    check_conditions, IndexLookup, StorageBackend, StorageStats, Transaction, WriteOp,
};
use async_trait::async_trait;
use redb::{
    Database, ReadableTable, ReadableTableMetadata, Table, TableDefinition, WriteTransaction,
};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use trellis_core::index::edge_index_entries;
use trellis_core::{
    Conditions, Edge, EdgeId, EntityKind, IndexFamily, Node, NodeId, Pagination,
    SearchIndexEntry,
};

// Table definitions
const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");
const EDGES: TableDefinition<&str, &[u8]> = TableDefinition::new("edges");
const NODE_INDEX: TableDefinition<&str, &str> = TableDefinition::new("node_index");
const EDGE_INDEX: TableDefinition<&str, &str> = TableDefinition::new("edge_index");
const SEARCH: TableDefinition<&str, f64> = TableDefinition::new("search_index");

const SEP: char = '\0';

type BlobTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// ReDB storage backend
pub struct RedbStorage {
    db: Mutex<Database>,
}

struct WriteTables<'txn> {
    nodes: Table<'txn, &'static str, &'static [u8]>,
    edges: Table<'txn, &'static str, &'static [u8]>,
    node_index: Table<'txn, &'static str, &'static str>,
    edge_index: Table<'txn, &'static str, &'static str>,
    search: Table<'txn, &'static str, f64>,
}

impl<'txn> WriteTables<'txn> {
    fn open(txn: &'txn WriteTransaction) -> StorageResult<Self> {
        Ok(Self {
            nodes: txn.open_table(NODES)?,
            edges: txn.open_table(EDGES)?,
            node_index: txn.open_table(NODE_INDEX)?,
            edge_index: txn.open_table(EDGE_INDEX)?,
            search: txn.open_table(SEARCH)?,
        })
    }

    fn index(&mut self, family: IndexFamily) -> &mut Table<'txn, &'static str, &'static str> {
        match family {
            IndexFamily::Node => &mut self.node_index,
            IndexFamily::Edge => &mut self.edge_index,
        }
    }

    fn apply(&mut self, op: WriteOp) -> StorageResult<()> {
        match op {
            WriteOp::PutNode(node) => {
                let key = node.id.to_string();
                let value = serde_json::to_vec(&node)?;
                self.nodes.insert(key.as_str(), value.as_slice())?;
            }
            WriteOp::DeleteNode(id) => {
                self.nodes.remove(id.to_string().as_str())?;
            }
            WriteOp::PutEdge(edge) => {
                let key = edge.id.to_string();
                let value = serde_json::to_vec(&edge)?;
                self.edges.insert(key.as_str(), value.as_slice())?;
            }
            WriteOp::DeleteEdge(id) => {
                let key = id.to_string();
                let removed = self.edges.remove(key.as_str())?;
                if let Some(data) = removed {
                    let edge: Edge = serde_json::from_slice(data.value())?;
                    drop(data);
                    for entry in edge_index_entries(&edge) {
                        let row = index_row_key(&entry.index_key, &entry.entity_id);
                        self.edge_index.remove(row.as_str())?;
                    }
                }
            }
            WriteOp::InsertIndex(entry) => {
                let row = index_row_key(&entry.index_key, &entry.entity_id);
                self.index(entry.family)
                    .insert(row.as_str(), entry.entity_id.as_str())?;
            }
            WriteOp::DeleteIndexRows { family, entity_id } => {
                let table = self.index(family);
                let mut doomed = Vec::new();
                for item in table.iter()? {
                    let (key, value) = item?;
                    if value.value() == entity_id {
                        doomed.push(key.value().to_string());
                    }
                }
                for key in doomed {
                    table.remove(key.as_str())?;
                }
            }
            WriteOp::InsertSearch(entry) => {
                let key = search_row_key(&entry.term, &entry.node_id, &entry.field);
                let existing = self
                    .search
                    .get(key.as_str())?
                    .map(|w| w.value())
                    .unwrap_or(0.0);
                self.search.insert(key.as_str(), existing + entry.weight)?;
            }
            WriteOp::DeleteSearchRows { node_id } => {
                let mut doomed = Vec::new();
                for item in self.search.iter()? {
                    let (key, _) = item?;
                    if let Some((_, node, _)) = split_search_key(key.value()) {
                        if node == node_id {
                            doomed.push(key.value().to_string());
                        }
                    }
                }
                for key in doomed {
                    self.search.remove(key.as_str())?;
                }
            }
        }
        Ok(())
    }
}

fn index_row_key(index_key: &str, entity_id: &str) -> String {
    format!("{}{}{}", index_key, SEP, entity_id)
}

fn search_row_key(term: &str, node_id: &str, field: &str) -> String {
    format!("{}{}{}{}{}", term, SEP, node_id, SEP, field)
}

fn split_search_key(key: &str) -> Option<(&str, &str, &str)> {
    let mut parts = key.splitn(3, SEP);
    Some((parts.next()?, parts.next()?, parts.next()?))
}

impl RedbStorage {
    /// Open or create a ReDB database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;

        // Initialize tables
        {
            let write_txn = db.begin_write()?;
            WriteTables::open(&write_txn)?;
            write_txn.commit()?;
        }

        Ok(Self { db: Mutex::new(db) })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn get_data<T: DeserializeOwned>(
        &self,
        definition: BlobTable,
        key: &str,
    ) -> StorageResult<Option<T>> {
        let db = self.lock()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(definition)?;
        match table.get(key)? {
            Some(data) => Ok(Some(serde_json::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    fn scan_data<T: DeserializeOwned>(
        &self,
        definition: BlobTable,
        mut keep: impl FnMut(&T) -> bool,
    ) -> StorageResult<Vec<T>> {
        let db = self.lock()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(definition)?;
        let mut items = Vec::new();
        for item in table.iter()? {
            let (_, data) = item?;
            let value: T = serde_json::from_slice(data.value())?;
            if keep(&value) {
                items.push(value);
            }
        }
        Ok(items)
    }

    fn scan_search(
        &self,
        mut keep: impl FnMut(&str, &str) -> bool,
    ) -> StorageResult<Vec<SearchIndexEntry>> {
        let db = self.lock()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(SEARCH)?;
        let mut entries = Vec::new();
        for item in table.iter()? {
            let (key, weight) = item?;
            if let Some((term, node_id, field)) = split_search_key(key.value()) {
                if keep(term, node_id) {
                    entries.push(SearchIndexEntry {
                        term: term.to_string(),
                        node_id: node_id.to_string(),
                        field: field.to_string(),
                        weight: weight.value(),
                    });
                }
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl StorageBackend for RedbStorage {
    fn name(&self) -> &'static str {
        "redb"
    }

    async fn initialize_schema(&self) -> StorageResult<()> {
        let db = self.lock()?;
        let write_txn = db.begin_write()?;
        WriteTables::open(&write_txn)?;
        write_txn.commit()?;
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        let db = self.lock()?;
        db.begin_read()?;
        Ok(true)
    }

    async fn run_in_transaction(&self, tx: Transaction) -> StorageResult<()> {
        let db = self.lock()?;
        let write_txn = db.begin_write()?;
        let applied = WriteTables::open(&write_txn).and_then(|mut tables| {
            for op in tx.into_ops() {
                tables.apply(op)?;
            }
            Ok(())
        });
        match applied {
            Ok(()) => {
                write_txn.commit()?;
                Ok(())
            }
            Err(e) => {
                write_txn.abort()?;
                Err(e)
            }
        }
    }

    async fn get_node(&self, id: &NodeId) -> StorageResult<Option<Node>> {
        self.get_data(NODES, &id.to_string())
    }

    async fn query_nodes(
        &self,
        conditions: &Conditions,
        pagination: Pagination,
    ) -> StorageResult<Vec<Node>> {
        check_conditions(conditions, EntityKind::Node)?;
        let nodes = self.scan_data(NODES, |node: &Node| conditions.matches_node(node))?;
        Ok(pagination.apply(nodes.into_iter()))
    }

    async fn get_edge(&self, id: &EdgeId) -> StorageResult<Option<Edge>> {
        self.get_data(EDGES, &id.to_string())
    }

    async fn query_edges(
        &self,
        conditions: &Conditions,
        pagination: Pagination,
    ) -> StorageResult<Vec<Edge>> {
        check_conditions(conditions, EntityKind::Edge)?;
        let edges = self.scan_data(EDGES, |edge: &Edge| conditions.matches_edge(edge))?;
        Ok(pagination.apply(edges.into_iter()))
    }

    async fn lookup_index(
        &self,
        family: IndexFamily,
        lookup: &IndexLookup,
    ) -> StorageResult<Vec<String>> {
        let definition = match family {
            IndexFamily::Node => NODE_INDEX,
            IndexFamily::Edge => EDGE_INDEX,
        };
        let start = match lookup {
            IndexLookup::Exact(key) => format!("{}{}", key, SEP),
            IndexLookup::Prefix(prefix) => prefix.clone(),
        };

        let db = self.lock()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(definition)?;
        let mut ids = Vec::new();
        for item in table.range(start.as_str()..)? {
            let (key, entity_id) = item?;
            if !key.value().starts_with(start.as_str()) {
                break;
            }
            ids.push(entity_id.value().to_string());
        }
        Ok(ids)
    }

    async fn search_terms(&self, term: &str) -> StorageResult<Vec<SearchIndexEntry>> {
        self.scan_search(|row_term, _| row_term.contains(term))
    }

    async fn search_rows_for_node(
        &self,
        node_id: &NodeId,
    ) -> StorageResult<Vec<SearchIndexEntry>> {
        let node_id = node_id.to_string();
        self.scan_search(|_, row_node| row_node == node_id)
    }

    async fn vacuum(&self) -> StorageResult<()> {
        let mut db = self.lock()?;
        let compacted = db
            .compact()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        tracing::info!(compacted, "Compacted ReDB database");
        Ok(())
    }

    async fn stats(&self) -> StorageResult<StorageStats> {
        let db = self.lock()?;
        let read_txn = db.begin_read()?;
        let node_count = read_txn.open_table(NODES)?.len()? as usize;
        let edge_count = read_txn.open_table(EDGES)?.len()? as usize;
        let index_count = read_txn.open_table(NODE_INDEX)?.len()?
            + read_txn.open_table(EDGE_INDEX)?.len()?
            + read_txn.open_table(SEARCH)?.len()?;
        Ok(StorageStats {
            node_count,
            edge_count,
            index_count: index_count as usize,
        })
    }
}
