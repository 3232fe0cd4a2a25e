//! SQLite storage backend
//!
//! Entities are stored as JSON in a `data` column next to the columns that
//! conditions can filter on. Edges reference nodes, and edge-index rows
//! reference edges, with `ON DELETE CASCADE`, so removing an edge drops its
//! adjacency rows inside the same statement.

use crate::error::{StorageError, StorageResult};
use crate::migration::Migratable;
use crate::traits::{
    check_conditions, IndexLookup, Row, StorageBackend, StorageStats, Transaction, WriteOp,
};
use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use trellis_core::{
    Conditions, Edge, EdgeId, EntityKind, IndexFamily, Node, NodeId, Pagination,
    SearchIndexEntry,
};

const SCHEMA_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS nodes (
        id TEXT PRIMARY KEY,
        type TEXT NOT NULL,
        label TEXT NOT NULL,
        confidence REAL NOT NULL,
        data TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS edges (
        id TEXT PRIMARY KEY,
        type TEXT NOT NULL,
        from_node_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
        to_node_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
        confidence REAL NOT NULL,
        data TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes(type);
    CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label);
    CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_node_id);
    CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_node_id);
"#;

const SCHEMA_V2: &str = r#"
    CREATE TABLE IF NOT EXISTS node_index (
        index_key TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        PRIMARY KEY (index_key, entity_id)
    );

    CREATE TABLE IF NOT EXISTS edge_index (
        index_key TEXT NOT NULL,
        entity_id TEXT NOT NULL REFERENCES edges(id) ON DELETE CASCADE,
        PRIMARY KEY (index_key, entity_id)
    );

    CREATE TABLE IF NOT EXISTS search_index (
        term TEXT NOT NULL,
        node_id TEXT NOT NULL,
        field TEXT NOT NULL,
        weight REAL NOT NULL DEFAULT 1.0,
        PRIMARY KEY (term, node_id, field)
    );

    CREATE INDEX IF NOT EXISTS idx_node_index_entity ON node_index(entity_id);
    CREATE INDEX IF NOT EXISTS idx_edge_index_entity ON edge_index(entity_id);
    CREATE INDEX IF NOT EXISTS idx_search_node ON search_index(node_id);
"#;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open or create a SQLite database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path).map_err(|e| StorageError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Create an in-memory SQLite database (for testing)
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        {
            let conn = self.lock()?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);",
            )?;
        }
        self.migrate_to_latest()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn apply_op(conn: &Connection, op: WriteOp) -> StorageResult<()> {
        match op {
            WriteOp::PutNode(node) => {
                let data = serde_json::to_string(&node)?;
                conn.execute(
                    "INSERT INTO nodes (id, type, label, confidence, data) VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET type = excluded.type, label = excluded.label,
                         confidence = excluded.confidence, data = excluded.data",
                    params![node.id.to_string(), node.node_type, node.label, node.confidence, data],
                )?;
            }
            WriteOp::DeleteNode(id) => {
                conn.execute("DELETE FROM nodes WHERE id = ?1", params![id.to_string()])?;
            }
            WriteOp::PutEdge(edge) => {
                let data = serde_json::to_string(&edge)?;
                conn.execute(
                    "INSERT INTO edges (id, type, from_node_id, to_node_id, confidence, data)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET type = excluded.type,
                         from_node_id = excluded.from_node_id, to_node_id = excluded.to_node_id,
                         confidence = excluded.confidence, data = excluded.data",
                    params![
                        edge.id.to_string(),
                        edge.edge_type,
                        edge.from_node_id.to_string(),
                        edge.to_node_id.to_string(),
                        edge.confidence,
                        data
                    ],
                )?;
            }
            WriteOp::DeleteEdge(id) => {
                conn.execute("DELETE FROM edges WHERE id = ?1", params![id.to_string()])?;
            }
            WriteOp::InsertIndex(entry) => {
                let sql = format!(
                    "INSERT OR IGNORE INTO {} (index_key, entity_id) VALUES (?1, ?2)",
                    index_table(entry.family)
                );
                conn.execute(&sql, params![entry.index_key, entry.entity_id])?;
            }
            WriteOp::DeleteIndexRows { family, entity_id } => {
                let sql = format!("DELETE FROM {} WHERE entity_id = ?1", index_table(family));
                conn.execute(&sql, params![entity_id])?;
            }
            WriteOp::InsertSearch(entry) => {
                conn.execute(
                    "INSERT INTO search_index (term, node_id, field, weight) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(term, node_id, field) DO UPDATE SET weight = weight + excluded.weight",
                    params![entry.term, entry.node_id, entry.field, entry.weight],
                )?;
            }
            WriteOp::DeleteSearchRows { node_id } => {
                conn.execute("DELETE FROM search_index WHERE node_id = ?1", params![node_id])?;
            }
        }
        Ok(())
    }

    fn get_data<T: DeserializeOwned>(&self, table: &str, id: &str) -> StorageResult<Option<T>> {
        let conn = self.lock()?;
        let sql = format!("SELECT data FROM {} WHERE id = ?1", table);
        let data: Option<String> = conn
            .query_row(&sql, params![id], |row| row.get(0))
            .optional()?;
        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    fn query_data<T: DeserializeOwned>(
        &self,
        table: &str,
        conditions: &Conditions,
        pagination: Pagination,
    ) -> StorageResult<Vec<T>> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        for (field, value) in conditions.iter() {
            clauses.push(format!("{} = ?{}", field, values.len() + 1));
            values.push(match value {
                Value::Number(n) => SqlValue::Real(n.as_f64().unwrap_or_default()),
                Value::String(s) => SqlValue::Text(s.clone()),
                other => SqlValue::Text(other.to_string()),
            });
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let limit = pagination.limit.map(|l| l as i64).unwrap_or(-1);
        values.push(SqlValue::Integer(limit));
        values.push(SqlValue::Integer(pagination.offset as i64));
        let sql = format!(
            "SELECT data FROM {}{} ORDER BY rowid LIMIT ?{} OFFSET ?{}",
            table,
            where_clause,
            values.len() - 1,
            values.len()
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))?;

        let mut items = Vec::new();
        for row in rows {
            let data = row?;
            items.push(serde_json::from_str(&data)?);
        }
        Ok(items)
    }

    fn search_rows(&self, sql: &str, param: &str) -> StorageResult<Vec<SearchIndexEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![param], |row| {
            Ok(SearchIndexEntry {
                term: row.get(0)?,
                node_id: row.get(1)?,
                field: row.get(2)?,
                weight: row.get(3)?,
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn count(conn: &Connection, table: &str) -> StorageResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn index_table(family: IndexFamily) -> &'static str {
    match family {
        IndexFamily::Node => "node_index",
        IndexFamily::Edge => "edge_index",
    }
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::from(b.to_vec()),
    }
}

impl Migratable for SqliteStorage {
    fn get_schema_version(&self) -> StorageResult<u32> {
        let conn = self.lock()?;
        let version: Option<u32> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
        Ok(version.unwrap_or(0))
    }

    fn set_schema_version(&self, version: u32) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM schema_version", [])?;
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", params![version])?;
        Ok(())
    }

    fn run_migration(&self, version: u32) -> StorageResult<()> {
        let conn = self.lock()?;
        let sql = match version {
            1 => SCHEMA_V1,
            2 => SCHEMA_V2,
            other => {
                return Err(StorageError::Migration(format!(
                    "Unknown schema version {}",
                    other
                )))
            }
        };
        conn.execute_batch(sql)
            .map_err(|e| StorageError::Migration(e.to_string()))
    }
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn initialize_schema(&self) -> StorageResult<()> {
        self.migrate_to_latest()
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(true)
    }

    async fn run_in_transaction(&self, tx: Transaction) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let sql_tx = conn
            .transaction()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;
        for op in tx.into_ops() {
            Self::apply_op(&sql_tx, op)?;
        }
        sql_tx
            .commit()
            .map_err(|e| StorageError::Transaction(e.to_string()))
    }

    async fn execute(&self, query: &str, params: &[Value]) -> StorageResult<Vec<Row>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(query)?;
        let bound: Vec<SqlValue> = params.iter().map(json_to_sql).collect();

        if stmt.column_count() == 0 {
            stmt.execute(params_from_iter(bound.iter()))?;
            return Ok(Vec::new());
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(bound.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = Row::new();
            for (i, column) in columns.iter().enumerate() {
                map.insert(column.clone(), sql_to_json(row.get_ref(i)?));
            }
            out.push(map);
        }
        Ok(out)
    }

    async fn get_node(&self, id: &NodeId) -> StorageResult<Option<Node>> {
        self.get_data("nodes", &id.to_string())
    }

    async fn query_nodes(
        &self,
        conditions: &Conditions,
        pagination: Pagination,
    ) -> StorageResult<Vec<Node>> {
        check_conditions(conditions, EntityKind::Node)?;
        self.query_data("nodes", conditions, pagination)
    }

    async fn get_edge(&self, id: &EdgeId) -> StorageResult<Option<Edge>> {
        self.get_data("edges", &id.to_string())
    }

    async fn query_edges(
        &self,
        conditions: &Conditions,
        pagination: Pagination,
    ) -> StorageResult<Vec<Edge>> {
        check_conditions(conditions, EntityKind::Edge)?;
        self.query_data("edges", conditions, pagination)
    }

    async fn lookup_index(
        &self,
        family: IndexFamily,
        lookup: &IndexLookup,
    ) -> StorageResult<Vec<String>> {
        let table = index_table(family);
        let conn = self.lock()?;
        let (sql, key) = match lookup {
            IndexLookup::Exact(key) => (
                format!(
                    "SELECT entity_id FROM {} WHERE index_key = ?1 ORDER BY rowid",
                    table
                ),
                key,
            ),
            IndexLookup::Prefix(prefix) => (
                format!(
                    "SELECT entity_id FROM {} WHERE substr(index_key, 1, length(?1)) = ?1 ORDER BY rowid",
                    table
                ),
                prefix,
            ),
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    async fn search_terms(&self, term: &str) -> StorageResult<Vec<SearchIndexEntry>> {
        self.search_rows(
            "SELECT term, node_id, field, weight FROM search_index WHERE instr(term, ?1) > 0 ORDER BY rowid",
            term,
        )
    }

    async fn search_rows_for_node(
        &self,
        node_id: &NodeId,
    ) -> StorageResult<Vec<SearchIndexEntry>> {
        self.search_rows(
            "SELECT term, node_id, field, weight FROM search_index WHERE node_id = ?1 ORDER BY rowid",
            &node_id.to_string(),
        )
    }

    async fn vacuum(&self) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("VACUUM;")?;
        tracing::info!("Vacuumed SQLite database");
        Ok(())
    }

    async fn stats(&self) -> StorageResult<StorageStats> {
        let conn = self.lock()?;
        Ok(StorageStats {
            node_count: Self::count(&conn, "nodes")?,
            edge_count: Self::count(&conn, "edges")?,
            index_count: Self::count(&conn, "node_index")?
                + Self::count(&conn, "edge_index")?
                + Self::count(&conn, "search_index")?,
        })
    }
}
