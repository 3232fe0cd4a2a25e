//! Entity store: node and edge CRUD over a storage backend

use crate::indexer;
use std::collections::HashSet;
use std::sync::Arc;
use trellis_core::index::{from_key, from_prefix, to_key, to_prefix, type_key};
use trellis_core::limits::{validate_confidence, validate_label, validate_type};
use trellis_core::{
    Conditions, Direction, Edge, EdgeId, EdgeUpdate, EngineConfig, EntityKind, Error,
    IndexFamily, NewEdge, NewNode, Node, NodeId, NodeUpdate, Pagination, Result,
};
use trellis_storage::{IndexLookup, StorageBackend, StorageStats, Transaction};

/// Typed graph engine
///
/// Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct GraphEngine {
    backend: Arc<dyn StorageBackend>,
    config: EngineConfig,
}

impl GraphEngine {
    /// Create an engine with the default configuration
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_config(backend, EngineConfig::default())
    }

    pub fn with_config(backend: Arc<dyn StorageBackend>, config: EngineConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Prepare the backend schema and check the backend answers
    pub async fn initialize(&self) -> Result<()> {
        self.backend.initialize_schema().await?;
        if !self.backend.health_check().await? {
            return Err(Error::Backend(format!(
                "{} backend failed its health check",
                self.backend.name()
            )));
        }
        if !self.backend.supports_transactions() {
            tracing::warn!(
                "Backend {} is not transactional; index rows may drift after a failure",
                self.backend.name()
            );
        }
        Ok(())
    }

    /// Release the backend
    pub async fn close(&self) -> Result<()> {
        self.backend.close().await?;
        tracing::debug!("Closed {} backend", self.backend.name());
        Ok(())
    }

    pub(crate) async fn commit(&self, tx: Transaction) -> Result<()> {
        tracing::trace!("Committing {} writes", tx.len());
        self.backend.run_in_transaction(tx).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Nodes
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a node together with its type and search rows
    pub async fn create_node(&self, new: NewNode) -> Result<Node> {
        validate_type(&new.node_type)?;
        validate_label(&new.label)?;
        validate_confidence(new.confidence)?;

        let node = Node::from_new(new);
        let mut tx = Transaction::new();
        indexer::insert_node(&mut tx, &node);
        self.commit(tx).await?;

        tracing::info!("Created node {} ({}: {})", node.id, node.node_type, node.label);
        Ok(node)
    }

    pub async fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        Ok(self.backend.get_node(id).await?)
    }

    /// Fetch several nodes; unknown ids are omitted
    pub async fn get_nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        Ok(self.backend.get_nodes(ids).await?)
    }

    /// Apply `update` to a node. Returns `None` when the node does not exist.
    ///
    /// With `merge_properties` the incoming properties are laid over the
    /// stored map, otherwise they replace it.
    pub async fn update_node(
        &self,
        id: &NodeId,
        update: NodeUpdate,
        merge_properties: bool,
    ) -> Result<Option<Node>> {
        if let Some(node_type) = &update.node_type {
            validate_type(node_type)?;
        }
        if let Some(label) = &update.label {
            validate_label(label)?;
        }
        if let Some(confidence) = update.confidence {
            validate_confidence(confidence)?;
        }

        let Some(mut node) = self.backend.get_node(id).await? else {
            return Ok(None);
        };
        let (text_changed, type_changed) = update.apply(&mut node, merge_properties);

        let mut tx = Transaction::new();
        indexer::update_node(&mut tx, &node, text_changed, type_changed);
        self.commit(tx).await?;

        tracing::info!("Updated node {}", node.id);
        Ok(Some(node))
    }

    /// Delete a node and every edge touching it
    pub async fn delete_node(&self, id: &NodeId) -> Result<bool> {
        if self.backend.get_node(id).await?.is_none() {
            return Ok(false);
        }
        let incident = self.adjacent_edge_ids(id, Direction::Both, &[]).await?;

        let mut tx = Transaction::new();
        indexer::delete_node(&mut tx, id, &incident);
        self.commit(tx).await?;

        tracing::info!("Deleted node {} and {} incident edges", id, incident.len());
        Ok(true)
    }

    /// Nodes matching every condition, in storage order
    pub async fn query_nodes(
        &self,
        conditions: &Conditions,
        pagination: Pagination,
    ) -> Result<Vec<Node>> {
        conditions.validate(EntityKind::Node)?;
        Ok(self.backend.query_nodes(conditions, pagination).await?)
    }

    /// Nodes of one type, through the type index
    pub async fn nodes_by_type(&self, node_type: &str) -> Result<Vec<Node>> {
        let ids = self
            .backend
            .lookup_index(IndexFamily::Node, &IndexLookup::Exact(type_key(node_type)))
            .await?;
        let ids = parse_ids(ids, |s| NodeId::from_string(s).ok())?;
        self.get_nodes(&ids).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Edges
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an edge; both endpoints must exist.
    ///
    /// A bidirectional request also stores the reversed edge in the same
    /// transaction. The forward edge is returned.
    pub async fn create_edge(&self, new: NewEdge) -> Result<Edge> {
        validate_type(&new.edge_type)?;
        validate_confidence(new.confidence)?;

        for endpoint in [new.from_node_id, new.to_node_id] {
            if self.backend.get_node(&endpoint).await?.is_none() {
                return Err(Error::EndpointNotFound {
                    node_id: endpoint.to_string(),
                });
            }
        }

        let edge = Edge::from_new(&new);
        let mut tx = Transaction::new();
        indexer::insert_edge(&mut tx, &edge);
        if new.bidirectional {
            let reverse = Edge::from_new(&new.reversed());
            indexer::insert_edge(&mut tx, &reverse);
        }
        self.commit(tx).await?;

        tracing::info!(
            "Created edge {} ({} -[{}]-> {}){}",
            edge.id,
            edge.from_node_id,
            edge.edge_type,
            edge.to_node_id,
            if new.bidirectional { " with reverse" } else { "" }
        );
        Ok(edge)
    }

    pub async fn get_edge(&self, id: &EdgeId) -> Result<Option<Edge>> {
        Ok(self.backend.get_edge(id).await?)
    }

    /// Fetch several edges; unknown ids are omitted
    pub async fn get_edges(&self, ids: &[EdgeId]) -> Result<Vec<Edge>> {
        Ok(self.backend.get_edges(ids).await?)
    }

    /// Apply `update` to an edge. Returns `None` when the edge does not exist.
    pub async fn update_edge(
        &self,
        id: &EdgeId,
        update: EdgeUpdate,
        merge_properties: bool,
    ) -> Result<Option<Edge>> {
        if let Some(edge_type) = &update.edge_type {
            validate_type(edge_type)?;
        }
        if let Some(confidence) = update.confidence {
            validate_confidence(confidence)?;
        }

        let Some(mut edge) = self.backend.get_edge(id).await? else {
            return Ok(None);
        };
        let type_changed = update.apply(&mut edge, merge_properties);

        let mut tx = Transaction::new();
        indexer::update_edge(&mut tx, &edge, type_changed);
        self.commit(tx).await?;

        tracing::info!("Updated edge {}", edge.id);
        Ok(Some(edge))
    }

    pub async fn delete_edge(&self, id: &EdgeId) -> Result<bool> {
        if self.backend.get_edge(id).await?.is_none() {
            return Ok(false);
        }
        let mut tx = Transaction::new();
        indexer::delete_edge(&mut tx, id);
        self.commit(tx).await?;

        tracing::info!("Deleted edge {}", id);
        Ok(true)
    }

    /// Edges matching every condition, in storage order
    pub async fn query_edges(
        &self,
        conditions: &Conditions,
        pagination: Pagination,
    ) -> Result<Vec<Edge>> {
        conditions.validate(EntityKind::Edge)?;
        Ok(self.backend.query_edges(conditions, pagination).await?)
    }

    /// Edges of one type, through the type index
    pub async fn edges_by_type(&self, edge_type: &str) -> Result<Vec<Edge>> {
        let ids = self
            .backend
            .lookup_index(IndexFamily::Edge, &IndexLookup::Exact(type_key(edge_type)))
            .await?;
        let ids = parse_ids(ids, |s| EdgeId::from_string(s).ok())?;
        self.get_edges(&ids).await
    }

    /// Outgoing edges of a node, optionally of a single type
    pub async fn edges_from(&self, node: &NodeId, edge_type: Option<&str>) -> Result<Vec<Edge>> {
        let types: Vec<String> = edge_type.into_iter().map(String::from).collect();
        let ids = self.adjacent_edge_ids(node, Direction::Outgoing, &types).await?;
        self.get_edges(&ids).await
    }

    /// Incoming edges of a node, optionally of a single type
    pub async fn edges_to(&self, node: &NodeId, edge_type: Option<&str>) -> Result<Vec<Edge>> {
        let types: Vec<String> = edge_type.into_iter().map(String::from).collect();
        let ids = self.adjacent_edge_ids(node, Direction::Incoming, &types).await?;
        self.get_edges(&ids).await
    }

    /// Ids of edges touching `node` in `direction`, via the adjacency index.
    ///
    /// An empty `edge_types` list uses a key-prefix scan; otherwise one exact
    /// lookup per type. Self-loops are reported once.
    pub(crate) async fn adjacent_edge_ids(
        &self,
        node: &NodeId,
        direction: Direction,
        edge_types: &[String],
    ) -> Result<Vec<EdgeId>> {
        let node_id = node.to_string();
        let mut lookups = Vec::new();
        if direction.includes_outgoing() {
            if edge_types.is_empty() {
                lookups.push(IndexLookup::Prefix(from_prefix(&node_id)));
            } else {
                lookups.extend(
                    edge_types
                        .iter()
                        .map(|t| IndexLookup::Exact(from_key(&node_id, t))),
                );
            }
        }
        if direction.includes_incoming() {
            if edge_types.is_empty() {
                lookups.push(IndexLookup::Prefix(to_prefix(&node_id)));
            } else {
                lookups.extend(
                    edge_types
                        .iter()
                        .map(|t| IndexLookup::Exact(to_key(&node_id, t))),
                );
            }
        }

        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for lookup in &lookups {
            for raw in self.backend.lookup_index(IndexFamily::Edge, lookup).await? {
                if seen.insert(raw.clone()) {
                    ids.push(raw);
                }
            }
        }
        parse_ids(ids, |s| EdgeId::from_string(s).ok())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn stats(&self) -> Result<StorageStats> {
        Ok(self.backend.stats().await?)
    }

    pub async fn vacuum(&self) -> Result<()> {
        self.backend.vacuum().await?;
        Ok(())
    }
}

/// Parse index entity ids; a malformed id means the index is corrupt.
fn parse_ids<T>(raw: Vec<String>, parse: impl Fn(&str) -> Option<T>) -> Result<Vec<T>> {
    raw.iter()
        .map(|s| parse(s).ok_or_else(|| Error::Internal(format!("Malformed id in index: {}", s))))
        .collect()
}
