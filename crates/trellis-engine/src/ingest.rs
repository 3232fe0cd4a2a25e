//! Ingestion of extracted records
//!
//! An extractor produces candidate nodes and edges keyed by label; this
//! module resolves them against the stored graph and applies a
//! [`MergeStrategy`]. Every touched entity gets the session id added to its
//! provenance.

use crate::engine::GraphEngine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use trellis_core::{
    Conditions, EdgeUpdate, Error, NewEdge, NewNode, NodeId, NodeUpdate, Pagination, Properties,
    Result,
};

fn default_confidence() -> f64 {
    1.0
}

/// A node candidate from an extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedNode {
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// An edge candidate whose endpoints are given by label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEdge {
    #[serde(rename = "type")]
    pub edge_type: String,
    pub from_label: String,
    pub to_label: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// One extractor run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionBatch {
    #[serde(default)]
    pub nodes: Vec<ExtractedNode>,
    #[serde(default)]
    pub edges: Vec<ExtractedEdge>,
}

/// What to do when a candidate matches a stored entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Lay the candidate's properties over the stored ones; keep the higher confidence
    #[default]
    Merge,
    /// Overwrite properties and confidence with the candidate's
    Replace,
    /// Leave the stored entity untouched
    Skip,
}

impl FromStr for MergeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            "skip" => Ok(Self::Skip),
            other => Err(Error::Validation(format!(
                "Unknown merge strategy '{}'. Valid options: merge, replace, skip",
                other
            ))),
        }
    }
}

/// Counts and per-item failures of an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub nodes_created: usize,
    pub nodes_updated: usize,
    pub nodes_skipped: usize,
    pub edges_created: usize,
    pub edges_updated: usize,
    pub edges_skipped: usize,
    pub failures: Vec<String>,
}

enum Outcome {
    Created,
    Updated,
    Skipped,
}

impl GraphEngine {
    /// Resolve and store an extraction batch.
    ///
    /// Node candidates match a stored node with the same type and label.
    /// Edge endpoints resolve first against this batch's nodes, then against
    /// any stored node with that label; edges match on `(type, from, to)`.
    /// Item failures are collected in the report, not returned.
    pub async fn ingest(
        &self,
        batch: ExtractionBatch,
        strategy: MergeStrategy,
        session_id: &str,
    ) -> Result<IngestReport> {
        self.check_ingest_size(&batch)?;

        let mut report = IngestReport::default();
        let mut by_label: HashMap<String, NodeId> = HashMap::new();

        for candidate in batch.nodes {
            let label = candidate.label.clone();
            match self.ingest_node(candidate, strategy, session_id).await {
                Ok((id, outcome)) => {
                    by_label.entry(label).or_insert(id);
                    match outcome {
                        Outcome::Created => report.nodes_created += 1,
                        Outcome::Updated => report.nodes_updated += 1,
                        Outcome::Skipped => report.nodes_skipped += 1,
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to ingest node '{}': {}", label, e);
                    report.failures.push(format!("node '{}': {}", label, e));
                }
            }
        }

        for candidate in batch.edges {
            let description = format!(
                "{} -[{}]-> {}",
                candidate.from_label, candidate.edge_type, candidate.to_label
            );
            match self
                .ingest_edge(candidate, &by_label, strategy, session_id)
                .await
            {
                Ok(Outcome::Created) => report.edges_created += 1,
                Ok(Outcome::Updated) => report.edges_updated += 1,
                Ok(Outcome::Skipped) => report.edges_skipped += 1,
                Err(e) => {
                    tracing::warn!("Failed to ingest edge {}: {}", description, e);
                    report.failures.push(format!("edge {}: {}", description, e));
                }
            }
        }

        tracing::info!(
            "Ingested session {}: {} nodes created, {} updated; {} edges created, {} updated; {} failures",
            session_id,
            report.nodes_created,
            report.nodes_updated,
            report.edges_created,
            report.edges_updated,
            report.failures.len()
        );
        Ok(report)
    }

    fn check_ingest_size(&self, batch: &ExtractionBatch) -> Result<()> {
        let max = self.config().max_batch_size;
        trellis_core::limits::validate_batch_size(batch.nodes.len(), max)?;
        trellis_core::limits::validate_batch_size(batch.edges.len(), max)?;
        Ok(())
    }

    async fn ingest_node(
        &self,
        candidate: ExtractedNode,
        strategy: MergeStrategy,
        session_id: &str,
    ) -> Result<(NodeId, Outcome)> {
        let conditions = Conditions::new()
            .eq("type", candidate.node_type.as_str())
            .eq("label", candidate.label.as_str());
        let existing = self
            .query_nodes(&conditions, Pagination::new(1, 0))
            .await?
            .into_iter()
            .next();

        let Some(existing) = existing else {
            let node = self
                .create_node(
                    NewNode::new(candidate.node_type, candidate.label)
                        .with_properties(candidate.properties)
                        .with_confidence(candidate.confidence)
                        .with_session(session_id),
                )
                .await?;
            return Ok((node.id, Outcome::Created));
        };

        let (update, merge) = match strategy {
            MergeStrategy::Skip => return Ok((existing.id, Outcome::Skipped)),
            MergeStrategy::Merge => (
                NodeUpdate::new()
                    .properties(candidate.properties)
                    .confidence(existing.confidence.max(candidate.confidence)),
                true,
            ),
            MergeStrategy::Replace => (
                NodeUpdate::new()
                    .properties(candidate.properties)
                    .confidence(candidate.confidence),
                false,
            ),
        };
        self.update_node(&existing.id, update.session(session_id), merge)
            .await?;
        Ok((existing.id, Outcome::Updated))
    }

    async fn resolve_label(&self, label: &str, by_label: &HashMap<String, NodeId>) -> Result<NodeId> {
        if let Some(id) = by_label.get(label) {
            return Ok(*id);
        }
        self.query_nodes(&Conditions::new().eq("label", label), Pagination::new(1, 0))
            .await?
            .first()
            .map(|node| node.id)
            .ok_or_else(|| Error::NotFound(format!("no node labelled '{}'", label)))
    }

    async fn ingest_edge(
        &self,
        candidate: ExtractedEdge,
        by_label: &HashMap<String, NodeId>,
        strategy: MergeStrategy,
        session_id: &str,
    ) -> Result<Outcome> {
        let from = self.resolve_label(&candidate.from_label, by_label).await?;
        let to = self.resolve_label(&candidate.to_label, by_label).await?;

        let conditions = Conditions::new()
            .eq("type", candidate.edge_type.as_str())
            .eq("from_node_id", from.to_string())
            .eq("to_node_id", to.to_string());
        let existing = self
            .query_edges(&conditions, Pagination::new(1, 0))
            .await?
            .into_iter()
            .next();

        let Some(existing) = existing else {
            self.create_edge(
                NewEdge::new(from, to, candidate.edge_type)
                    .with_properties(candidate.properties)
                    .with_confidence(candidate.confidence)
                    .with_session(session_id),
            )
            .await?;
            return Ok(Outcome::Created);
        };

        let (update, merge) = match strategy {
            MergeStrategy::Skip => return Ok(Outcome::Skipped),
            MergeStrategy::Merge => (
                EdgeUpdate::new()
                    .properties(candidate.properties)
                    .confidence(existing.confidence.max(candidate.confidence)),
                true,
            ),
            MergeStrategy::Replace => (
                EdgeUpdate::new()
                    .properties(candidate.properties)
                    .confidence(candidate.confidence),
                false,
            ),
        };
        self.update_edge(&existing.id, update.session(session_id), merge)
            .await?;
        Ok(Outcome::Updated)
    }
}
