//! Trellis Engine - typed graph engine over a pluggable storage backend
//!
//! [`GraphEngine`] owns a [`trellis_storage::StorageBackend`] and layers the
//! graph semantics on top of it: entity CRUD with index maintenance,
//! traversal and shortest paths, term search, batch operations, ingestion
//! of extracted records, and the [`GraphAnalytics`] algorithms.

#![allow(clippy::result_large_err)]

pub mod analytics;
pub mod batch;
pub mod engine;
pub mod indexer;
pub mod ingest;
pub mod search;
pub mod traversal;

pub use analytics::{Cycle, GraphAnalytics, PageRankConfig};
pub use batch::{BatchFailure, BatchResult};
pub use engine::GraphEngine;
pub use indexer::RebuildReport;
pub use ingest::{
    ExtractedEdge, ExtractedNode, ExtractionBatch, IngestReport, MergeStrategy,
};
pub use search::SearchHit;
