//! Trellis Core - Data model for the typed graph engine
//!
//! This crate provides the node/edge types, secondary index rows, query
//! types, validation limits and configuration shared by the storage
//! backends and the engine.

pub mod config;
pub mod edge;
pub mod error;
pub mod index;
pub mod limits;
pub mod node;
pub mod query;
pub mod traversal;

pub use config::EngineConfig;
pub use edge::{Direction, Edge, EdgeId, EdgeUpdate, NewEdge};
pub use error::{Error, Result};
pub use index::{IndexEntry, IndexFamily, SearchIndexEntry};
pub use node::{NewNode, Node, NodeId, NodeUpdate, Properties};
pub use query::{Conditions, EntityKind, Pagination, SearchQuery};
pub use traversal::{GraphPath, PathQuery, TraversalQuery, TraversalResult, TraversalStats};
