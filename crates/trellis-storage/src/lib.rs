//! Trellis Storage - Storage backends for the graph engine
//!
//! Every backend stores four tables (nodes, edges, index rows and search
//! rows) behind the [`StorageBackend`] trait.

#![allow(clippy::result_large_err)]

pub mod error;
pub mod migration;
pub mod traits;

#[cfg(feature = "redb")]
pub mod redb;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod memory;

pub use error::{StorageError, StorageResult};
pub use migration::{Migratable, SchemaVersion, CURRENT_VERSION};
pub use traits::{IndexLookup, Row, StorageBackend, StorageStats, Transaction, WriteOp};

#[cfg(feature = "redb")]
pub use redb::RedbStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

pub use memory::MemoryStorage;
