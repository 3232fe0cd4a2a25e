//! Batch operation coordinator
//!
//! Items are applied one by one; a failing item is recorded and the batch
//! carries on. Earlier successes are never rolled back.

use crate::engine::GraphEngine;
use trellis_core::limits::validate_batch_size;
use trellis_core::{Edge, EdgeId, Error, NewEdge, NewNode, Node, NodeId, Result};

/// An item that could not be applied
#[derive(Debug)]
pub struct BatchFailure<I> {
    pub item: I,
    pub error: Error,
}

/// Outcome of a batch call
#[derive(Debug)]
pub struct BatchResult<T, I> {
    pub successful: Vec<T>,
    pub failed: Vec<BatchFailure<I>>,
}

impl<T, I> Default for BatchResult<T, I> {
    fn default() -> Self {
        Self {
            successful: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T, I> BatchResult<T, I> {
    fn record(&mut self, item: I, outcome: Result<T>) {
        match outcome {
            Ok(value) => self.successful.push(value),
            Err(error) => self.failed.push(BatchFailure { item, error }),
        }
    }

    pub fn success_count(&self) -> usize {
        self.successful.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl GraphEngine {
    fn check_batch(&self, count: usize) -> Result<()> {
        validate_batch_size(count, self.config().max_batch_size)?;
        Ok(())
    }

    pub async fn batch_create_nodes(&self, items: Vec<NewNode>) -> Result<BatchResult<Node, NewNode>> {
        self.check_batch(items.len())?;
        let mut result = BatchResult::default();
        for item in items {
            let outcome = self.create_node(item.clone()).await;
            result.record(item, outcome);
        }
        log_batch("create_nodes", &result);
        Ok(result)
    }

    pub async fn batch_create_edges(&self, items: Vec<NewEdge>) -> Result<BatchResult<Edge, NewEdge>> {
        self.check_batch(items.len())?;
        let mut result = BatchResult::default();
        for item in items {
            let outcome = self.create_edge(item.clone()).await;
            result.record(item, outcome);
        }
        log_batch("create_edges", &result);
        Ok(result)
    }

    /// Delete nodes; an unknown id is a `NotFound` failure
    pub async fn batch_delete_nodes(&self, ids: Vec<NodeId>) -> Result<BatchResult<NodeId, NodeId>> {
        self.check_batch(ids.len())?;
        let mut result = BatchResult::default();
        for id in ids {
            let outcome = match self.delete_node(&id).await {
                Ok(true) => Ok(id),
                Ok(false) => Err(Error::NotFound(format!("node {}", id))),
                Err(e) => Err(e),
            };
            result.record(id, outcome);
        }
        log_batch("delete_nodes", &result);
        Ok(result)
    }

    /// Delete edges; an unknown id is a `NotFound` failure
    pub async fn batch_delete_edges(&self, ids: Vec<EdgeId>) -> Result<BatchResult<EdgeId, EdgeId>> {
        self.check_batch(ids.len())?;
        let mut result = BatchResult::default();
        for id in ids {
            let outcome = match self.delete_edge(&id).await {
                Ok(true) => Ok(id),
                Ok(false) => Err(Error::NotFound(format!("edge {}", id))),
                Err(e) => Err(e),
            };
            result.record(id, outcome);
        }
        log_batch("delete_edges", &result);
        Ok(result)
    }
}

fn log_batch<T, I>(operation: &str, result: &BatchResult<T, I>) {
    if result.is_complete() {
        tracing::info!("Batch {}: {} succeeded", operation, result.success_count());
    } else {
        tracing::warn!(
            "Batch {}: {} succeeded, {} failed",
            operation,
            result.success_count(),
            result.failure_count()
        );
    }
}
