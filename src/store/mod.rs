//! Range-indexed store boundary.
//!
//! The store itself is an external collaborator reached through the
//! [`RangeStore`] trait: single-item put, batched put of at most
//! [`MAX_BATCH_ITEMS`] items, and range/filter query. [`RangeStoreClient`]
//! is the adapter the services use; it owns chunking of larger batches.
//!
//! Two backends are provided: [`MemoryRangeStore`] for tests and
//! persistence-disabled runs, and [`PostgresRangeStore`] which keeps items
//! as JSONB rows keyed by table, partition and sort key.

pub mod cursor;
pub mod memory;
pub mod postgres;
pub mod query;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

pub use cursor::{Cursor, ScanPosition};
pub use memory::MemoryRangeStore;
pub use postgres::PostgresRangeStore;
pub use query::{
    FilterExpr, IndexDefinition, Item, KeySchema, QueryPage, QuerySpec, ScanDirection,
    SortKeyCondition, TableDefinition,
};

use crate::error::GatewayError;

/// Largest number of items a single [`RangeStore::batch_put`] accepts.
pub const MAX_BATCH_ITEMS: usize = 25;

/// Narrow interface of the external range-indexed store.
///
/// Implementations never retry. Writes overwrite any item with the same
/// primary key.
#[async_trait]
pub trait RangeStore: fmt::Debug + Send + Sync {
    /// Writes one item.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreWriteFailed`] when the table is unknown,
    /// the item lacks its key attributes, or the backend fails.
    async fn put(&self, table: &str, item: Item) -> Result<(), GatewayError>;

    /// Writes up to [`MAX_BATCH_ITEMS`] items in one call.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreWriteFailed`] when the batch is too
    /// large, any item lacks its key attributes, or the backend fails.
    async fn batch_put(&self, table: &str, items: Vec<Item>) -> Result<(), GatewayError>;

    /// Runs one range query.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ValidationFailed`] for a malformed cursor and
    /// [`GatewayError::QueryFailed`] for unknown tables or indexes and
    /// backend failures.
    async fn query(&self, table: &str, spec: &QuerySpec) -> Result<QueryPage, GatewayError>;
}

/// Adapter used by the services to reach a [`RangeStore`].
#[derive(Debug, Clone)]
pub struct RangeStoreClient {
    store: Arc<dyn RangeStore>,
}

impl RangeStoreClient {
    /// Wraps a store backend.
    #[must_use]
    pub fn new(store: Arc<dyn RangeStore>) -> Self {
        Self { store }
    }

    /// Writes one item.
    ///
    /// # Errors
    ///
    /// Propagates [`GatewayError::StoreWriteFailed`] from the backend.
    pub async fn put_item(&self, table: &str, item: Item) -> Result<(), GatewayError> {
        self.store.put(table, item).await?;
        tracing::debug!(table, "item stored");
        Ok(())
    }

    /// Writes any number of items, [`MAX_BATCH_ITEMS`] per call.
    ///
    /// Chunks are written strictly in order and one at a time. The first
    /// failing chunk aborts the rest; chunks already written stay written.
    /// Returns the number of items written.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreWriteFailed`] naming the failing chunk.
    pub async fn batch_put_items(
        &self,
        table: &str,
        items: Vec<Item>,
    ) -> Result<usize, GatewayError> {
        let total = items.len();
        let mut written = 0;
        let mut remaining = items.into_iter().peekable();
        let mut chunk_index = 0;

        while remaining.peek().is_some() {
            let chunk: Vec<Item> = remaining.by_ref().take(MAX_BATCH_ITEMS).collect();
            let size = chunk.len();
            self.store.batch_put(table, chunk).await.map_err(|e| {
                tracing::warn!(
                    table,
                    chunk = chunk_index,
                    written,
                    total,
                    error = %e,
                    "batch write aborted"
                );
                GatewayError::StoreWriteFailed(format!(
                    "batch insert into table '{table}' failed at chunk {chunk_index} after {written} of {total} items: {}",
                    store_reason(e)
                ))
            })?;
            written += size;
            chunk_index += 1;
            tracing::debug!(table, size, written, total, "batch chunk stored");
        }

        Ok(written)
    }

    /// Runs one range query.
    ///
    /// # Errors
    ///
    /// Propagates [`GatewayError::QueryFailed`] and
    /// [`GatewayError::ValidationFailed`] from the backend.
    pub async fn query(&self, table: &str, spec: &QuerySpec) -> Result<QueryPage, GatewayError> {
        self.store.query(table, spec).await
    }
}

/// Strips the variant prefix so wrapped messages do not repeat it.
fn store_reason(err: GatewayError) -> String {
    match err {
        GatewayError::StoreWriteFailed(reason) | GatewayError::QueryFailed(reason) => reason,
        other => other.to_string(),
    }
}
