use anyhow::Result;
use async_trait::async_trait;

use crate::dynamodb::{Record, RecordQuery, RecordUpdate};

/// Storage operations the record store is built on.
///
/// Implemented by [`DynamoDb`] for the real table and by
/// [`InMemoryBackend`] for tests and local runs. Implementations should stay
/// thin: one call maps to one request against the store, and failures are
/// returned unchanged for the caller to log.
///
/// [`DynamoDb`]: crate::dynamodb::DynamoDb
/// [`InMemoryBackend`]: crate::dynamodb::InMemoryBackend
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Writes a record, replacing any record with the same primary key.
    async fn put_record(&self, record: Record) -> Result<()>;

    async fn get_record(&self, partition_key: &str, sort_key: &str) -> Result<Option<Record>>;

    /// Returns the first page of matches in store order.
    async fn query_records(&self, query: &RecordQuery) -> Result<Vec<Record>>;

    /// Applies a partial update and returns the record as now stored.
    /// Updating a missing record creates it.
    async fn update_record(&self, update: RecordUpdate) -> Result<Record>;

    /// Removes a record, returning what was stored, if anything.
    async fn delete_record(&self, partition_key: &str, sort_key: &str) -> Result<Option<Record>>;
}
