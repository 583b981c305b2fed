use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info};

use crate::dynamodb::table::QueryTarget;
use crate::dynamodb::{DynamoDb, IndexKeys, Record, RecordBackend, RecordQuery, RecordUpdate};
use crate::encoding::sanitize;

/// Sort-key prefix shared by task records.
pub const TASK_PREFIX: &str = "task#";
/// `attributes.status` of a task that is still open.
pub const PENDING_STATUS: &str = "pending";

/// CRUD and query access to the record table.
///
/// Payloads are sanitized before every write. Lookups that find nothing
/// return `None` or an empty list. Backend failures are logged once here
/// and returned unchanged; nothing is retried.
#[derive(Debug, Clone)]
pub struct RecordStore<B = DynamoDb> {
    backend: B,
}

impl<B: RecordBackend> RecordStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Writes a record, overwriting any record with the same keys. Index
    /// keys left unset are not written.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        partition_key: &str,
        sort_key: &str,
        payload: &T,
        index_keys: IndexKeys,
    ) -> Result<()> {
        let attributes = sanitize(payload).with_context(|| {
            format!("failed to serialize attributes of {partition_key}/{sort_key}")
        })?;
        let record = Record::new(partition_key, sort_key, attributes).with_index_keys(index_keys);

        self.backend
            .put_record(record)
            .await
            .inspect_err(|e| error!(partition_key, sort_key, "Error storing record: {e:#}"))?;
        info!(partition_key, sort_key, "Record stored");
        Ok(())
    }

    pub async fn get(&self, partition_key: &str, sort_key: &str) -> Result<Option<Record>> {
        self.backend
            .get_record(partition_key, sort_key)
            .await
            .inspect_err(|e| error!(partition_key, sort_key, "Error fetching record: {e:#}"))
    }

    /// Records in `partition_key` whose sort key starts with `prefix`,
    /// in sort-key order.
    pub async fn query_by_sort_prefix(
        &self,
        partition_key: &str,
        prefix: &str,
    ) -> Result<Vec<Record>> {
        self.query(RecordQuery::partition(partition_key).with_sort_prefix(prefix))
            .await
    }

    pub async fn query_by_index1(&self, key: &str) -> Result<Vec<Record>> {
        self.query(RecordQuery::on(QueryTarget::Index1, key)).await
    }

    pub async fn query_by_index2(&self, key: &str) -> Result<Vec<Record>> {
        self.query(RecordQuery::on(QueryTarget::Index2, key)).await
    }

    pub async fn query_by_index3(&self, key: &str) -> Result<Vec<Record>> {
        self.query(RecordQuery::on(QueryTarget::Index3, key)).await
    }

    /// Equality on `GSI1PK` combined with a prefix match on `GSI1SK`.
    pub async fn query_by_index1_sort_prefix(
        &self,
        key: &str,
        prefix: &str,
    ) -> Result<Vec<Record>> {
        self.query(RecordQuery::on(QueryTarget::Index1, key).with_sort_prefix(prefix))
            .await
    }

    /// Tasks stored under a phone number that are still pending.
    pub async fn query_open_tasks_by_phone(&self, phone_number: &str) -> Result<Vec<Record>> {
        self.query(
            RecordQuery::partition(phone_number)
                .with_sort_prefix(TASK_PREFIX)
                .with_status(PENDING_STATUS),
        )
        .await
    }

    /// Runs an arbitrary single-page query.
    pub async fn query(&self, query: RecordQuery) -> Result<Vec<Record>> {
        self.backend
            .query_records(&query)
            .await
            .inspect_err(|e| error!(?query, "Error querying records: {e:#}"))
    }

    /// Replaces `attributes` as a whole and sets the supplied index keys.
    /// Index keys left unset keep their stored value.
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        partition_key: &str,
        sort_key: &str,
        payload: &T,
        index_keys: IndexKeys,
    ) -> Result<Record> {
        let attributes = sanitize(payload).with_context(|| {
            format!("failed to serialize attributes of {partition_key}/{sort_key}")
        })?;
        let update = RecordUpdate {
            partition_key: partition_key.to_string(),
            sort_key: sort_key.to_string(),
            attributes,
            index_keys,
        };

        let record = self
            .backend
            .update_record(update)
            .await
            .inspect_err(|e| error!(partition_key, sort_key, "Error updating record: {e:#}"))?;
        info!(partition_key, sort_key, "Record updated");
        Ok(record)
    }

    /// Deletes a record and returns what was stored, if anything.
    pub async fn delete(&self, partition_key: &str, sort_key: &str) -> Result<Option<Record>> {
        let removed = self
            .backend
            .delete_record(partition_key, sort_key)
            .await
            .inspect_err(|e| error!(partition_key, sort_key, "Error deleting record: {e:#}"))?;
        info!(partition_key, sort_key, "Record deleted");
        Ok(removed)
    }
}
