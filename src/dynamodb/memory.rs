//! In-memory record backend.
//!
//! Mirrors the DynamoDB semantics the record store relies on: overwrite on
//! put, sort-key order within a partition, sparse secondary indexes, and
//! upsert on update.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::dynamodb::table::QueryTarget;
use crate::dynamodb::{Record, RecordBackend, RecordQuery, RecordUpdate};

type PrimaryKey = (String, String);

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    records: RwLock<BTreeMap<PrimaryKey, Record>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn primary_key(partition_key: &str, sort_key: &str) -> PrimaryKey {
    (partition_key.to_string(), sort_key.to_string())
}

#[async_trait]
impl RecordBackend for InMemoryBackend {
    async fn put_record(&self, record: Record) -> Result<()> {
        let key = primary_key(&record.partition_key, &record.sort_key);
        self.records.write().await.insert(key, record);
        Ok(())
    }

    async fn get_record(&self, partition_key: &str, sort_key: &str) -> Result<Option<Record>> {
        Ok(self
            .records
            .read()
            .await
            .get(&primary_key(partition_key, sort_key))
            .cloned())
    }

    async fn query_records(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        query.prefix_attribute()?;

        let records = self.records.read().await;
        let mut matches: Vec<Record> = records
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();

        // The base table is already in (PK, SK) order.
        if query.target == QueryTarget::Index1 {
            matches.sort_by(|a, b| {
                a.sort_key_for(QueryTarget::Index1)
                    .cmp(&b.sort_key_for(QueryTarget::Index1))
            });
        }
        Ok(matches)
    }

    async fn update_record(&self, update: RecordUpdate) -> Result<Record> {
        let mut records = self.records.write().await;
        let record = records
            .entry(primary_key(&update.partition_key, &update.sort_key))
            .or_insert_with(|| Record::new(&update.partition_key, &update.sort_key, Value::Null));

        record.attributes = update.attributes;
        record.index_keys.apply(&update.index_keys);
        Ok(record.clone())
    }

    async fn delete_record(&self, partition_key: &str, sort_key: &str) -> Result<Option<Record>> {
        Ok(self
            .records
            .write()
            .await
            .remove(&primary_key(partition_key, sort_key)))
    }
}
