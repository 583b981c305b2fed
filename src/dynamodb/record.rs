use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::dynamodb::table::{
    QueryTarget, ATTRIBUTES, INDEX1_KEY, INDEX1_SORT_KEY, INDEX2_KEY, INDEX3_KEY, PARTITION_KEY,
    SORT_KEY,
};
use crate::dynamodb::Item;

/// Optional secondary index keys of a record.
///
/// On writes each field is either `None` (not written, or left unchanged by
/// an update) or `Some(value)` (set to `value`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexKeys {
    pub index1_key: Option<String>,
    pub index1_sort_key: Option<String>,
    pub index2_key: Option<String>,
    pub index3_key: Option<String>,
}

impl IndexKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index1_key(mut self, value: impl Into<String>) -> Self {
        self.index1_key = Some(value.into());
        self
    }

    pub fn with_index1_sort_key(mut self, value: impl Into<String>) -> Self {
        self.index1_sort_key = Some(value.into());
        self
    }

    pub fn with_index2_key(mut self, value: impl Into<String>) -> Self {
        self.index2_key = Some(value.into());
        self
    }

    pub fn with_index3_key(mut self, value: impl Into<String>) -> Self {
        self.index3_key = Some(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    /// Supplied fields as `(attribute name, value)`, in a fixed order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            (INDEX1_KEY, &self.index1_key),
            (INDEX1_SORT_KEY, &self.index1_sort_key),
            (INDEX2_KEY, &self.index2_key),
            (INDEX3_KEY, &self.index3_key),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|value| (name, value)))
    }

    /// Overwrites the fields supplied in `update`, keeping the rest.
    pub fn apply(&mut self, update: &IndexKeys) {
        let targets = [
            (&mut self.index1_key, &update.index1_key),
            (&mut self.index1_sort_key, &update.index1_sort_key),
            (&mut self.index2_key, &update.index2_key),
            (&mut self.index3_key, &update.index3_key),
        ];
        for (current, supplied) in targets {
            if let Some(value) = supplied {
                *current = Some(value.clone());
            }
        }
    }
}

/// A stored record: composite primary key, one opaque `attributes` payload,
/// and the optional secondary index keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub partition_key: String,
    pub sort_key: String,
    pub attributes: Value,
    pub index_keys: IndexKeys,
}

impl Record {
    pub fn new(
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
        attributes: Value,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
            attributes,
            index_keys: IndexKeys::default(),
        }
    }

    pub fn with_index_keys(mut self, index_keys: IndexKeys) -> Self {
        self.index_keys = index_keys;
        self
    }

    /// `attributes.status`, when it is a string.
    pub fn status(&self) -> Option<&str> {
        self.attributes.get("status").and_then(Value::as_str)
    }

    /// The value this record is keyed by under `target`, `None` when the
    /// record is absent from that index.
    pub fn key_for(&self, target: QueryTarget) -> Option<&str> {
        match target {
            QueryTarget::Table => Some(self.partition_key.as_str()),
            QueryTarget::Index1 => self
                .index_keys
                .index1_sort_key
                .as_ref()
                .and(self.index_keys.index1_key.as_deref()),
            QueryTarget::Index2 => self.index_keys.index2_key.as_deref(),
            QueryTarget::Index3 => self.index_keys.index3_key.as_deref(),
        }
    }

    /// The sort value of this record under `target`, if the target has one.
    pub fn sort_key_for(&self, target: QueryTarget) -> Option<&str> {
        match target {
            QueryTarget::Table => Some(self.sort_key.as_str()),
            QueryTarget::Index1 => self.index_keys.index1_sort_key.as_deref(),
            QueryTarget::Index2 | QueryTarget::Index3 => None,
        }
    }

    /// Renders the record into a DynamoDB item. Unset index keys are left
    /// out of the item entirely.
    pub fn to_item(&self) -> Result<Item> {
        let item = Item::key(&self.partition_key, &self.sort_key)
            .set_value(ATTRIBUTES, &self.attributes)?;
        Ok(self
            .index_keys
            .fields()
            .fold(item, |item, (name, value)| item.set_string(name, value)))
    }

    pub fn from_item(item: Item) -> Result<Self> {
        let required = |name: &str| {
            item.get_string(name)
                .cloned()
                .ok_or_else(|| anyhow!("item is missing string attribute '{name}'"))
        };
        let optional = |name: &str| item.get_string(name).cloned();

        Ok(Self {
            partition_key: required(PARTITION_KEY)?,
            sort_key: required(SORT_KEY)?,
            attributes: item.get_value(ATTRIBUTES)?.unwrap_or(Value::Null),
            index_keys: IndexKeys {
                index1_key: optional(INDEX1_KEY),
                index1_sort_key: optional(INDEX1_SORT_KEY),
                index2_key: optional(INDEX2_KEY),
                index3_key: optional(INDEX3_KEY),
            },
        })
    }
}

/// A single-page query: equality on the target's key attribute, optionally
/// narrowed by a sort-key prefix and a store-side `attributes.status` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub target: QueryTarget,
    pub key: String,
    pub sort_prefix: Option<String>,
    pub status_filter: Option<String>,
}

impl RecordQuery {
    /// All records in one partition of the base table.
    pub fn partition(partition_key: impl Into<String>) -> Self {
        Self::on(QueryTarget::Table, partition_key)
    }

    pub fn on(target: QueryTarget, key: impl Into<String>) -> Self {
        Self {
            target,
            key: key.into(),
            sort_prefix: None,
            status_filter: None,
        }
    }

    pub fn with_sort_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sort_prefix = Some(prefix.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status_filter = Some(status.into());
        self
    }

    /// The sort attribute a prefix condition applies to.
    ///
    /// Fails when a prefix is requested on an index without a sort key.
    pub fn prefix_attribute(&self) -> Result<Option<&'static str>> {
        match (&self.sort_prefix, self.target.sort_attribute()) {
            (None, _) => Ok(None),
            (Some(_), Some(attribute)) => Ok(Some(attribute)),
            (Some(_), None) => Err(anyhow!(
                "{:?} has no sort key to match a prefix against",
                self.target
            )),
        }
    }

    /// Whether `record` satisfies every condition of this query.
    pub fn matches(&self, record: &Record) -> bool {
        let key_matches = record.key_for(self.target) == Some(self.key.as_str());
        let prefix_matches = match &self.sort_prefix {
            Some(prefix) => record
                .sort_key_for(self.target)
                .is_some_and(|sort| sort.starts_with(prefix.as_str())),
            None => true,
        };
        let status_matches = match &self.status_filter {
            Some(status) => record.status() == Some(status.as_str()),
            None => true,
        };
        key_matches && prefix_matches && status_matches
    }
}

/// A partial update: `attributes` is always replaced as a whole, index keys
/// only where supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub partition_key: String,
    pub sort_key: String,
    pub attributes: Value,
    pub index_keys: IndexKeys,
}
