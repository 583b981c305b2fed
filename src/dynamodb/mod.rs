//! # DynamoDB Module
//!
//! Record storage on a single DynamoDB table.
//!
//! ## Components
//!
//! - `RecordStore`: the facade callers use; sanitizes payloads and logs failures.
//! - `RecordBackend`: the storage seam the store is generic over.
//! - `DynamoDb`: the backend for the real table.
//! - `InMemoryBackend`: a backend holding records in process memory.
//! - `Record`, `IndexKeys`, `RecordQuery`, `RecordUpdate`: the data passed between them.
//! - `Item`: the raw attribute map exchanged with the SDK.
//!
//! ## Example
//!
//! ```rust,no_run
//! use aws_service_facade::dynamodb::{DynamoDb, IndexKeys, RecordStore};
//! use serde_json::json;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let sdk_config = aws_config::load_from_env().await;
//! let store = RecordStore::new(DynamoDb::new(&sdk_config, "system-table"));
//!
//! store
//!     .put(
//!         "+15551234567",
//!         "task#42",
//!         &json!({ "status": "pending" }),
//!         IndexKeys::new().with_index2_key("venue#7"),
//!     )
//!     .await?;
//!
//! let open = store.query_open_tasks_by_phone("+15551234567").await?;
//! assert_eq!(open.len(), 1);
//! # Ok(())
//! # }
//! ```

mod backend;
mod client;
mod item;
mod memory;
mod record;
mod store;
mod table;

pub use backend::RecordBackend;
pub use client::DynamoDb;
pub(crate) use client::{query_expression, update_expression};
pub use item::Item;
pub use memory::InMemoryBackend;
pub use record::{IndexKeys, Record, RecordQuery, RecordUpdate};
pub use store::{RecordStore, PENDING_STATUS, TASK_PREFIX};
pub use table::{
    QueryTarget, ATTRIBUTES, INDEX1_KEY, INDEX1_SORT_KEY, INDEX2_KEY, INDEX3_KEY, PARTITION_KEY,
    SORT_KEY,
};
