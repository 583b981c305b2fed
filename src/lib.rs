//! # AWS Service Facade
//!
//! One object wrapping the managed services an application talks to:
//!
//! - [`RecordStore`]: records on a DynamoDB table keyed by `PK`/`SK`, with
//!   three secondary indexes and one nested `attributes` payload.
//! - [`BlobStore`]: objects in one S3 bucket.
//! - [`EventPublisher`]: events on one EventBridge bus.
//! - [`FunctionInvoker`]: asynchronous Lambda invocations.
//!
//! plus the pure helpers in [`encoding`] and [`datetime`].
//!
//! Every operation issues its request on the calling task and returns the
//! backing service's failure unchanged after logging it. There are no
//! retries, no pagination and no background work.
//!
//! ## Usage
//!
//! The facade reads its resource names from the environment (see
//! [`FacadeConfig::from_env`]) and AWS credentials from the standard chain:
//!
//! - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_REGION`
//! - `AWS_ENDPOINT_URL` for local endpoints such as DynamoDB Local
//!
//! ```rust,no_run
//! use aws_service_facade::{dynamodb::IndexKeys, ServiceFacade};
//! use serde_json::json;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let facade = ServiceFacade::from_env().await?;
//!
//! facade
//!     .records()
//!     .put("+15551234567", "task#1", &json!({ "status": "pending" }), IndexKeys::new())
//!     .await?;
//! facade.events().publish("TaskCreated", &json!({ "task": 1 })).await?;
//! facade.functions().invoke_async("sendReminder", &json!({ "task": 1 })).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod datetime;
pub mod dynamodb;
pub mod encoding;
pub mod error;
pub mod events;
pub mod lambda;
pub mod logging;
pub mod s3;

#[cfg(test)]
mod tests;

use anyhow::Result;

pub use config::FacadeConfig;
pub use dynamodb::{DynamoDb, RecordStore};
pub use error::TimeFormatError;
pub use events::EventPublisher;
pub use lambda::FunctionInvoker;
pub use s3::BlobStore;

/// The four service facades, built together from one configuration and one
/// set of AWS clients.
#[derive(Debug, Clone)]
pub struct ServiceFacade {
    records: RecordStore<DynamoDb>,
    blobs: BlobStore,
    events: EventPublisher,
    functions: FunctionInvoker,
}

impl ServiceFacade {
    pub fn new(sdk_config: &aws_config::SdkConfig, config: &FacadeConfig) -> Self {
        Self {
            records: RecordStore::new(DynamoDb::new(sdk_config, &config.table_name)),
            blobs: BlobStore::new(sdk_config, &config.bucket),
            events: EventPublisher::new(sdk_config, &config.event_bus, &config.event_source),
            functions: FunctionInvoker::new(sdk_config, &config.function_prefix),
        }
    }

    /// Builds the facade from `.env`/environment configuration and the
    /// default AWS credential chain.
    pub async fn from_env() -> Result<Self> {
        let config = FacadeConfig::from_env()?;
        let sdk_config = aws_config::load_from_env().await;
        Ok(Self::new(&sdk_config, &config))
    }

    pub fn records(&self) -> &RecordStore<DynamoDb> {
        &self.records
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub fn functions(&self) -> &FunctionInvoker {
        &self.functions
    }
}
