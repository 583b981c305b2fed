//! Fire-and-forget Lambda invocation.

use anyhow::{Context, Result};
use aws_sdk_lambda::{primitives::Blob, types::InvocationType, Client};
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct FunctionInvoker {
    client: Client,
    prefix: String,
}

impl FunctionInvoker {
    pub fn new(sdk_config: &aws_config::SdkConfig, prefix: impl Into<String>) -> Self {
        Self::from_client(Client::new(sdk_config), prefix)
    }

    pub fn from_client(client: Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    /// Full function name for `suffix`, e.g. `app-prod-` + `sendReminder`.
    pub fn function_name(&self, suffix: &str) -> String {
        format!("{}{}", self.prefix, suffix)
    }

    /// Queues an asynchronous invocation of `<prefix><suffix>` with a JSON
    /// payload and returns the accepted status code (202). The function's
    /// own result is never observed.
    pub async fn invoke_async<T: Serialize + ?Sized>(
        &self,
        suffix: &str,
        payload: &T,
    ) -> Result<i32> {
        let function_name = self.function_name(suffix);
        let payload = serde_json::to_vec(payload)
            .with_context(|| format!("failed to serialize payload for '{function_name}'"))?;

        let output = self
            .client
            .invoke()
            .function_name(&function_name)
            .invocation_type(InvocationType::Event)
            .payload(Blob::new(payload))
            .send()
            .await
            .inspect_err(|e| error!(function = %function_name, "Error invoking function: {e}"))?;

        info!(function = %function_name, status = output.status_code(), "Invocation accepted");
        Ok(output.status_code())
    }
}
