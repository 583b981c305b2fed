//! Event publishing to one EventBridge bus.

use anyhow::{bail, Context, Result};
use aws_sdk_eventbridge::{types::PutEventsRequestEntry, Client};
use serde::Serialize;
use tracing::{error, info};

pub const DEFAULT_EVENT_BUS: &str = "default";
pub const DEFAULT_EVENT_SOURCE: &str = "system";

#[derive(Debug, Clone)]
pub struct EventPublisher {
    client: Client,
    bus: String,
    source: String,
}

impl EventPublisher {
    pub fn new(
        sdk_config: &aws_config::SdkConfig,
        bus: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self::from_client(Client::new(sdk_config), bus, source)
    }

    pub fn from_client(client: Client, bus: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            client,
            bus: bus.into(),
            source: source.into(),
        }
    }

    /// Publishes one event and returns the id EventBridge assigned to it.
    ///
    /// Only acceptance by the bus is confirmed; delivery to rules and
    /// targets is not observed. A rejected entry is an error.
    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        event_name: &str,
        payload: &T,
    ) -> Result<Option<String>> {
        let entry = event_entry(&self.bus, &self.source, event_name, payload)?;

        let output = self
            .client
            .put_events()
            .entries(entry)
            .send()
            .await
            .inspect_err(|e| error!(bus = %self.bus, event_name, "Error publishing event: {e}"))?;

        let result = output.entries().first();
        if output.failed_entry_count() > 0 {
            let code = result.and_then(|r| r.error_code()).unwrap_or("unknown");
            let message = result.and_then(|r| r.error_message()).unwrap_or_default();
            error!(bus = %self.bus, event_name, code, "Event rejected: {message}");
            bail!(
                "event '{event_name}' was rejected by bus '{}': {code} {message}",
                self.bus
            );
        }

        let event_id = result.and_then(|r| r.event_id()).map(str::to_owned);
        info!(bus = %self.bus, event_name, event_id = ?event_id, "Event published");
        Ok(event_id)
    }
}

/// Builds the single `PutEvents` entry for an event: the configured source,
/// the event name as detail type, and the JSON payload as detail.
pub fn event_entry<T: Serialize + ?Sized>(
    bus: &str,
    source: &str,
    event_name: &str,
    payload: &T,
) -> Result<PutEventsRequestEntry> {
    let detail = serde_json::to_string(payload)
        .with_context(|| format!("failed to serialize payload of event '{event_name}'"))?;

    Ok(PutEventsRequestEntry::builder()
        .source(source)
        .detail_type(event_name)
        .detail(detail)
        .event_bus_name(bus)
        .build())
}
