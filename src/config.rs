use anyhow::{Context, Result};

use crate::events::{DEFAULT_EVENT_BUS, DEFAULT_EVENT_SOURCE};

/// Names of the backing resources the facade talks to.
///
/// Read once at construction; nothing is resolved from the environment at
/// call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeConfig {
    pub table_name: String,
    pub bucket: String,
    pub event_bus: String,
    pub event_source: String,
    pub function_prefix: String,
}

impl FacadeConfig {
    /// Configuration with the default event bus and source.
    pub fn new(
        table_name: impl Into<String>,
        bucket: impl Into<String>,
        function_prefix: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            bucket: bucket.into(),
            event_bus: DEFAULT_EVENT_BUS.to_string(),
            event_source: DEFAULT_EVENT_SOURCE.to_string(),
            function_prefix: function_prefix.into(),
        }
    }

    pub fn with_event_bus(mut self, bus: impl Into<String>) -> Self {
        self.event_bus = bus.into();
        self
    }

    pub fn with_event_source(mut self, source: impl Into<String>) -> Self {
        self.event_source = source.into();
        self
    }

    /// Reads the configuration from the environment, loading `.env` first if
    /// one exists.
    ///
    /// - `SYSTEMTABLE`: record table (required)
    /// - `MESSAGE_BUCKET`: blob bucket (required)
    /// - `FUNCTION_PREFIX`: prefix of invoked function names (required)
    /// - `EVENT_BUS_NAME`: event bus, defaults to `default`
    /// - `EVENT_SOURCE`: event source, defaults to `system`
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name).with_context(|| format!("environment variable {name} is not set"))
        };

        let mut config = Self::new(
            required("SYSTEMTABLE")?,
            required("MESSAGE_BUCKET")?,
            required("FUNCTION_PREFIX")?,
        );
        if let Some(bus) = lookup("EVENT_BUS_NAME") {
            config = config.with_event_bus(bus);
        }
        if let Some(source) = lookup("EVENT_SOURCE") {
            config = config.with_event_source(source);
        }
        Ok(config)
    }
}
