use thiserror::Error;

/// Format failures reported by the strict date/time helpers.
///
/// Facade operations return `anyhow::Result`; this type only covers input
/// that the time helpers refuse to coerce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeFormatError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid time '{0}', expected HH:MM or HH:MM:SS")]
    InvalidTime(String),

    #[error("unrecognized timestamp '{0}'")]
    InvalidTimestamp(String),
}
