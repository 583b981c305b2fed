//! Payload shaping applied before data leaves the process.
//!
//! Timestamps are always written as `YYYY-MM-DDTHH:MM:SS.sssZ` so stored
//! values compare lexicographically in time order and serialize the same way
//! every time.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::TimeFormatError;

/// Anything that can be pinned to a UTC instant.
pub trait DateLike {
    fn to_utc(&self) -> Result<DateTime<Utc>, TimeFormatError>;
}

impl<Tz: TimeZone> DateLike for DateTime<Tz> {
    fn to_utc(&self) -> Result<DateTime<Utc>, TimeFormatError> {
        Ok(self.with_timezone(&Utc))
    }
}

/// Naive date-times are taken as UTC.
impl DateLike for NaiveDateTime {
    fn to_utc(&self) -> Result<DateTime<Utc>, TimeFormatError> {
        Ok(Utc.from_utc_datetime(self))
    }
}

/// A calendar date maps to UTC midnight.
impl DateLike for NaiveDate {
    fn to_utc(&self) -> Result<DateTime<Utc>, TimeFormatError> {
        self.and_hms_opt(0, 0, 0)
            .map(|midnight| Utc.from_utc_datetime(&midnight))
            .ok_or_else(|| TimeFormatError::InvalidDate(self.to_string()))
    }
}

/// Milliseconds since the Unix epoch.
impl DateLike for i64 {
    fn to_utc(&self) -> Result<DateTime<Utc>, TimeFormatError> {
        Utc.timestamp_millis_opt(*self)
            .single()
            .ok_or_else(|| TimeFormatError::InvalidTimestamp(self.to_string()))
    }
}

impl DateLike for str {
    fn to_utc(&self) -> Result<DateTime<Utc>, TimeFormatError> {
        parse_timestamp(self).ok_or_else(|| TimeFormatError::InvalidTimestamp(self.to_string()))
    }
}

impl DateLike for String {
    fn to_utc(&self) -> Result<DateTime<Utc>, TimeFormatError> {
        self.as_str().to_utc()
    }
}

impl<T: DateLike + ?Sized> DateLike for &T {
    fn to_utc(&self) -> Result<DateTime<Utc>, TimeFormatError> {
        (**self).to_utc()
    }
}

/// Formats any date-like value as a fixed-width ISO-8601 UTC instant.
pub fn to_iso_timestamp(value: impl DateLike) -> Result<String, TimeFormatError> {
    value.to_utc().map(|instant| format_instant(&instant))
}

pub(crate) fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses RFC 3339 instants, `YYYY-MM-DDTHH:MM[:SS[.fff]]` (as UTC) and
/// bare `YYYY-MM-DD` dates (as UTC midnight).
pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.to_utc().ok())
        })
}

/// Serializes `payload` and rewrites every embedded timestamp into the fixed
/// ISO form.
///
/// Dates reach the JSON tree as RFC 3339 strings (that is how `chrono`
/// serializes them), so any string that parses as an RFC 3339 instant is
/// normalized. That includes free text that happens to be such an instant,
/// e.g. a `"note"` field holding `"2024-03-01T09:30:00.123456789+05:00"`
/// becomes `"2024-03-01T04:30:00.123Z"`: the offset is folded into UTC and
/// precision below one millisecond is truncated. Date-only and time-only
/// strings are left alone. Applying `sanitize` to its own output is a no-op.
pub fn sanitize<T: Serialize + ?Sized>(payload: &T) -> serde_json::Result<Value> {
    let mut value = serde_json::to_value(payload)?;
    normalize_dates(&mut value);
    Ok(value)
}

fn normalize_dates(value: &mut Value) {
    match value {
        Value::String(text) => {
            if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
                *text = format_instant(&instant.with_timezone(&Utc));
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_dates),
        Value::Object(fields) => fields.values_mut().for_each(normalize_dates),
        _ => {}
    }
}

/// Flattens flat objects into one percent-encoded `k=v&k=v` string.
///
/// Entries keep record order, then key order within each record. String
/// values are encoded as-is; other values by their JSON text.
pub fn encode_query_string(records: &[Map<String, Value>]) -> String {
    records
        .iter()
        .flat_map(|record| record.iter())
        .map(|(key, value)| {
            let text = match value {
                Value::String(text) => Cow::Borrowed(text.as_str()),
                other => Cow::Owned(other.to_string()),
            };
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(&text)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Joins whitespace-separated words into lowerCamelCase.
pub fn camelize(text: &str) -> String {
    text.split_whitespace()
        .enumerate()
        .map(|(position, word)| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) if position == 0 => first.to_lowercase().chain(chars).collect(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}
