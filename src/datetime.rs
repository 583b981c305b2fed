//! Calendar and time-of-day helpers.
//!
//! Everything is computed in UTC. A caller-supplied offset is applied only
//! when rendering display strings.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc, Weekday,
};

use crate::encoding::{format_instant, parse_timestamp};
use crate::error::TimeFormatError;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Sentinel returned by the display helpers for unparseable input.
pub const INVALID_DATE: &str = "Invalid Date";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayKind {
    Weekday,
    Weekend,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayDateTime {
    pub date: String,
    pub time: String,
}

impl DisplayDateTime {
    fn invalid() -> Self {
        Self {
            date: INVALID_DATE.to_string(),
            time: INVALID_DATE.to_string(),
        }
    }
}

/// Checks `text` against a shape where `d` stands for one ASCII digit and
/// every other byte must match literally.
fn has_shape(text: &str, shape: &str) -> bool {
    text.len() == shape.len()
        && text.bytes().zip(shape.bytes()).all(|(c, s)| match s {
            b'd' => c.is_ascii_digit(),
            literal => c == literal,
        })
}

fn parse_hour_minute(text: &str) -> Option<(u32, u32)> {
    let (hours, minutes) = text.trim().split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    (hours < 24 && minutes < 60).then_some((hours, minutes))
}

/// Subtracts one hour from `HH:MM`, wrapping `00:MM` to `23:MM`.
pub fn shift_hour_backward(time: &str) -> Option<String> {
    let (hours, minutes) = parse_hour_minute(time)?;
    Some(format!("{:02}:{:02}", (hours + 23) % 24, minutes))
}

/// Classifies a `YYYY-MM-DD` calendar date.
///
/// Friday, Saturday and Sunday count as the weekend.
pub fn classify_day(date: &str) -> Option<DayKind> {
    if !has_shape(date, "dddd-dd-dd") {
        return None;
    }
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(match date.weekday() {
        Weekday::Fri | Weekday::Sat | Weekday::Sun => DayKind::Weekend,
        _ => DayKind::Weekday,
    })
}

/// The calendar date `days` after `from` (negative values go back).
pub fn date_after(from: NaiveDate, days: i64) -> Option<NaiveDate> {
    TimeDelta::try_days(days).and_then(|delta| from.checked_add_signed(delta))
}

/// The UTC calendar date `days` from today.
pub fn future_date(days: i64) -> Option<NaiveDate> {
    date_after(Utc::now().date_naive(), days)
}

/// Pulls the first integer out of free text such as `"about 3 hours"`.
/// Returns 0 when there is none.
pub fn extract_hours(text: &str) -> u32 {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|digits| !digits.is_empty())
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

/// Rounds to an `i64`, or `None` when the value does not fit. A plain `as`
/// cast would saturate instead.
fn whole_units(value: f64) -> Option<i64> {
    let rounded = value.round();
    (rounded.abs() < i64::MAX as f64).then_some(rounded as i64)
}

/// Adds a fractional number of hours to either a time of day or a timestamp.
///
/// `HH:MM` input wraps around midnight and comes back as `HH:MM`; anything
/// else is parsed as a timestamp and comes back in the fixed ISO form.
pub fn add_hours(start: &str, hours: f64) -> Option<String> {
    if !hours.is_finite() {
        return None;
    }
    if let Some((start_hours, start_minutes)) = parse_hour_minute(start) {
        let delta = whole_units(hours * 60.0)?;
        let total = i64::from(start_hours * 60 + start_minutes)
            .checked_add(delta)?
            .rem_euclid(MINUTES_PER_DAY);
        return Some(format!("{:02}:{:02}", total / 60, total % 60));
    }
    let instant = parse_timestamp(start)?;
    let delta = TimeDelta::try_milliseconds(whole_units(hours * 3_600_000.0)?)?;
    instant
        .checked_add_signed(delta)
        .map(|shifted| format_instant(&shifted))
}

/// Renders a timestamp as display strings in the given offset, e.g.
/// `"March 1, 2024"` and `"2:30 PM"`.
pub fn to_display(timestamp: &str, offset: &FixedOffset) -> DisplayDateTime {
    match parse_timestamp(timestamp) {
        Some(instant) => {
            let local: DateTime<FixedOffset> = instant.with_timezone(offset);
            DisplayDateTime {
                date: local.format("%B %-d, %Y").to_string(),
                time: local.format("%-I:%M %p").to_string(),
            }
        }
        None => DisplayDateTime::invalid(),
    }
}

/// `"13:05"` becomes `"1:05 PM"`, `"00:00"` becomes `"12:00 AM"`.
pub fn convert_24_to_12(time: &str) -> Option<String> {
    let (hours, minutes) = parse_hour_minute(time)?;
    let suffix = if hours < 12 { "AM" } else { "PM" };
    let display_hours = match hours % 12 {
        0 => 12,
        other => other,
    };
    Some(format!("{display_hours}:{minutes:02} {suffix}"))
}

/// Joins `YYYY-MM-DD` and `HH:MM[:SS]` into one UTC instant.
///
/// Input that does not match those shapes exactly, or names an impossible
/// date or time, is rejected rather than coerced.
pub fn combine_date_and_time(date: &str, time: &str) -> Result<String, TimeFormatError> {
    if !has_shape(date, "dddd-dd-dd") {
        return Err(TimeFormatError::InvalidDate(date.to_string()));
    }
    let full_time = if has_shape(time, "dd:dd") {
        format!("{time}:00")
    } else if has_shape(time, "dd:dd:dd") {
        time.to_string()
    } else {
        return Err(TimeFormatError::InvalidTime(time.to_string()));
    };

    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| TimeFormatError::InvalidDate(date.to_string()))?;
    let time_of_day = NaiveTime::parse_from_str(&full_time, "%H:%M:%S")
        .map_err(|_| TimeFormatError::InvalidTime(time.to_string()))?;

    Ok(format_instant(
        &Utc.from_utc_datetime(&day.and_time(time_of_day)),
    ))
}
