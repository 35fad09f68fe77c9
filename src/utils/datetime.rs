//! Date and time utility functions
//!
//! Remote records carry creation timestamps in several shapes: milliseconds
//! since the epoch, seconds since the epoch, or ISO-8601 text. Epoch values
//! become a UTC calendar date; text keeps the date it was written with.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Standard date format used in log output and generated files
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Numbers above this magnitude are milliseconds, below it seconds.
pub const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Format a NaiveDate to YYYY-MM-DD string
pub fn format_ymd(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

/// Current UTC date shifted back by `days`.
pub fn days_ago(days: u32) -> NaiveDate {
    Utc::now().date_naive() - Duration::days(i64::from(days))
}

/// Convert an epoch timestamp to a UTC date.
///
/// Values larger than [`MILLIS_THRESHOLD`] are read as milliseconds, anything
/// smaller as seconds. Zero and negative values yield `None`.
pub fn date_from_epoch(value: i64) -> Option<NaiveDate> {
    if value <= 0 {
        return None;
    }
    let dt = if value > MILLIS_THRESHOLD {
        DateTime::<Utc>::from_timestamp_millis(value)?
    } else {
        DateTime::<Utc>::from_timestamp(value, 0)?
    };
    Some(dt.date_naive())
}

/// Parse ISO-8601 text into a date.
///
/// Accepts RFC 3339 (a trailing `Z` counts as UTC), a naive date-time such as
/// `2023-11-14T22:13:20.5`, either with `T` or a space between date and
/// time, or a bare `YYYY-MM-DD`. Timestamps with an offset keep the calendar
/// date written in that offset.
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok()
}

/// Derive a creation date from a raw JSON timestamp value.
///
/// Never fails: anything that cannot be understood becomes `None`.
pub fn parse_timestamp(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                date_from_epoch(i)
            } else {
                // Fractional epoch values; sub-unit precision is irrelevant for a date
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 1.0 && *f < i64::MAX as f64)
                    .and_then(|f| date_from_epoch(f.trunc() as i64))
            }
        }
        Value::String(s) => parse_iso_date(s),
        _ => None,
    }
}
