// src/utils/date.rs

//! Date normalization to `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const OUTPUT_FORMAT: &str = "%Y-%m-%d";

/// Normalize an upstream date string.
///
/// Accepts RFC 3339, RFC 2822 (RSS), naive ISO timestamps and plain dates.
/// Anything else yields `None`.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.format(OUTPUT_FORMAT).to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.format(OUTPUT_FORMAT).to_string());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.format(OUTPUT_FORMAT).to_string());
        }
    }

    // Leading calendar date with an unrecognized suffix
    let head = raw.get(..10)?;
    NaiveDate::parse_from_str(head, OUTPUT_FORMAT)
        .ok()
        .map(|d| d.format(OUTPUT_FORMAT).to_string())
}

/// Convert a Unix timestamp in seconds.
pub fn date_from_timestamp(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.format(OUTPUT_FORMAT).to_string())
}
