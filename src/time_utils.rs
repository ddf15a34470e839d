// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.
//!
//! Timestamps are stored as RFC3339 strings with second precision and a `Z`
//! suffix, so lexicographic order matches chronological order in queries.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Half-open `[start, end)` bounds of a UTC calendar day, formatted for storage queries.
pub fn day_bounds(date: NaiveDate) -> (String, String) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    let end = start + chrono::Duration::days(1);
    (format_utc_rfc3339(start), format_utc_rfc3339(end))
}

/// The calendar day before `date`, if representable.
pub fn previous_day(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(1))
}

/// Parse a stored RFC3339 timestamp back into UTC.
pub fn parse_utc_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Parse an ISO 8601 timestamp, reading one without an offset as UTC.
pub fn parse_utc_lenient(value: &str) -> Option<DateTime<Utc>> {
    parse_utc_rfc3339(value).or_else(|| {
        NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    })
}

/// Serde helper for [`parse_utc_lenient`].
pub fn deserialize_utc_lenient<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_utc_lenient(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {:?}", raw)))
}
