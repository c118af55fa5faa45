//! UTC timestamp handling for transitland data.
//!
//! Transitland provides times as ISO-8601 UTC strings such as
//! `"2024-01-01T08:15:00Z"`. Conversion to an absolute instant goes through
//! chrono's naive (broken-down) representation and is pinned to UTC, so the
//! host's local time zone and DST rules never enter the calculation.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Format used by transitland `*_utc` fields.
const TRANSITLAND_UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Error returned when parsing an invalid timestamp string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp {input:?}: {reason}")]
pub struct TimeError {
    input: String,
    reason: &'static str,
}

impl TimeError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// Parse a transitland UTC timestamp.
///
/// The canonical form is `YYYY-MM-DDTHH:MM:SSZ`. Full RFC 3339 strings (with
/// fractional seconds or an explicit offset) are accepted as a fallback and
/// normalized to UTC.
///
/// # Examples
///
/// ```
/// use transit_board::domain::utc_timestamp;
///
/// let t = utc_timestamp("2024-01-01T00:00:00Z").unwrap();
/// assert_eq!(t.timestamp(), 1_704_067_200);
///
/// assert!(utc_timestamp("2024-01-01 00:00").is_err());
/// ```
pub fn utc_timestamp(s: &str) -> Result<DateTime<Utc>, TimeError> {
    if s.is_empty() {
        return Err(TimeError::new(s, "empty string"));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, TRANSITLAND_UTC_FORMAT) {
        return Ok(naive.and_utc());
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimeError::new(s, "expected YYYY-MM-DDTHH:MM:SSZ"))
}

/// Whole minutes from `now` until `at`, rounded down and clamped at zero.
pub fn minutes_until(at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (at - now).num_minutes().max(0)
}
