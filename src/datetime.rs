//! Date/time utilities for feedbell.
//!
//! Watermarks and feed timestamps are compared in one configured zone.
//! Instants are persisted as RFC 3339 strings carrying that zone's offset.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::{FeedbellError, Result};

/// Parse an IANA timezone name (e.g. "Asia/Taipei", "UTC").
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| FeedbellError::Config(format!("unknown timezone: {name}")))
}

/// Current instant in the given zone.
pub fn now_in(tz: &Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(tz)
}

/// Format an instant for storage.
pub fn to_storage<Z: TimeZone>(dt: &DateTime<Z>) -> String
where
    Z::Offset: std::fmt::Display,
{
    dt.to_rfc3339()
}

/// Parse a stored instant.
///
/// Accepts RFC 3339 and the SQLite `YYYY-MM-DD HH:MM:SS` form (taken as UTC).
pub fn parse_stored(s: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc().fixed_offset())
        .map_err(|e| FeedbellError::Database(format!("invalid stored timestamp {s:?}: {e}")))
}
