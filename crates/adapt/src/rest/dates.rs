// crates/adapt/src/rest/dates.rs

use chrono::{DateTime, Duration, NaiveDateTime};

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Wire form of a stored timestamp: ISO 8601 without offset.
pub fn format_datetime(at: &NaiveDateTime) -> String {
    at.format(WIRE_FORMAT).to_string()
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DDTHH:MM:SS`.
///
/// Returns the instant as UTC when an offset was given, otherwise the wall
/// clock as written together with `false`.
pub fn parse_datetime(raw: &str) -> Option<(NaiveDateTime, bool)> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some((dt.naive_utc(), true));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .map(|d| (d, false))
}

pub fn local_to_gmt(local: NaiveDateTime, offset_minutes: i32) -> NaiveDateTime {
    local - Duration::minutes(offset_minutes as i64)
}

pub fn gmt_to_local(gmt: NaiveDateTime, offset_minutes: i32) -> NaiveDateTime {
    gmt + Duration::minutes(offset_minutes as i64)
}

/// Expand a supplied date into the `(local, gmt)` pair.
///
/// `is_gmt` says whether a bare timestamp is UTC. Timestamps carrying an
/// explicit offset are always converted through UTC.
pub fn date_with_gmt(raw: &str, is_gmt: bool, offset_minutes: i32) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let (at, has_offset) = parse_datetime(raw)?;
    if has_offset || is_gmt {
        Some((gmt_to_local(at, offset_minutes), at))
    } else {
        Some((at, local_to_gmt(at, offset_minutes)))
    }
}
