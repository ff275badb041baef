use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::{Error, Result};

/// Timestamp layout used for every stored instant. Matches SQLite's own
/// `datetime()` output so text comparisons and date functions agree.
pub const SQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format an instant (UTC) the way it is stored.
pub fn to_sql_timestamp(at: DateTime<Utc>) -> String {
    at.format(SQL_TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored or user-supplied timestamp.
///
/// Accepts the stored layout, RFC 3339, and a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, SQL_TIMESTAMP_FORMAT) {
        return Ok(dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(Error::InvalidTimestamp(s.to_string()))
}

/// Calendar day before `as_of`, as a half-open `[start, end)` pair of instants.
pub fn yesterday_bounds(as_of: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = as_of.date_naive();
    let start = (today - Duration::days(1)).and_time(chrono::NaiveTime::MIN);
    let end = today.and_time(chrono::NaiveTime::MIN);
    (start.and_utc(), end.and_utc())
}
