//! Date/time utilities for Gator.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

use crate::{GatorError, Result};

/// Publish-date format used by RSS sources (RFC 1123 with a numeric zone),
/// after the leading `Mon, ` weekday, e.g. `02 Jan 2006 15:04:05 -0700`.
pub const PUB_DATE_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Format a timestamp for storage.
///
/// Always UTC with microsecond precision so that string order matches
/// chronological order in the database.
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp (RFC3339 or SQLite `YYYY-MM-DD HH:MM:SS`).
pub fn parse_db_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// Parse an item's raw publish date.
///
/// The string must start with a weekday abbreviation followed by `, ` and
/// the rest must match [`PUB_DATE_FORMAT`]. The weekday is not checked
/// against the date.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let (weekday, rest) = raw.trim().split_once(", ")?;
    if !WEEKDAYS.iter().any(|day| day.eq_ignore_ascii_case(weekday)) {
        return None;
    }
    DateTime::parse_from_str(rest, PUB_DATE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an interval such as `30s`, `1m` or `1h30m`.
///
/// Accepts one or more `<number><unit>` groups where the number may have a
/// fractional part and the unit is one of `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`.
/// The result must be strictly positive.
pub fn parse_interval(input: &str) -> Result<Duration> {
    let invalid = || GatorError::Config(format!("invalid interval {:?}", input));

    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(invalid());
        }
        let (number, tail) = rest.split_at(num_len);
        let value: f64 = number.parse().map_err(|_| invalid())?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };

        total_nanos += value * scale;
        rest = tail;
    }

    let nanos = total_nanos.round();
    if !nanos.is_finite() || nanos > i64::MAX as f64 {
        return Err(GatorError::Config(format!(
            "interval out of range: {:?}",
            input
        )));
    }
    if nanos < 1.0 {
        return Err(GatorError::Config(format!(
            "interval must be positive, got {:?}",
            input
        )));
    }

    Ok(Duration::from_nanos(nanos as u64))
}

/// Format a DateTime<Utc> in the specified timezone.
///
/// Falls back to UTC if the timezone name is unknown.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return dt.format(format).to_string(),
    };
    dt.with_timezone(&tz).format(format).to_string()
}
