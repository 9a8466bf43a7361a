//! Timestamp parsing and display formatting.
//!
//! Every function here is total: malformed or out-of-range input produces an
//! empty string (or `None` from [`parse_timestamp`]), never a panic. Renderers
//! can pass through whatever the server sent without validating it first.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

/// Numeric timestamps at or above this magnitude are read as milliseconds.
///
/// 10^11 seconds is roughly the year 5138, so no realistic seconds value
/// reaches it, while every millisecond value after March 1973 does.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Anything that may describe a point in time.
pub trait DateLike {
    /// Interpret as a UTC instant. `None` if it cannot be interpreted.
    fn to_utc(&self) -> Option<DateTime<Utc>>;
}

impl DateLike for str {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self)
    }
}

impl DateLike for String {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self)
    }
}

impl DateLike for DateTime<Utc> {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        Some(*self)
    }
}

impl DateLike for i64 {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        from_unix(*self)
    }
}

impl<T: DateLike + ?Sized> DateLike for Option<&T> {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        self.and_then(|value| value.to_utc())
    }
}

/// Parse a date-like string.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (both with
/// optional fractional seconds, read as UTC), a bare `YYYY-MM-DD` (midnight
/// UTC), and Unix timestamps in seconds or milliseconds.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if input.bytes().all(|b| b.is_ascii_digit()) {
        return input.parse::<i64>().ok().and_then(from_unix);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn from_unix(value: i64) -> Option<DateTime<Utc>> {
    if value.unsigned_abs() >= MILLIS_THRESHOLD.unsigned_abs() {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

/// Clock time, `HH:MM` (24-hour, UTC).
pub fn format_time<T: DateLike + ?Sized>(input: &T) -> String {
    input.to_utc().map(|dt| dt.format("%H:%M").to_string()).unwrap_or_default()
}

/// Calendar date, `Oct 17, 2026`.
pub fn format_date<T: DateLike + ?Sized>(input: &T) -> String {
    input.to_utc().map(|dt| dt.format("%b %-d, %Y").to_string()).unwrap_or_default()
}

/// Date and time, `Oct 17, 2026 14:05`.
pub fn format_date_time<T: DateLike + ?Sized>(input: &T) -> String {
    input.to_utc().map(|dt| dt.format("%b %-d, %Y %H:%M").to_string()).unwrap_or_default()
}

/// Time elapsed since `input`, relative to `now`.
///
/// Recent times read as `just now`, `N minutes ago`, `N hours ago`,
/// `yesterday` or `N days ago`; anything a week or older, or more than a
/// minute in the future, falls back to [`format_date`].
pub fn format_relative<T: DateLike + ?Sized>(input: &T, now: DateTime<Utc>) -> String {
    let Some(then) = input.to_utc() else {
        return String::new();
    };

    let elapsed = now.signed_duration_since(then);
    if elapsed < -TimeDelta::minutes(1) {
        return format_date(&then);
    }

    if elapsed < TimeDelta::minutes(1) {
        "just now".to_string()
    } else if elapsed < TimeDelta::hours(1) {
        plural(elapsed.num_minutes(), "minute")
    } else if elapsed < TimeDelta::days(1) {
        plural(elapsed.num_hours(), "hour")
    } else if elapsed < TimeDelta::days(2) {
        "yesterday".to_string()
    } else if elapsed < TimeDelta::days(7) {
        plural(elapsed.num_days(), "day")
    } else {
        format_date(&then)
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 { format!("1 {unit} ago") } else { format!("{count} {unit}s ago") }
}
