use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde_json::json;

use crate::error::{AppError, AppResult};

pub fn parse_datetime(tz: Tz, value: &str) -> AppResult<DateTime<Tz>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&tz))
        .map_err(|err| {
            AppError::validation_with_details(
                "invalid datetime format",
                json!({"value": value, "error": err.to_string()}),
            )
        })
}

pub fn format_datetime(dt: DateTime<Tz>) -> String {
    dt.to_rfc3339()
}

/// Half-open interval overlap: `a.start < b.end && b.start < a.end`.
pub fn overlaps(
    a_start: DateTime<Tz>,
    a_end: DateTime<Tz>,
    b_start: DateTime<Tz>,
    b_end: DateTime<Tz>,
) -> bool {
    a_start < b_end && b_start < a_end
}

pub fn duration_hours(start: DateTime<Tz>, end: DateTime<Tz>) -> f64 {
    end.signed_duration_since(start).num_minutes() as f64 / 60.0
}

pub fn hours_to_duration(hours: f64) -> Duration {
    Duration::seconds((hours * 3600.0).round() as i64)
}

/// Local date key matching the first 10 characters of a local RFC 3339
/// timestamp, used by the repositories for day grouping.
pub fn local_date_key(dt: DateTime<Tz>) -> String {
    dt.date_naive().format("%Y-%m-%d").to_string()
}

/// Resolves a wall-clock time on a local date. Ambiguous times (DST fold)
/// take the earlier instant; times inside a DST gap resolve to nothing.
pub fn local_datetime(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(first, _) => Some(first),
        LocalResult::None => None,
    }
}
