use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use mongodb::bson::DateTime as BsonDateTime;

pub fn chrono_to_bson(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

/// Calendar-day key in UTC, e.g. "2026-08-06". The daily challenge and the
/// day-streak are keyed on this value.
pub fn day_key(dt: DateTime<Utc>) -> String {
    format!("{:04}-{:02}-{:02}", dt.year(), dt.month(), dt.day())
}

pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// True when `last_completed` lies strictly before yesterday, i.e. at least
/// one full calendar day passed without completing the challenge.
pub fn missed_a_day(last_completed: NaiveDate, today: NaiveDate) -> bool {
    last_completed < today - Duration::days(1)
}
