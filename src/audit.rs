//! Rendering helpers for the created/changed metadata on catalog rows.
use chrono::{NaiveDateTime, TimeZone, Utc};
use chrono_humanize::HumanTime;

/// Who created a row, or an empty string when unknown.
pub fn creator_label(created_by: Option<&str>) -> String {
    created_by.map(str::trim).unwrap_or_default().to_string()
}

/// Relative time such as "2 hours ago"; empty when the row has no timestamp.
/// Timestamps are stored in UTC by SQLite's `CURRENT_TIMESTAMP`.
pub fn time_ago(changed_on: Option<NaiveDateTime>, now: chrono::DateTime<Utc>) -> String {
    match changed_on {
        Some(ts) => HumanTime::from(Utc.from_utc_datetime(&ts) - now).to_string(),
        None => String::new(),
    }
}
