//! Display helpers shared by the one-shot commands and the interactive shell.

use chrono::{DateTime, Local, TimeZone};

/// `0.8234` → `"82.34%"`.
pub fn format_similarity(similarity: f32) -> String {
    format!("{:.2}%", similarity as f64 * 100.0)
}

/// Epoch milliseconds as `YYYY-MM-DD HH:MM` in local time.
pub fn format_timestamp(millis: i64) -> Option<String> {
    let dt = Local.timestamp_millis_opt(millis).single()?;
    Some(format_datetime(&dt))
}

pub fn format_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format("%Y-%m-%d %H:%M").to_string()
}
