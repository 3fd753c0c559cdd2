use super::models::EventDateTime;
use chrono::{DateTime, SecondsFormat, Utc};

/// Parse the `dateTime` of an API start/end; all-day values yield `None`
pub fn parse_event_time(value: &EventDateTime) -> Option<DateTime<Utc>> {
    let text = value.date_time.as_deref()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// RFC 3339 form used for `timeMin` and `timeMax`
pub fn format_query_time(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}
