use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Date-time layouts accepted for scraped start/end text
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%B %d, %Y %H:%M",
];

/// Why a wall-clock string could not be turned into an instant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalTimeError {
    #[error("unrecognized date-time '{0}'")]
    Unparseable(String),
    #[error("'{0}' does not exist in this time zone (DST gap)")]
    Nonexistent(String),
}

/// Convert a 12-hour clock reading to 24-hour, passing 24-hour values through
pub fn to_24_hour(hour: u32, minute: u32, meridiem: Option<&str>) -> Option<(u32, u32)> {
    if minute > 59 {
        return None;
    }
    let hour = match meridiem.map(|m| m.trim().to_ascii_uppercase()) {
        None => hour,
        Some(m) if m == "AM" && (1..=12).contains(&hour) => hour % 12,
        Some(m) if m == "PM" && (1..=12).contains(&hour) => hour % 12 + 12,
        Some(_) => return None,
    };
    if hour > 23 {
        return None;
    }
    Some((hour, minute))
}

/// Parse wall-clock text and anchor it in the given zone
pub fn parse_local_datetime(text: &str, tz: Tz) -> Result<DateTime<Tz>, LocalTimeError> {
    let trimmed = text.trim();
    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| LocalTimeError::Unparseable(trimmed.to_string()))?;

    anchor_local(&naive, tz).ok_or_else(|| LocalTimeError::Nonexistent(trimmed.to_string()))
}

/// Resolve a naive wall-clock time in a zone; a DST fold resolves to the earlier instant
pub fn anchor_local(naive: &NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => None,
    }
}

/// Parse an IANA zone name such as `America/Los_Angeles`
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// UTC timestamp in the iCalendar basic format, e.g. `20250929T173000Z`
pub fn format_ics_utc<Z: TimeZone>(dt: &DateTime<Z>) -> String {
    dt.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_to_24_hour() {
        assert_eq!(to_24_hour(10, 30, None), Some((10, 30)));
        assert_eq!(to_24_hour(9, 5, Some("AM")), Some((9, 5)));
        assert_eq!(to_24_hour(12, 15, Some("AM")), Some((0, 15)));
        assert_eq!(to_24_hour(12, 15, Some("PM")), Some((12, 15)));
        assert_eq!(to_24_hour(1, 0, Some("pm")), Some((13, 0)));
        assert_eq!(to_24_hour(24, 0, None), None);
        assert_eq!(to_24_hour(13, 0, Some("PM")), None);
        assert_eq!(to_24_hour(10, 60, None), None);
    }

    #[test]
    fn test_parse_local_datetime_formats() {
        let tz: Tz = "America/Los_Angeles".parse().unwrap();
        let expected = tz.with_ymd_and_hms(2025, 9, 29, 10, 30, 0).unwrap();

        for text in [
            "2025-09-29T10:30",
            "2025-09-29T10:30:00",
            "2025-09-29 10:30",
            "September 29, 2025 10:30",
        ] {
            assert_eq!(parse_local_datetime(text, tz).unwrap(), expected, "{}", text);
        }

        assert!(matches!(
            parse_local_datetime("tomorrow-ish", tz),
            Err(LocalTimeError::Unparseable(_))
        ));
    }

    #[test]
    fn test_dst_gap_and_fold() {
        let tz: Tz = "America/Los_Angeles".parse().unwrap();

        // 2025-03-09 02:30 does not exist in Los Angeles
        assert!(matches!(
            parse_local_datetime("2025-03-09T02:30", tz),
            Err(LocalTimeError::Nonexistent(_))
        ));

        // 2025-11-02 01:30 happens twice; the earlier one is PDT (UTC-7)
        let folded = parse_local_datetime("2025-11-02T01:30", tz).unwrap();
        assert_eq!(folded.with_timezone(&Utc).hour(), 8);
    }

    #[test]
    fn test_format_ics_utc() {
        let tz: Tz = "America/Los_Angeles".parse().unwrap();
        let dt = tz.with_ymd_and_hms(2025, 9, 29, 10, 30, 0).unwrap();
        assert_eq!(format_ics_utc(&dt), "20250929T173000Z");
    }
}
