mod common;

use chrono::{TimeZone, Utc};
use common::{normalizer_config, record};
use ical::parser::ical::component::IcalEvent;
use ical::IcalParser;
use outlook_sync::components::ics::{event_uid, unescape_text, IcsWriter};
use outlook_sync::components::{normalize_all, NormalizerConfig};
use std::io::BufReader;

fn property<'a>(event: &'a IcalEvent, name: &str) -> Option<&'a str> {
    event
        .properties
        .iter()
        .find(|p| p.name == name)
        .and_then(|p| p.value.as_deref())
}

fn teams_config() -> NormalizerConfig {
    NormalizerConfig {
        meeting_link: Some(format!(
            "https://teams.microsoft.com/l/meetup-join/{}",
            "19%3ameeting_abcdefghijklmnopqrstuvwxyz0123456789".repeat(2)
        )),
        ..normalizer_config()
    }
}

#[test]
fn test_rendered_calendar_parses_back() {
    let mut cancelled = record(
        "Canceled: Budget; Q4, review",
        "October 3, 2025 13:00",
        "October 3, 2025 14:30",
        "Busy",
    );
    cancelled.is_cancelled = true;
    let raws = vec![
        record("Standup", "September 29, 2025 10:30", "September 29, 2025 11:00", "Busy"),
        record("Lunch & learn", "September 30, 2025 12:00", "September 30, 2025 13:00", "Free"),
        cancelled,
    ];
    let (events, warnings) = normalize_all(&raws, &teams_config());
    assert!(warnings.is_empty());

    let generated_at = Utc.with_ymd_and_hms(2025, 9, 28, 8, 0, 0).unwrap();
    let ics = IcsWriter::new("Work", "America/Los_Angeles").render(&events, generated_at);
    assert!(ics.ends_with("END:VCALENDAR\r\n"));
    assert!(ics.split("\r\n").all(|line| line.len() <= 75));

    let calendars: Vec<_> = IcalParser::new(BufReader::new(ics.as_bytes()))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(calendars.len(), 1);
    let parsed = &calendars[0].events;
    assert_eq!(parsed.len(), 3);

    let standup = &parsed[0];
    assert_eq!(property(standup, "SUMMARY"), Some("Standup"));
    assert_eq!(property(standup, "DTSTART"), Some("20250929T173000Z"));
    assert_eq!(property(standup, "DTEND"), Some("20250929T180000Z"));
    assert_eq!(property(standup, "DTSTAMP"), Some("20250928T080000Z"));
    assert_eq!(property(standup, "STATUS"), Some("CONFIRMED"));
    assert_eq!(property(standup, "TRANSP"), Some("OPAQUE"));
    assert_eq!(property(standup, "LOCATION"), Some("Microsoft Teams Meeting"));
    assert_eq!(property(standup, "ORGANIZER"), Some("mailto:jane.doe@example.com"));
    assert_eq!(property(standup, "UID"), Some(event_uid(&events[0]).as_str()));

    let description = unescape_text(property(standup, "DESCRIPTION").unwrap());
    assert_eq!(description, events[0].description.clone().unwrap());
    assert!(description.starts_with("Organizer: Jane Doe"));
    assert!(description.contains("Microsoft Teams Meeting:\nhttps://teams.microsoft.com/"));

    assert_eq!(property(&parsed[1], "TRANSP"), Some("TRANSPARENT"));

    let budget = &parsed[2];
    assert_eq!(
        unescape_text(property(budget, "SUMMARY").unwrap()),
        "Canceled: Budget; Q4, review"
    );
    assert_eq!(property(budget, "STATUS"), Some("CANCELLED"));
}

#[test]
fn test_uids_are_stable_across_runs() {
    let raws = vec![record("Standup", "2025-09-29T10:30", "2025-09-29T11:00", "Busy")];
    let (first, _) = normalize_all(&raws, &normalizer_config());

    let renamed = vec![record(" STANDUP ", "2025-09-29T10:30", "2025-09-29T11:15", "Tentative")];
    let (second, _) = normalize_all(&renamed, &normalizer_config());

    assert_eq!(event_uid(&first[0]), event_uid(&second[0]));

    let other_day = vec![record("Standup", "2025-09-30T10:30", "2025-09-30T11:00", "Busy")];
    let (third, _) = normalize_all(&other_day, &normalizer_config());
    assert_ne!(event_uid(&first[0]), event_uid(&third[0]));
}

#[tokio::test]
async fn test_write_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calendar.ics");
    let raws = vec![record("Standup", "2025-09-29T10:30", "2025-09-29T11:00", "Busy")];
    let (events, _) = normalize_all(&raws, &normalizer_config());

    IcsWriter::new("Work", "America/Los_Angeles")
        .write_to(&path, &events)
        .await
        .unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
    assert_eq!(written.matches("BEGIN:VEVENT").count(), 1);
}
