use crate::components::event::RawEventRecord;
use crate::utils::time::to_24_hour;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const SHOW_AS_VALUES: [&str; 4] = ["Tentative", "Busy", "Free", "Out of Office"];

lazy_static! {
    static ref TIME_RANGE: Regex = Regex::new(
        r"(\d{1,2}):(\d{2})\s*([AaPp][Mm])?\s+to\s+(\d{1,2}):(\d{2})\s*([AaPp][Mm])?"
    )
    .expect("time range pattern is valid");
    static ref EVENT_CELL: Selector =
        Selector::parse("div[aria-label]").expect("event cell selector is valid");
}

/// Scrape every calendar cell of an Outlook page
pub fn parse_events(html: &str) -> Vec<RawEventRecord> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();
    let mut rejected = 0;

    for cell in document.select(&EVENT_CELL) {
        let Some(label) = cell.value().attr("aria-label") else {
            continue;
        };
        if !is_event_label(label) {
            continue;
        }
        match parse_event_label(label) {
            Some(record) => records.push(record),
            None => {
                rejected += 1;
                warn!("Could not parse event: {}...", label.chars().take(100).collect::<String>());
            }
        }
    }

    info!("Found {} events ({} unparseable labels)", records.len(), rejected);
    records
}

/// Event cells read "<title>, HH:MM to HH:MM, <weekday>, ..."
fn is_event_label(label: &str) -> bool {
    label.contains(" to ") && WEEKDAYS.iter().any(|day| label.contains(day))
}

/// Parse `Title, HH:MM to HH:MM, Weekday, Month DD, YYYY, By Organizer, ShowAs, Type`.
///
/// Titles may contain ", " so the title is everything before the first
/// part holding a time range.
pub fn parse_event_label(label: &str) -> Option<RawEventRecord> {
    let parts: Vec<&str> = label.split(", ").collect();
    if parts.len() < 5 {
        return None;
    }

    let (time_idx, caps) = parts
        .iter()
        .enumerate()
        .find_map(|(i, part)| TIME_RANGE.captures(part).map(|caps| (i, caps)))?;
    if time_idx == 0 || time_idx + 3 >= parts.len() {
        return None;
    }

    let number = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
    let end_meridiem = caps.get(6).map(|m| m.as_str());
    let start_meridiem = caps.get(3).map(|m| m.as_str()).or(end_meridiem);
    let (start_hour, start_min) = to_24_hour(number(1)?, number(2)?, start_meridiem)?;
    let (end_hour, end_min) = to_24_hour(number(4)?, number(5)?, end_meridiem)?;

    let title = parts[..time_idx].join(", ");
    let month_day = parts[time_idx + 2].trim();
    let year = parts[time_idx + 3].trim();
    let date = format!("{}, {}", month_day, year);

    let details = &parts[time_idx + 4..];
    let organizer = details
        .iter()
        .find_map(|part| part.strip_prefix("By "))
        .map(|name| name.trim().to_string())
        .unwrap_or_default();
    let show_as = details
        .iter()
        .rev()
        .find(|part| SHOW_AS_VALUES.contains(&part.trim()))
        .map(|part| part.trim().to_string())
        .unwrap_or_default();
    let event_type = details
        .iter()
        .rev()
        .find(|part| ["Recurring", "Exception", "Canceled"].iter().any(|t| part.contains(t)))
        .map(|part| part.trim().to_string())
        .unwrap_or_default();

    let is_cancelled = title.contains("Canceled:") || event_type.contains("Canceled");
    let is_recurring = event_type.contains("Recurring") || event_type.contains("Exception");

    let record = RawEventRecord {
        title,
        start: format!("{} {:02}:{:02}", date, start_hour, start_min),
        end: Some(format!("{} {:02}:{:02}", date, end_hour, end_min)),
        organizer,
        organizer_email: None,
        show_as,
        event_type,
        is_recurring,
        is_cancelled,
    };
    debug!("Parsed cell '{}' starting {}", record.title, record.start);
    Some(record)
}
