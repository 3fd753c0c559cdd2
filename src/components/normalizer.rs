use super::event::{Event, EventStatus, Organizer, RawEventRecord, Transparency, UNTITLED_EVENT};
use crate::utils::time::{parse_local_datetime, LocalTimeError};
use chrono::Duration;
use chrono_tz::Tz;
use thiserror::Error;
use tracing::warn;

/// Duration given to events scraped without an end time
pub const DEFAULT_EVENT_MINUTES: i64 = 30;

/// Label shown as the location when a meeting link is configured
pub const MEETING_LOCATION: &str = "Microsoft Teams Meeting";

/// Settings shared by every record of one run
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerConfig {
    pub email_domain: String,
    pub timezone: Tz,
    pub meeting_link: Option<String>,
}

/// A raw record that was left out of the run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("skipped '{title}': {reason}")]
pub struct RecordWarning {
    pub title: String,
    pub reason: String,
}

/// Turn one scraped record into a canonical event
pub fn normalize(raw: &RawEventRecord, config: &NormalizerConfig) -> Result<Event, RecordWarning> {
    let title = match raw.title.trim() {
        "" => UNTITLED_EVENT.to_string(),
        trimmed => trimmed.to_string(),
    };
    let reject = |field: &str, err: LocalTimeError| RecordWarning {
        title: title.clone(),
        reason: format!("{} time: {}", field, err),
    };

    let start = parse_local_datetime(&raw.start, config.timezone).map_err(|e| reject("start", e))?;
    let end = match raw.end.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => parse_local_datetime(text, config.timezone).map_err(|e| reject("end", e))?,
        None => start + Duration::minutes(DEFAULT_EVENT_MINUTES),
    };
    // "23:30 to 00:15" style cells end on the following day
    let end = if end < start { end + Duration::days(1) } else { end };
    if end < start {
        return Err(RecordWarning {
            title,
            reason: "end time before start".to_string(),
        });
    }

    let status = if raw.is_cancelled {
        EventStatus::Cancelled
    } else {
        map_status(&raw.show_as).unwrap_or_else(|| {
            warn!("Unrecognized status '{}' for '{}', assuming confirmed", raw.show_as, title);
            EventStatus::Confirmed
        })
    };

    let organizer = match raw.organizer.trim() {
        "" => None,
        name => Some(Organizer {
            name: name.to_string(),
            email: raw
                .organizer_email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| synthesize_email(name, &config.email_domain)),
        }),
    };

    Ok(Event {
        title,
        start,
        end,
        status,
        transparency: map_transparency(&raw.show_as),
        is_recurring_instance: raw.is_recurring,
        description: build_description(organizer.as_ref(), &raw.event_type, config.meeting_link.as_deref()),
        location: config.meeting_link.as_ref().map(|_| MEETING_LOCATION.to_string()),
        organizer,
    })
}

/// Normalize a batch, logging and dropping records that cannot be used
pub fn normalize_all(raws: &[RawEventRecord], config: &NormalizerConfig) -> (Vec<Event>, Vec<RecordWarning>) {
    let mut events = Vec::with_capacity(raws.len());
    let mut warnings = Vec::new();

    for raw in raws {
        match normalize(raw, config) {
            Ok(event) => events.push(event),
            Err(warning) => {
                warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }

    (events, warnings)
}

/// Map Outlook "show as" text to a status; `None` when the text is unknown
pub fn map_status(text: &str) -> Option<EventStatus> {
    match text.trim().to_lowercase().as_str() {
        "tentative" => Some(EventStatus::Tentative),
        "" | "busy" | "free" | "out of office" | "working elsewhere" | "confirmed" => {
            Some(EventStatus::Confirmed)
        }
        "cancelled" | "canceled" => Some(EventStatus::Cancelled),
        _ => None,
    }
}

/// Only events explicitly shown as free leave the owner available
pub fn map_transparency(text: &str) -> Transparency {
    if text.trim().eq_ignore_ascii_case("free") {
        Transparency::Transparent
    } else {
        Transparency::Opaque
    }
}

/// `local-part@domain` from a display name
pub fn synthesize_email(name: &str, domain: &str) -> String {
    format!("{}@{}", sanitize_local_part(name), domain.trim().trim_start_matches('@'))
}

/// Lowercase, collapse whitespace runs to a single `.`, drop anything else unsafe
pub fn sanitize_local_part(name: &str) -> String {
    let joined = name.split_whitespace().collect::<Vec<_>>().join(".").to_lowercase();
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-'))
        .collect();

    match cleaned.trim_matches('.') {
        "" => "organizer".to_string(),
        local => local.to_string(),
    }
}

fn build_description(organizer: Option<&Organizer>, event_type: &str, meeting_link: Option<&str>) -> Option<String> {
    let mut lines = Vec::new();
    if let Some(organizer) = organizer {
        lines.push(format!("Organizer: {}", organizer.name));
        if !event_type.trim().is_empty() {
            lines.push(format!("Type: {}", event_type.trim()));
        }
    }

    let mut description = lines.join("\n");
    if let Some(link) = meeting_link.map(str::trim).filter(|l| !l.is_empty()) {
        if !description.is_empty() {
            description.push_str("\n\n");
        }
        description.push_str(&format!("{}:\n{}", MEETING_LOCATION, link));
    }

    if description.is_empty() {
        None
    } else {
        Some(description)
    }
}
