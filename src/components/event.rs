use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt;

/// Placeholder used when a scraped cell carries no title
pub const UNTITLED_EVENT: &str = "(No title)";

/// Unstructured fields scraped from one calendar cell of the export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEventRecord {
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub organizer: String,
    pub organizer_email: Option<String>,
    /// Outlook "show as" text: Tentative, Busy, Free, Out of Office
    pub show_as: String,
    /// Outlook event type text: Recurring, Exception, Canceled
    pub event_type: String,
    pub is_recurring: bool,
    pub is_cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventStatus {
    Tentative,
    #[default]
    Confirmed,
    Cancelled,
}

impl EventStatus {
    /// Lowercase name used by the Google Calendar API
    pub fn as_api_str(&self) -> &'static str {
        match self {
            EventStatus::Tentative => "tentative",
            EventStatus::Confirmed => "confirmed",
            EventStatus::Cancelled => "cancelled",
        }
    }

    /// Uppercase name used by iCalendar STATUS
    pub fn as_ics_str(&self) -> &'static str {
        match self {
            EventStatus::Tentative => "TENTATIVE",
            EventStatus::Confirmed => "CONFIRMED",
            EventStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parse an API or iCalendar status value, case-insensitively
    pub fn from_api_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "tentative" => Some(EventStatus::Tentative),
            "confirmed" => Some(EventStatus::Confirmed),
            "cancelled" | "canceled" => Some(EventStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transparency {
    #[default]
    Opaque,
    Transparent,
}

impl Transparency {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Transparency::Opaque => "opaque",
            Transparency::Transparent => "transparent",
        }
    }

    pub fn as_ics_str(&self) -> &'static str {
        match self {
            Transparency::Opaque => "OPAQUE",
            Transparency::Transparent => "TRANSPARENT",
        }
    }

    pub fn from_api_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "opaque" => Some(Transparency::Opaque),
            "transparent" => Some(Transparency::Transparent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organizer {
    pub name: String,
    pub email: String,
}

/// Canonical event produced by the normalizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub title: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub organizer: Option<Organizer>,
    pub status: EventStatus,
    pub transparency: Transparency,
    pub is_recurring_instance: bool,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl Event {
    /// Identity used to match this occurrence against remote events
    pub fn key(&self) -> OccurrenceKey {
        OccurrenceKey::new(&self.title, self.start.with_timezone(&Utc))
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }
}

/// Exact-match identity of an occurrence: normalized title plus start minute
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OccurrenceKey {
    pub title: String,
    pub start_minute: i64,
}

impl OccurrenceKey {
    pub fn new(title: &str, start: DateTime<Utc>) -> Self {
        Self {
            title: normalize_title(title),
            start_minute: start.timestamp().div_euclid(60),
        }
    }
}

impl fmt::Display for OccurrenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::<Utc>::from_timestamp(self.start_minute * 60, 0) {
            Some(start) => write!(f, "{} @ {}", self.title, start.format("%Y-%m-%d %H:%M UTC")),
            None => write!(f, "{} @ minute {}", self.title, self.start_minute),
        }
    }
}

/// Trim and case-fold a title for matching. Deliberately nothing fuzzier.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}
