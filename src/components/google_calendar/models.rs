use super::time::parse_event_time;
use crate::components::event::{Event, EventStatus, Transparency};
use crate::components::remote::RemoteEventRef;
use serde::{Deserialize, Serialize};

/// Start or end of a Google Calendar event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// Set instead of `date_time` for all-day events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Simplified calendar event representation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub transparency: Option<String>,
    pub start: Option<EventDateTime>,
    pub end: Option<EventDateTime>,
    pub html_link: Option<String>,
}

impl CalendarEvent {
    /// Snapshot for the remote index; `None` for all-day or malformed entries
    pub fn into_remote_ref(self) -> Option<RemoteEventRef> {
        let start = parse_event_time(self.start.as_ref()?)?;
        let end = parse_event_time(self.end.as_ref()?)?;

        Some(RemoteEventRef {
            remote_id: self.id,
            title: self.summary.unwrap_or_default(),
            start,
            end,
            description: self.description,
            status: self
                .status
                .as_deref()
                .and_then(EventStatus::from_api_str)
                .unwrap_or_default(),
            transparency: self
                .transparency
                .as_deref()
                .and_then(Transparency::from_api_str)
                .unwrap_or_default(),
            html_link: self.html_link,
        })
    }
}

/// One page of `events.list`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsPage {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,
    pub next_page_token: Option<String>,
}

/// Body sent to `events.insert` and `events.update`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub summary: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub status: String,
    pub transparency: String,
}

impl From<&Event> for EventPayload {
    fn from(event: &Event) -> Self {
        let time_zone = event.start.timezone().name().to_string();
        Self {
            summary: event.title.clone(),
            description: event.description.clone().unwrap_or_default(),
            location: event.location.clone(),
            start: EventDateTime {
                date_time: Some(event.start.to_rfc3339()),
                date: None,
                time_zone: Some(time_zone.clone()),
            },
            end: EventDateTime {
                date_time: Some(event.end.to_rfc3339()),
                date: None,
                time_zone: Some(time_zone),
            },
            status: event.status.as_api_str().to_string(),
            transparency: event.transparency.as_api_str().to_string(),
        }
    }
}

/// Entry of `calendarList.list`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarListEntry {
    pub id: String,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListPage {
    #[serde(default)]
    pub items: Vec<CalendarListEntry>,
    pub next_page_token: Option<String>,
}

/// Body sent to `calendars.insert`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCalendar {
    pub summary: String,
    pub time_zone: String,
}
