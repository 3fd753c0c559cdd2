//! iCalendar (RFC 5545) output.
//!
//! Times are written in UTC so the file needs no VTIMEZONE blocks; the
//! configured zone is advertised through `X-WR-TIMEZONE` for clients that
//! display it. UIDs are UUID v5 values derived from the occurrence key, so
//! regenerating from the same export yields the same UIDs.

use super::event::Event;
use crate::error::SyncResult;
use crate::utils::time::format_ics_utc;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub const PRODID: &str = "-//outlook-sync//Outlook Calendar Export//EN";
pub const DEFAULT_CALENDAR_NAME: &str = "Outlook Calendar Export";

/// Longest content line in octets, excluding the CRLF
const MAX_LINE_OCTETS: usize = 75;

/// Renders normalized events as an iCalendar document
#[derive(Debug, Clone)]
pub struct IcsWriter {
    calendar_name: String,
    timezone: String,
}

impl IcsWriter {
    pub fn new(calendar_name: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            calendar_name: calendar_name.into(),
            timezone: timezone.into(),
        }
    }

    /// Full document; `generated_at` becomes every DTSTAMP
    pub fn render(&self, events: &[Event], generated_at: DateTime<Utc>) -> String {
        let mut lines = vec![
            "BEGIN:VCALENDAR".to_string(),
            "VERSION:2.0".to_string(),
            format!("PRODID:{}", PRODID),
            "CALSCALE:GREGORIAN".to_string(),
            "METHOD:PUBLISH".to_string(),
            format!("X-WR-CALNAME:{}", escape_text(&self.calendar_name)),
            format!("X-WR-TIMEZONE:{}", self.timezone),
        ];

        let dtstamp = format_ics_utc(&generated_at);
        for event in events {
            push_event(&mut lines, event, &dtstamp);
        }
        lines.push("END:VCALENDAR".to_string());

        let mut out = String::new();
        for line in lines {
            out.push_str(&fold_line(&line));
            out.push_str("\r\n");
        }
        out
    }

    /// Render and write to `path`
    pub async fn write_to(&self, path: &Path, events: &[Event]) -> SyncResult<()> {
        let content = self.render(events, Utc::now());
        tokio::fs::write(path, content).await?;
        info!("Wrote {} events to {}", events.len(), path.display());
        Ok(())
    }
}

fn push_event(lines: &mut Vec<String>, event: &Event, dtstamp: &str) {
    lines.push("BEGIN:VEVENT".to_string());
    lines.push(format!("UID:{}", event_uid(event)));
    lines.push(format!("DTSTAMP:{}", dtstamp));
    lines.push(format!("DTSTART:{}", format_ics_utc(&event.start)));
    lines.push(format!("DTEND:{}", format_ics_utc(&event.end)));
    lines.push(format!("SUMMARY:{}", escape_text(&event.title)));
    lines.push(format!("STATUS:{}", event.status.as_ics_str()));
    if let Some(organizer) = &event.organizer {
        lines.push(format!(
            "ORGANIZER;CN={}:mailto:{}",
            quote_param(&organizer.name),
            organizer.email
        ));
    }
    if let Some(description) = &event.description {
        lines.push(format!("DESCRIPTION:{}", escape_text(description)));
    }
    if let Some(location) = &event.location {
        lines.push(format!("LOCATION:{}", escape_text(location)));
    }
    lines.push(format!("TRANSP:{}", event.transparency.as_ics_str()));
    lines.push("END:VEVENT".to_string());
}

/// Stable UID for an occurrence
pub fn event_uid(event: &Event) -> String {
    let key = event.key();
    let name = format!("{}|{}", key.title, key.start_minute);
    format!("{}@outlook-sync", Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
}

/// Escape a TEXT value
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of `escape_text`
pub fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Parameter values containing `:;,` must be quoted; DQUOTE itself is not allowed
fn quote_param(value: &str) -> String {
    let cleaned: String = value.chars().filter(|c| *c != '"').collect();
    if cleaned.contains(|c: char| matches!(c, ':' | ';' | ',')) {
        format!("\"{}\"", cleaned)
    } else {
        cleaned
    }
}

/// Fold a content line at 75 octets without splitting a UTF-8 sequence
fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut used = 0;
    // continuation lines start with a space that counts toward the limit
    let mut limit = MAX_LINE_OCTETS;
    for c in line.chars() {
        let width = c.len_utf8();
        if used + width > limit {
            out.push_str("\r\n ");
            used = 0;
            limit = MAX_LINE_OCTETS - 1;
        }
        out.push(c);
        used += width;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_round_trip() {
        let text = "Budget; Q4, review\\notes\nsecond line";
        let escaped = escape_text(text);
        assert_eq!(escaped, "Budget\\; Q4\\, review\\\\notes\\nsecond line");
        assert_eq!(unescape_text(&escaped), text);
    }

    #[test]
    fn test_fold_line_respects_octet_limit() {
        let line = format!("DESCRIPTION:{}", "ä".repeat(80));
        let folded = fold_line(&line);
        for (i, physical) in folded.split("\r\n").enumerate() {
            assert!(physical.len() <= MAX_LINE_OCTETS, "line {} too long", i);
            if i > 0 {
                assert!(physical.starts_with(' '));
            }
        }
        let unfolded = folded.replace("\r\n ", "");
        assert_eq!(unfolded, line);
    }

    #[test]
    fn test_short_lines_are_untouched() {
        assert_eq!(fold_line("SUMMARY:Standup"), "SUMMARY:Standup");
    }

    #[test]
    fn test_quote_param() {
        assert_eq!(quote_param("Jane Doe"), "Jane Doe");
        assert_eq!(quote_param("Doe, Jane"), "\"Doe, Jane\"");
    }
}
