mod common;

use common::normalizer_config;
use outlook_sync::components::outlook_export::{load_records, read_export};
use outlook_sync::components::{normalize_all, EventStatus, Transparency};
use outlook_sync::config::{Config, DEFAULT_CALENDAR_ID, DEFAULT_EMAIL_DOMAIN};
use outlook_sync::error::Error;
use std::io::Write;

const WEEK_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<div role="main">
  <div aria-label="Calendar week view">
    <div aria-label="Standup, 10:30 to 11:00, Monday, September 29, 2025, By Jane Doe, Busy, Recurring event">Standup</div>
    <div aria-label="1:1 with Pat, 2:00 PM to 2:30 PM, Monday, September 29, 2025, By Pat Lee, Tentative">1:1</div>
    <div aria-label="Canceled: Offsite, 09:00 to 17:00, Friday, October 3, 2025, By Sam Roe, Free, Canceled">Offsite</div>
  </div>
</div>
</body></html>"#;

const WEEK_MHTML: &str = "From: <Saved by Blink>\r\n\
Subject: Calendar - Outlook\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/related;\r\n\
\ttype=\"text/html\";\r\n\
\tboundary=\"----MultipartBoundary--week----\"\r\n\
\r\n\
------MultipartBoundary--week----\r\n\
Content-Type: text/html\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
<html><body><div aria-label=3D\"Standup, 10:30 to 11:00, Monday, September 29, =\r\n\
2025, By Jane Doe, Busy\">Standup</div></body></html>\r\n\
------MultipartBoundary--week------\r\n";

fn export_file(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Smoke test for an HTML export through normalization
#[tokio::test]
async fn test_html_export_to_events() {
    let file = export_file(WEEK_HTML, ".html");

    let records = load_records(file.path()).await.unwrap();
    assert_eq!(records.len(), 3);

    let (events, warnings) = normalize_all(&records, &normalizer_config());
    assert!(warnings.is_empty());
    assert_eq!(events[0].title, "Standup");
    assert!(events[0].is_recurring_instance);
    assert_eq!(events[1].status, EventStatus::Tentative);
    assert_eq!(events[1].start.format("%H:%M").to_string(), "14:00");
    assert_eq!(events[2].status, EventStatus::Cancelled);
    assert_eq!(events[2].transparency, Transparency::Transparent);
    assert_eq!(
        events[2].organizer.as_ref().map(|o| o.email.as_str()),
        Some("sam.roe@example.com")
    );
}

/// Smoke test for MHTML unwrapping
#[tokio::test]
async fn test_mhtml_export_is_unwrapped() {
    let file = export_file(WEEK_MHTML, ".mhtml");

    let html = read_export(file.path()).await.unwrap();
    assert!(html.contains("aria-label=\"Standup, 10:30 to 11:00, Monday, September 29, 2025"));

    let records = load_records(file.path()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].organizer, "Jane Doe");
}

#[tokio::test]
async fn test_missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = read_export(&dir.path().join("nope.mhtml")).await;
    assert!(matches!(result, Err(Error::Input(_))));
}

#[tokio::test]
async fn test_page_without_events_yields_nothing() {
    let file = export_file("<html><body><p>Nothing scheduled</p></body></html>", ".html");
    assert!(load_records(file.path()).await.unwrap().is_empty());
}

/// Smoke test to verify the config defaults
#[test]
fn test_config_defaults() {
    let config = Config::default();
    assert_eq!(config.email_domain, DEFAULT_EMAIL_DOMAIN);
    assert_eq!(config.timezone, "America/Los_Angeles");
    assert!(config.meeting_link.is_none());
    assert_eq!(config.settings.sync.concurrency, 4);
    assert_eq!(config.settings.retry.max_attempts, 4);
    assert!(config.normalizer_config().is_ok());
    assert_eq!(DEFAULT_CALENDAR_ID, "primary");
}
