#![allow(dead_code)]

use async_trait::async_trait;
use chrono_tz::Tz;
use outlook_sync::components::{
    Event, NormalizerConfig, RawEventRecord, RemoteCalendar, RemoteError, RemoteEventRef, TimeWindow,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory remote calendar with failure injection
#[derive(Debug, Default)]
pub struct MockRemoteCalendar {
    events: Mutex<Vec<RemoteEventRef>>,
    next_id: AtomicUsize,
    /// Every write for these titles fails with the stored error
    failing_titles: Mutex<HashMap<String, RemoteError>>,
    /// The next N writes fail with HTTP 503
    transient_failures: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
    lists: AtomicUsize,
}

impl MockRemoteCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock pre-populated with remote events
    pub fn with_events(events: Vec<RemoteEventRef>) -> Self {
        let mock = Self::new();
        mock.next_id.store(events.len(), Ordering::SeqCst);
        *mock.events.lock().unwrap() = events;
        mock
    }

    pub fn snapshot(&self) -> Vec<RemoteEventRef> {
        self.events.lock().unwrap().clone()
    }

    pub fn fail_title(&self, title: &str, error: RemoteError) {
        self.failing_titles
            .lock()
            .unwrap()
            .insert(title.to_string(), error);
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    fn injected_failure(&self, event: &Event) -> Option<RemoteError> {
        if let Some(error) = self.failing_titles.lock().unwrap().get(&event.title) {
            return Some(error.clone());
        }
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Some(RemoteError::Server {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        None
    }
}

#[async_trait]
impl RemoteCalendar for MockRemoteCalendar {
    async fn list(&self, window: TimeWindow) -> Result<Vec<RemoteEventRef>, RemoteError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| window.contains(e.start))
            .cloned()
            .collect())
    }

    async fn create(&self, event: &Event) -> Result<RemoteEventRef, RemoteError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.injected_failure(event) {
            return Err(error);
        }
        let id = format!("evt{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let remote = RemoteEventRef::from_event(id, event);
        self.events.lock().unwrap().push(remote.clone());
        Ok(remote)
    }

    async fn update(&self, remote_id: &str, event: &Event) -> Result<RemoteEventRef, RemoteError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.injected_failure(event) {
            return Err(error);
        }
        let mut events = self.events.lock().unwrap();
        let slot = events
            .iter_mut()
            .find(|e| e.remote_id == remote_id)
            .ok_or_else(|| RemoteError::Validation {
                status: 404,
                message: format!("no event {}", remote_id),
            })?;
        *slot = RemoteEventRef::from_event(remote_id, event);
        Ok(slot.clone())
    }
}

pub fn normalizer_config() -> NormalizerConfig {
    NormalizerConfig {
        email_domain: "example.com".to_string(),
        timezone: "America/Los_Angeles".parse::<Tz>().unwrap(),
        meeting_link: None,
    }
}

/// Record as scraped from an Outlook cell
pub fn record(title: &str, start: &str, end: &str, show_as: &str) -> RawEventRecord {
    RawEventRecord {
        title: title.to_string(),
        start: start.to_string(),
        end: Some(end.to_string()),
        organizer: "Jane Doe".to_string(),
        show_as: show_as.to_string(),
        ..Default::default()
    }
}
