use super::event::{Event, EventStatus, OccurrenceKey, Transparency};
use crate::utils::retry::Retryable;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::time::Duration as StdDuration;
use thiserror::Error;

/// Half-open time range `[start, end)` used to list remote events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window covering every event start, padded by a day on each side
    pub fn covering(events: &[Event]) -> Option<Self> {
        let starts = events.iter().map(|e| e.start.with_timezone(&Utc));
        let min = starts.clone().min()?;
        let max = starts.max()?;
        Some(Self {
            start: min - Duration::days(1),
            end: max + Duration::days(1),
        })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Snapshot of a remote event as last reported by the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEventRef {
    pub remote_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: Option<String>,
    pub status: EventStatus,
    pub transparency: Transparency,
    pub html_link: Option<String>,
}

impl RemoteEventRef {
    pub fn key(&self) -> OccurrenceKey {
        OccurrenceKey::new(&self.title, self.start)
    }

    /// Snapshot the remote store would hold after writing `event` under `remote_id`
    pub fn from_event(remote_id: impl Into<String>, event: &Event) -> Self {
        Self {
            remote_id: remote_id.into(),
            title: event.title.clone(),
            start: event.start.with_timezone(&Utc),
            end: event.end.with_timezone(&Utc),
            description: event.description.clone(),
            status: event.status,
            transparency: event.transparency,
            html_link: None,
        }
    }
}

/// Failure reported by a remote calendar
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by remote calendar: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<StdDuration>,
    },

    #[error("remote server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("remote rejected the request (HTTP {status}): {message}")]
    Validation { status: u16, message: String },

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Map an HTTP failure status to the error taxonomy
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Option<StdDuration>) -> Self {
        let message = message.into();
        match status {
            429 => RemoteError::RateLimited {
                message,
                retry_after,
            },
            401 => RemoteError::Unauthorized(message),
            408 => RemoteError::Timeout(message),
            500..=599 => RemoteError::Server { status, message },
            _ => RemoteError::Validation { status, message },
        }
    }
}

impl Retryable for RemoteError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::Timeout(_)
                | RemoteError::Network(_)
                | RemoteError::RateLimited { .. }
                | RemoteError::Server { .. }
        )
    }

    fn retry_after(&self) -> Option<StdDuration> {
        match self {
            RemoteError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Remote calendar capability the sync engine writes to.
///
/// Implementations must return every event in the window from `list`,
/// following pagination internally. No consistency guarantee is assumed.
#[async_trait]
pub trait RemoteCalendar: Send + Sync {
    async fn list(&self, window: TimeWindow) -> Result<Vec<RemoteEventRef>, RemoteError>;

    async fn create(&self, event: &Event) -> Result<RemoteEventRef, RemoteError>;

    async fn update(&self, remote_id: &str, event: &Event) -> Result<RemoteEventRef, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            RemoteError::from_status(429, "slow down", None),
            RemoteError::RateLimited { .. }
        ));
        assert!(matches!(
            RemoteError::from_status(503, "unavailable", None),
            RemoteError::Server { status: 503, .. }
        ));
        assert!(matches!(
            RemoteError::from_status(400, "bad", None),
            RemoteError::Validation { status: 400, .. }
        ));
        assert!(matches!(
            RemoteError::from_status(401, "expired", None),
            RemoteError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_only_transient_errors_retry() {
        assert!(RemoteError::Timeout("t".into()).is_transient());
        assert!(RemoteError::from_status(502, "", None).is_transient());
        assert!(RemoteError::from_status(429, "", None).is_transient());
        assert!(!RemoteError::from_status(400, "", None).is_transient());
        assert!(!RemoteError::from_status(404, "", None).is_transient());
        assert!(!RemoteError::Unauthorized("".into()).is_transient());
    }
}
