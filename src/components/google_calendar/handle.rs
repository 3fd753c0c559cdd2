use super::actor::{CalendarApi, GoogleCalendarActor, GoogleCalendarActorHandle};
use super::token::TokenManager;
use crate::components::event::Event;
use crate::components::remote::{RemoteCalendar, RemoteError, RemoteEventRef, TimeWindow};
use crate::config::{Config, DEFAULT_CALENDAR_ID};
use crate::error::{google_calendar_error, SyncResult};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle for interacting with the Google Calendar actor
#[derive(Clone)]
pub struct GoogleCalendarHandle {
    actor_handle: GoogleCalendarActorHandle,
    calendar_id: String,
    _actor_task: Arc<JoinHandle<()>>,
}

impl GoogleCalendarHandle {
    /// Create a new GoogleCalendarHandle and spawn the actor
    pub fn new(config: &Config) -> SyncResult<Self> {
        let google = &config.settings.google;
        let client = Client::builder()
            .timeout(Duration::from_secs(google.request_timeout_secs))
            .build()?;

        let tokens = TokenManager::new(
            config.token_file.clone(),
            google.token_url.clone(),
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
            client.clone(),
        );
        let api = CalendarApi::new(
            client,
            tokens,
            google.api_base.clone(),
            config.settings.retry.clone(),
        );

        // Create the actor and get its handle
        let (mut actor, handle) = GoogleCalendarActor::new(api);

        // Spawn a task to run the actor
        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Ok(Self {
            actor_handle: handle,
            calendar_id: config
                .google_calendar_id
                .clone()
                .unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string()),
            _actor_task: Arc::new(actor_task),
        })
    }

    /// Same actor, writing to another calendar
    pub fn with_calendar(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// Check that a usable token is available
    pub async fn authenticate(&self) -> SyncResult<()> {
        self.actor_handle.authenticate().await
    }

    /// Find or create the calendar named `name`, returning its ID
    pub async fn ensure_calendar(&self, name: &str, time_zone: &str) -> SyncResult<String> {
        self.actor_handle
            .ensure_calendar(name, Some(time_zone))
            .await?
            .ok_or_else(|| google_calendar_error(&format!("Calendar '{}' could not be created", name)))
    }

    /// ID of the calendar named `name`, if it exists
    pub async fn find_calendar(&self, name: &str) -> SyncResult<Option<String>> {
        Ok(self.actor_handle.ensure_calendar(name, None).await?)
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.actor_handle.shutdown().await
    }
}

#[async_trait]
impl RemoteCalendar for GoogleCalendarHandle {
    async fn list(&self, window: TimeWindow) -> Result<Vec<RemoteEventRef>, RemoteError> {
        self.actor_handle.list_events(&self.calendar_id, window).await
    }

    async fn create(&self, event: &Event) -> Result<RemoteEventRef, RemoteError> {
        self.actor_handle.create_event(&self.calendar_id, event).await
    }

    async fn update(&self, remote_id: &str, event: &Event) -> Result<RemoteEventRef, RemoteError> {
        self.actor_handle
            .update_event(&self.calendar_id, remote_id, event)
            .await
    }
}
