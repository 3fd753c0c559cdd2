use super::models::{CalendarEvent, CalendarListPage, EventPayload, EventsPage, NewCalendar};
use super::time::format_query_time;
use super::token::TokenManager;
use crate::components::event::Event;
use crate::components::remote::{RemoteError, RemoteEventRef, TimeWindow};
use crate::error::{google_calendar_error, SyncResult};
use crate::utils::retry::{retry_with_backoff, RetryConfig};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};
use url::Url;

/// Largest page the events endpoint serves
const MAX_RESULTS: &str = "2500";

/// Reasons Google reports with a 403 when a quota is exhausted
const RATE_LIMIT_REASONS: [&str; 2] = ["rateLimitExceeded", "userRateLimitExceeded"];

type RemoteReply<T> = mpsc::Sender<Result<T, RemoteError>>;

/// Commands that can be sent to the Google Calendar actor
pub enum GoogleCalendarCommand {
    Authenticate(mpsc::Sender<SyncResult<()>>),
    ListEvents {
        calendar_id: String,
        window: TimeWindow,
        respond_to: RemoteReply<Vec<RemoteEventRef>>,
    },
    CreateEvent {
        calendar_id: String,
        event: Box<Event>,
        respond_to: RemoteReply<RemoteEventRef>,
    },
    UpdateEvent {
        calendar_id: String,
        remote_id: String,
        event: Box<Event>,
        respond_to: RemoteReply<RemoteEventRef>,
    },
    /// Look a calendar up by name; with `time_zone` set, create it when missing
    EnsureCalendar {
        name: String,
        time_zone: Option<String>,
        respond_to: RemoteReply<Option<String>>,
    },
    Shutdown,
}

/// Handle for communicating with the Google Calendar actor
#[derive(Clone)]
pub struct GoogleCalendarActorHandle {
    command_tx: mpsc::Sender<GoogleCalendarCommand>,
}

impl GoogleCalendarActorHandle {
    /// Load the stored token, refreshing it if needed
    pub async fn authenticate(&self) -> SyncResult<()> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(GoogleCalendarCommand::Authenticate(response_tx))
            .await
            .map_err(|e| google_calendar_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| google_calendar_error("Response channel closed"))?
    }

    pub async fn list_events(&self, calendar_id: &str, window: TimeWindow) -> Result<Vec<RemoteEventRef>, RemoteError> {
        let (respond_to, response_rx) = mpsc::channel(1);
        self.request(
            GoogleCalendarCommand::ListEvents {
                calendar_id: calendar_id.to_string(),
                window,
                respond_to,
            },
            response_rx,
        )
        .await
    }

    pub async fn create_event(&self, calendar_id: &str, event: &Event) -> Result<RemoteEventRef, RemoteError> {
        let (respond_to, response_rx) = mpsc::channel(1);
        self.request(
            GoogleCalendarCommand::CreateEvent {
                calendar_id: calendar_id.to_string(),
                event: Box::new(event.clone()),
                respond_to,
            },
            response_rx,
        )
        .await
    }

    pub async fn update_event(
        &self,
        calendar_id: &str,
        remote_id: &str,
        event: &Event,
    ) -> Result<RemoteEventRef, RemoteError> {
        let (respond_to, response_rx) = mpsc::channel(1);
        self.request(
            GoogleCalendarCommand::UpdateEvent {
                calendar_id: calendar_id.to_string(),
                remote_id: remote_id.to_string(),
                event: Box::new(event.clone()),
                respond_to,
            },
            response_rx,
        )
        .await
    }

    /// ID of the calendar named `name`; created in `time_zone` when given and missing
    pub async fn ensure_calendar(&self, name: &str, time_zone: Option<&str>) -> Result<Option<String>, RemoteError> {
        let (respond_to, response_rx) = mpsc::channel(1);
        self.request(
            GoogleCalendarCommand::EnsureCalendar {
                name: name.to_string(),
                time_zone: time_zone.map(str::to_string),
                respond_to,
            },
            response_rx,
        )
        .await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> SyncResult<()> {
        let _ = self.command_tx.send(GoogleCalendarCommand::Shutdown).await;
        Ok(())
    }

    async fn request<T>(
        &self,
        command: GoogleCalendarCommand,
        mut response_rx: mpsc::Receiver<Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| RemoteError::InvalidResponse("Google Calendar actor is not running".to_string()))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| RemoteError::InvalidResponse("Response channel closed".to_string()))?
    }
}

/// Google Calendar v3 REST client shared by the actor's request tasks
#[derive(Clone)]
pub struct CalendarApi {
    client: Client,
    tokens: TokenManager,
    api_base: String,
    retry: RetryConfig,
}

impl CalendarApi {
    pub fn new(client: Client, tokens: TokenManager, api_base: String, retry: RetryConfig) -> Self {
        Self {
            client,
            tokens,
            api_base,
            retry,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| RemoteError::InvalidResponse(format!("Invalid API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidResponse("API base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send an authorized request and map failures to `RemoteError`
    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let access_token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| RemoteError::Unauthorized(e.to_string()))?;

        let response = request
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(request_error)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(response).await)
        }
    }

    /// Every event in `window`, following `nextPageToken`
    pub async fn list_events(&self, calendar_id: &str, window: TimeWindow) -> Result<Vec<RemoteEventRef>, RemoteError> {
        let mut refs = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0;

        loop {
            let outcome = retry_with_backoff(&self.retry, "List events page", || {
                self.fetch_page(calendar_id, window, page_token.as_deref())
            })
            .await;
            let page = outcome.result?;
            pages += 1;

            let listed = page.items.len();
            refs.extend(page.items.into_iter().filter_map(CalendarEvent::into_remote_ref));
            debug!("Fetched page {} with {} events", pages, listed);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        info!("Listed {} timed events in {} page(s)", refs.len(), pages);
        Ok(refs)
    }

    async fn fetch_page(
        &self,
        calendar_id: &str,
        window: TimeWindow,
        page_token: Option<&str>,
    ) -> Result<EventsPage, RemoteError> {
        let mut url = self.endpoint(&["calendars", calendar_id, "events"])?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("timeMin", &format_query_time(window.start))
                .append_pair("timeMax", &format_query_time(window.end))
                .append_pair("singleEvents", "true")
                .append_pair("showDeleted", "true")
                .append_pair("maxResults", MAX_RESULTS);
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }

        let response = self.send(self.client.get(url)).await?;
        response.json().await.map_err(request_error)
    }

    pub async fn insert_event(&self, calendar_id: &str, event: &Event) -> Result<RemoteEventRef, RemoteError> {
        let url = self.endpoint(&["calendars", calendar_id, "events"])?;
        let request = self.client.post(url).json(&EventPayload::from(event));
        let created = written_event(self.send(request).await?).await?;
        debug!("Created event {} ({})", created.id, event.title);
        Ok(written_ref(created, event))
    }

    pub async fn update_event(
        &self,
        calendar_id: &str,
        remote_id: &str,
        event: &Event,
    ) -> Result<RemoteEventRef, RemoteError> {
        let url = self.endpoint(&["calendars", calendar_id, "events", remote_id])?;
        let request = self.client.put(url).json(&EventPayload::from(event));
        let updated = written_event(self.send(request).await?).await?;
        debug!("Updated event {} ({})", updated.id, event.title);
        Ok(written_ref(updated, event))
    }

    /// Find a calendar by its summary, creating it when absent and `time_zone` is given
    pub async fn ensure_calendar(&self, name: &str, time_zone: Option<&str>) -> Result<Option<String>, RemoteError> {
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.endpoint(&["users", "me", "calendarList"])?;
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }
            let page: CalendarListPage = self
                .send(self.client.get(url))
                .await?
                .json()
                .await
                .map_err(request_error)?;

            if let Some(entry) = page
                .items
                .into_iter()
                .find(|entry| entry.summary.as_deref() == Some(name))
            {
                info!("Using existing calendar '{}' ({})", name, entry.id);
                return Ok(Some(entry.id));
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        let Some(time_zone) = time_zone else {
            return Ok(None);
        };
        let url = self.endpoint(&["calendars"])?;
        let body = NewCalendar {
            summary: name.to_string(),
            time_zone: time_zone.to_string(),
        };
        let created: serde_json::Value = self
            .send(self.client.post(url).json(&body))
            .await?
            .json()
            .await
            .map_err(request_error)?;
        let id = created
            .get("id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| RemoteError::InvalidResponse("Created calendar has no id".to_string()))?;

        info!("Created calendar '{}' ({})", name, id);
        Ok(Some(id.to_string()))
    }
}

async fn written_event(response: Response) -> Result<CalendarEvent, RemoteError> {
    let written: CalendarEvent = response.json().await.map_err(request_error)?;
    if written.id.is_empty() {
        return Err(RemoteError::InvalidResponse("Written event has no id".to_string()));
    }
    Ok(written)
}

/// The remote now holds `event` under the returned id
fn written_ref(written: CalendarEvent, event: &Event) -> RemoteEventRef {
    let mut remote = RemoteEventRef::from_event(written.id, event);
    remote.html_link = written.html_link;
    remote
}

fn request_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout(error.to_string())
    } else if error.is_decode() {
        RemoteError::InvalidResponse(error.to_string())
    } else {
        RemoteError::Network(error.to_string())
    }
}

/// Classify a non-success response
async fn status_error(response: Response) -> RemoteError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();
    let (message, reasons) = api_error_details(&body);

    if status == 403 && reasons.iter().any(|r| RATE_LIMIT_REASONS.contains(&r.as_str())) {
        return RemoteError::RateLimited { message, retry_after };
    }
    RemoteError::from_status(status, message, retry_after)
}

/// Message and reasons of a Google API error body
pub(crate) fn api_error_details(body: &str) -> (String, Vec<String>) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return (body.trim().to_string(), Vec::new());
    };
    let error = &value["error"];
    let message = error["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());
    let reasons = error["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["reason"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    (message, reasons)
}

/// The Google Calendar actor that processes messages
pub struct GoogleCalendarActor {
    api: CalendarApi,
    tokens: TokenManager,
    command_rx: mpsc::Receiver<GoogleCalendarCommand>,
}

impl GoogleCalendarActor {
    /// Create a new actor and return its handle
    pub fn new(api: CalendarApi) -> (Self, GoogleCalendarActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let actor = Self {
            tokens: api.tokens.clone(),
            api,
            command_rx,
        };
        (actor, GoogleCalendarActorHandle { command_tx })
    }

    /// Start the actor's processing loop; each request runs on its own task
    pub async fn run(&mut self) {
        info!("Google Calendar actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            let api = self.api.clone();
            match cmd {
                GoogleCalendarCommand::Authenticate(response_tx) => {
                    let tokens = self.tokens.clone();
                    tokio::spawn(async move {
                        let result = tokens.get_token().await.map(|_| ());
                        let _ = response_tx.send(result).await;
                    });
                }
                GoogleCalendarCommand::ListEvents {
                    calendar_id,
                    window,
                    respond_to,
                } => {
                    tokio::spawn(async move {
                        let result = api.list_events(&calendar_id, window).await;
                        let _ = respond_to.send(result).await;
                    });
                }
                GoogleCalendarCommand::CreateEvent {
                    calendar_id,
                    event,
                    respond_to,
                } => {
                    tokio::spawn(async move {
                        let result = api.insert_event(&calendar_id, &event).await;
                        let _ = respond_to.send(result).await;
                    });
                }
                GoogleCalendarCommand::UpdateEvent {
                    calendar_id,
                    remote_id,
                    event,
                    respond_to,
                } => {
                    tokio::spawn(async move {
                        let result = api.update_event(&calendar_id, &remote_id, &event).await;
                        let _ = respond_to.send(result).await;
                    });
                }
                GoogleCalendarCommand::EnsureCalendar {
                    name,
                    time_zone,
                    respond_to,
                } => {
                    tokio::spawn(async move {
                        let result = api.ensure_calendar(&name, time_zone.as_deref()).await;
                        let _ = respond_to.send(result).await;
                    });
                }
                GoogleCalendarCommand::Shutdown => {
                    info!("Google Calendar actor shutting down");
                    break;
                }
            }
        }

        info!("Google Calendar actor shut down");
    }
}
