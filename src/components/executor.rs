use super::event::{Event, OccurrenceKey};
use super::reconciler::{classify, Decision, SyncAction};
use super::remote::{RemoteCalendar, RemoteError, RemoteEventRef};
use super::remote_index::may_match;
use crate::utils::retry::{retry_with_backoff, RetryConfig, RetryOutcome};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Executor tuning, loaded from the `[sync]` table of `config/sync.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Occurrence groups applied at the same time
    pub concurrency: usize,
    /// Log progress every this many processed events; 0 disables it
    pub progress_interval: usize,
    #[serde(skip)]
    pub retry: RetryConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            progress_interval: 10,
            retry: RetryConfig::default(),
        }
    }
}

/// An event whose remote write failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEvent {
    /// Position of the decision in the executed list
    pub position: usize,
    pub title: String,
    pub start: DateTime<Utc>,
    pub action: SyncAction,
    pub error: String,
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Extra attempts spent on transient errors
    pub retried: usize,
    /// Decisions left unexecuted because the run was cancelled
    pub not_attempted: usize,
    /// Events processed: created + updated + skipped + failed
    pub total: usize,
    pub failures: Vec<FailedEvent>,
}

impl RunStatistics {
    fn record(&mut self, position: usize, event: &Event, action: SyncAction, result: &Applied) {
        match result {
            Applied::Created(_) => self.created += 1,
            Applied::Updated(_) => self.updated += 1,
            Applied::Skipped => self.skipped += 1,
            Applied::Failed(message) => {
                self.failed += 1;
                self.failures.push(FailedEvent {
                    position,
                    title: event.title.clone(),
                    start: event.start.with_timezone(&Utc),
                    action,
                    error: message.clone(),
                });
            }
        }
        self.total += 1;
    }
}

enum Applied {
    Created(RemoteEventRef),
    Updated(RemoteEventRef),
    Skipped,
    Failed(String),
}

impl Applied {
    fn fresh_ref(&self) -> Option<&RemoteEventRef> {
        match self {
            Applied::Created(r) | Applied::Updated(r) => Some(r),
            _ => None,
        }
    }
}

/// Applies decisions to a remote calendar and keeps the run statistics
pub struct SyncExecutor<'a> {
    remote: &'a dyn RemoteCalendar,
    config: ExecutorConfig,
    stats: Mutex<RunStatistics>,
}

impl<'a> SyncExecutor<'a> {
    pub fn new(remote: &'a dyn RemoteCalendar, config: ExecutorConfig) -> Self {
        Self {
            remote,
            config,
            stats: Mutex::new(RunStatistics::default()),
        }
    }

    /// Apply every decision; failures are counted, never propagated
    pub async fn execute(self, decisions: Vec<Decision>) -> RunStatistics {
        self.execute_until(decisions, &CancellationToken::new()).await
    }

    /// Like `execute`, but stops dispatching once `cancel` fires
    pub async fn execute_until(self, decisions: Vec<Decision>, cancel: &CancellationToken) -> RunStatistics {
        let total = decisions.len();
        let groups = group_by_occurrence(decisions);
        let concurrency = self.config.concurrency.max(1);
        info!(
            "Applying {} decisions in {} occurrence groups ({} at a time)",
            total,
            groups.len(),
            concurrency
        );

        stream::iter(groups.into_iter().map(|group| self.run_group(group, total, cancel)))
            .buffer_unordered(concurrency)
            .collect::<Vec<()>>()
            .await;

        let mut stats = self
            .stats
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stats.failures.sort_by_key(|f| f.position);
        stats
    }

    /// Decisions for one occurrence run in order; each later one is
    /// re-checked against what the earlier one wrote.
    async fn run_group(&self, group: Vec<(usize, Decision)>, total: usize, cancel: &CancellationToken) {
        let mut fresh: Option<RemoteEventRef> = None;

        for (position, decision) in group {
            if cancel.is_cancelled() {
                self.with_stats(|stats| stats.not_attempted += 1);
                continue;
            }

            let decision = match &fresh {
                Some(latest) if may_match(latest, &decision.event) => classify(&decision.event, Some(latest)),
                _ => decision,
            };

            let (result, retries) = self.apply(&decision).await;
            if let Some(written) = result.fresh_ref() {
                fresh = Some(written.clone());
            }

            let processed = self.with_stats(|stats| {
                stats.retried += retries as usize;
                stats.record(position, &decision.event, decision.action, &result);
                (stats.total, stats.created, stats.updated, stats.skipped, stats.failed)
            });
            self.report_progress(processed, total);
        }
    }

    async fn apply(&self, decision: &Decision) -> (Applied, u32) {
        let event = &decision.event;
        let label = format!("{} '{}' @ {}", decision.action, event.title, event.start.format("%Y-%m-%d %H:%M"));

        match decision.action {
            SyncAction::Skip => (Applied::Skipped, 0),
            SyncAction::Create => {
                let outcome = retry_with_backoff(&self.config.retry, &label, || self.remote.create(event)).await;
                Self::settle(&label, outcome, Applied::Created)
            }
            SyncAction::Update => {
                let Some(target) = decision.target.as_ref() else {
                    error!("Cannot {}: no remote target", label);
                    return (Applied::Failed("update without a remote target".to_string()), 0);
                };
                let outcome = retry_with_backoff(&self.config.retry, &label, || {
                    self.remote.update(&target.remote_id, event)
                })
                .await;
                Self::settle(&label, outcome, Applied::Updated)
            }
        }
    }

    fn settle(
        label: &str,
        outcome: RetryOutcome<RemoteEventRef, RemoteError>,
        on_success: fn(RemoteEventRef) -> Applied,
    ) -> (Applied, u32) {
        let retries = outcome.retries();
        match outcome.result {
            Ok(remote_ref) => (on_success(remote_ref), retries),
            Err(e) => {
                error!("Failed to {} after {} attempt(s): {}", label, outcome.attempts, e);
                (Applied::Failed(e.to_string()), retries)
            }
        }
    }

    fn with_stats<T>(&self, f: impl FnOnce(&mut RunStatistics) -> T) -> T {
        let mut guard = self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    fn report_progress(&self, (processed, created, updated, skipped, failed): (usize, usize, usize, usize, usize), total: usize) {
        let interval = self.config.progress_interval;
        if interval == 0 || processed % interval != 0 {
            return;
        }
        if failed > 0 {
            warn!(
                "Processed {}/{} events... (created: {}, updated: {}, skipped: {}, failed: {})",
                processed, total, created, updated, skipped, failed
            );
        } else {
            info!(
                "Processed {}/{} events... (created: {}, updated: {}, skipped: {})",
                processed, total, created, updated, skipped
            );
        }
    }
}

/// Group decisions by occurrence key, keeping first-seen group order and
/// input order inside each group
fn group_by_occurrence(decisions: Vec<Decision>) -> Vec<Vec<(usize, Decision)>> {
    let mut slots: HashMap<OccurrenceKey, usize> = HashMap::new();
    let mut groups: Vec<Vec<(usize, Decision)>> = Vec::new();

    for (position, decision) in decisions.into_iter().enumerate() {
        let key = decision.event.key();
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push((position, decision));
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::event::{EventStatus, Transparency};
    use crate::components::remote::TimeWindow;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use chrono_tz::Tz;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls with the given error, then succeeds
    struct FlakyRemote {
        failures: usize,
        error: RemoteError,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteCalendar for FlakyRemote {
        async fn list(&self, _window: TimeWindow) -> Result<Vec<RemoteEventRef>, RemoteError> {
            Ok(Vec::new())
        }

        async fn create(&self, event: &Event) -> Result<RemoteEventRef, RemoteError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(RemoteEventRef::from_event(format!("id-{}", n), event))
            }
        }

        async fn update(&self, remote_id: &str, event: &Event) -> Result<RemoteEventRef, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RemoteEventRef::from_event(remote_id, event))
        }
    }

    fn event(title: &str) -> Event {
        let tz: Tz = "UTC".parse().unwrap();
        let start = tz.with_ymd_and_hms(2025, 9, 29, 10, 30, 0).unwrap();
        Event {
            title: title.to_string(),
            start,
            end: start + Duration::minutes(30),
            organizer: None,
            status: EventStatus::Confirmed,
            transparency: Transparency::Opaque,
            is_recurring_instance: false,
            description: None,
            location: None,
        }
    }

    fn create(title: &str) -> Decision {
        classify(&event(title), None)
    }

    fn config(max_attempts: u32) -> ExecutorConfig {
        ExecutorConfig {
            concurrency: 2,
            progress_interval: 1,
            retry: RetryConfig {
                max_attempts,
                initial_delay_ms: 0,
                multiplier: 1.0,
                max_delay_ms: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let remote = FlakyRemote {
            failures: 2,
            error: RemoteError::from_status(503, "busy", None),
            calls: AtomicUsize::new(0),
        };
        let stats = SyncExecutor::new(&remote, config(3)).execute(vec![create("Standup")]).await;

        assert_eq!(stats.created, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.retried, 2);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_validation_failure_is_not_retried() {
        let remote = FlakyRemote {
            failures: 1,
            error: RemoteError::from_status(400, "bad time range", None),
            calls: AtomicUsize::new(0),
        };
        let stats = SyncExecutor::new(&remote, config(5))
            .execute(vec![create("Broken"), create("Fine")])
            .await;

        assert_eq!(remote.calls.load(Ordering::SeqCst), 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.retried, 0);
        assert_eq!(stats.failures.len(), 1);
        assert!(stats.failures[0].error.contains("bad time range"));
    }

    #[tokio::test]
    async fn test_duplicate_occurrences_do_not_double_create() {
        let remote = FlakyRemote {
            failures: 0,
            error: RemoteError::Timeout(String::new()),
            calls: AtomicUsize::new(0),
        };
        let stats = SyncExecutor::new(&remote, config(1))
            .execute(vec![create("Standup"), create("standup ")])
            .await;

        // the second copy is re-checked against the first write and updated
        assert_eq!(stats.created, 1);
        assert_eq!(stats.updated, 1);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_live_copy_does_not_overwrite_cancelled_copy() {
        let remote = FlakyRemote {
            failures: 0,
            error: RemoteError::Timeout(String::new()),
            calls: AtomicUsize::new(0),
        };
        let mut cancelled = event("Standup");
        cancelled.status = EventStatus::Cancelled;
        let stats = SyncExecutor::new(&remote, config(1))
            .execute(vec![classify(&cancelled, None), create("Standup")])
            .await;

        assert_eq!(stats.created, 2);
        assert_eq!(stats.updated, 0);
    }

    #[tokio::test]
    async fn test_cancelled_run_counts_not_attempted() {
        let remote = FlakyRemote {
            failures: 0,
            error: RemoteError::Timeout(String::new()),
            calls: AtomicUsize::new(0),
        };
        let token = CancellationToken::new();
        token.cancel();
        let stats = SyncExecutor::new(&remote, config(1))
            .execute_until(vec![create("A"), create("B")], &token)
            .await;

        assert_eq!(stats.total, 0);
        assert_eq!(stats.not_attempted, 2);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_grouping_keeps_order() {
        let groups = group_by_occurrence(vec![create("A"), create("B"), create("a")]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].iter().map(|(p, _)| *p).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(groups[1][0].0, 1);
    }
}
