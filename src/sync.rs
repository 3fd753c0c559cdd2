//! One sync run against a remote calendar: index, reconcile, execute.

use crate::components::executor::{ExecutorConfig, RunStatistics, SyncExecutor};
use crate::components::reconciler::{decide, summarize, Decision, SyncAction};
use crate::components::remote::{RemoteCalendar, TimeWindow};
use crate::components::remote_index::{DuplicateGroup, RemoteEventIndex};
use crate::components::Event;
use crate::error::{input_error, SyncResult};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Outcome of [`sync_events`]
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub planned_creates: usize,
    pub planned_updates: usize,
    pub planned_skips: usize,
    /// Empty for dry runs
    pub stats: RunStatistics,
    pub duplicates: Vec<DuplicateGroup>,
    pub dry_run: bool,
}

impl SyncReport {
    /// Log the end-of-run summary
    pub fn log_summary(&self) {
        if self.dry_run {
            info!(
                "Dry run: {} to create, {} to update, {} unchanged",
                self.planned_creates, self.planned_updates, self.planned_skips
            );
        } else {
            let stats = &self.stats;
            info!(
                "Sync complete: created {}, updated {}, skipped {}, failed {} (total {}, retries {})",
                stats.created, stats.updated, stats.skipped, stats.failed, stats.total, stats.retried
            );
            if stats.not_attempted > 0 {
                warn!("{} events were not attempted because the run was cancelled", stats.not_attempted);
            }
            for failure in &stats.failures {
                error!(
                    "Failed to {} '{}' at {}: {}",
                    failure.action,
                    failure.title,
                    failure.start.to_rfc3339(),
                    failure.error
                );
            }
        }

        if !self.duplicates.is_empty() {
            warn!(
                "{} occurrences have duplicate remote events; duplicates were left untouched",
                self.duplicates.len()
            );
            for group in &self.duplicates {
                let ids = group
                    .refs
                    .iter()
                    .map(|r| r.remote_id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                warn!("  {}: {}", group.key, ids);
            }
        }
    }
}

/// Index the remote window covering `events`, decide, then apply the decisions.
///
/// Listing failures abort the run before anything is written. Per-event
/// write failures only show up in the returned statistics.
pub async fn sync_events(
    remote: &dyn RemoteCalendar,
    events: &[Event],
    config: ExecutorConfig,
    dry_run: bool,
    cancel: &CancellationToken,
) -> SyncResult<SyncReport> {
    let window = TimeWindow::covering(events).ok_or_else(|| input_error("No events to sync"))?;
    let index = RemoteEventIndex::build(window, remote).await?;

    let decisions = decide(events, &index);
    let (creates, updates, skips) = summarize(&decisions);
    info!(
        "Planned: {} to create, {} to update, {} unchanged",
        creates, updates, skips
    );

    let mut report = SyncReport {
        planned_creates: creates,
        planned_updates: updates,
        planned_skips: skips,
        duplicates: index.duplicates(),
        dry_run,
        ..Default::default()
    };

    if dry_run {
        log_plan(&decisions);
        return Ok(report);
    }

    report.stats = SyncExecutor::new(remote, config)
        .execute_until(decisions, cancel)
        .await;
    Ok(report)
}

fn log_plan(decisions: &[Decision]) {
    for decision in decisions.iter().filter(|d| d.action != SyncAction::Skip) {
        let changes = decision
            .changes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        if changes.is_empty() {
            info!(
                "Would {} '{}' at {}",
                decision.action,
                decision.event.title,
                decision.event.start.to_rfc3339()
            );
        } else {
            info!(
                "Would {} '{}' at {} ({})",
                decision.action,
                decision.event.title,
                decision.event.start.to_rfc3339(),
                changes
            );
        }
    }
}
