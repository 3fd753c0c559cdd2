use super::event::{Event, EventStatus, OccurrenceKey};
use super::remote::{RemoteCalendar, RemoteError, RemoteEventRef, TimeWindow};
use std::collections::HashMap;
use tracing::{debug, info};

/// Remote events that share one occurrence key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub key: OccurrenceKey,
    /// Live candidates in list order; the last one is the one matched
    pub refs: Vec<RemoteEventRef>,
}

/// Lookup of remote events by `(normalized title, start minute)`
#[derive(Debug, Clone, Default)]
pub struct RemoteEventIndex {
    entries: HashMap<OccurrenceKey, Vec<RemoteEventRef>>,
}

impl RemoteEventIndex {
    /// List every remote event in `window` and index it. Fails if any page fails.
    pub async fn build(window: TimeWindow, remote: &dyn RemoteCalendar) -> Result<Self, RemoteError> {
        info!(
            "Fetching remote events between {} and {}",
            window.start.to_rfc3339(),
            window.end.to_rfc3339()
        );
        let refs = remote.list(window).await?;
        let total = refs.len();
        let index = Self::from_refs(refs);
        info!("Indexed {} remote events under {} keys", total, index.entries.len());
        Ok(index)
    }

    /// Index an already fetched list, keeping list order within each key
    pub fn from_refs(refs: Vec<RemoteEventRef>) -> Self {
        let mut entries: HashMap<OccurrenceKey, Vec<RemoteEventRef>> = HashMap::new();
        for remote_ref in refs {
            entries.entry(remote_ref.key()).or_default().push(remote_ref);
        }
        Self { entries }
    }

    /// Exact-key match for `event`; among candidates passing [`may_match`]
    /// the one listed last wins.
    pub fn lookup(&self, event: &Event) -> Option<&RemoteEventRef> {
        let key = event.key();
        let found = self
            .entries
            .get(&key)?
            .iter()
            .rev()
            .find(|candidate| may_match(candidate, event));

        if found.is_none() {
            debug!("Only cancelled remote entries for {}", key);
        }
        found
    }

    /// Keys with more than one live remote event, sorted by key
    pub fn duplicates(&self) -> Vec<DuplicateGroup> {
        let mut groups: Vec<DuplicateGroup> = self
            .entries
            .iter()
            .filter_map(|(key, refs)| {
                let live: Vec<RemoteEventRef> = refs
                    .iter()
                    .filter(|r| r.status != EventStatus::Cancelled)
                    .cloned()
                    .collect();
                (live.len() > 1).then(|| DuplicateGroup {
                    key: key.clone(),
                    refs: live,
                })
            })
            .collect();
        groups.sort_by(|a, b| a.key.cmp(&b.key));
        groups
    }
}

/// Cancelled remote entries are deleted instances; they only stand for
/// events that are cancelled themselves
pub fn may_match(candidate: &RemoteEventRef, event: &Event) -> bool {
    candidate.status != EventStatus::Cancelled || event.is_cancelled()
}
