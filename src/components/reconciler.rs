use super::event::Event;
use super::remote::RemoteEventRef;
use super::remote_index::RemoteEventIndex;
use chrono::Utc;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncAction {
    Create,
    Update,
    Skip,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncAction::Create => "create",
            SyncAction::Update => "update",
            SyncAction::Skip => "skip",
        };
        f.write_str(name)
    }
}

/// Field that differs between an event and its remote counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangedField {
    Title,
    Start,
    End,
    Description,
    Status,
    Transparency,
}

impl fmt::Display for ChangedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangedField::Title => "title",
            ChangedField::Start => "start time",
            ChangedField::End => "end time",
            ChangedField::Description => "description",
            ChangedField::Status => "status",
            ChangedField::Transparency => "transparency",
        };
        f.write_str(name)
    }
}

/// What to do with one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub event: Event,
    pub action: SyncAction,
    pub target: Option<RemoteEventRef>,
    /// Empty unless `action` is `Update`
    pub changes: Vec<ChangedField>,
}

/// Decide create/update/skip for every event, in input order
pub fn decide(events: &[Event], index: &RemoteEventIndex) -> Vec<Decision> {
    events
        .iter()
        .map(|event| classify(event, index.lookup(event)))
        .collect()
}

/// Decide for a single event given its candidate, if any
pub fn classify(event: &Event, candidate: Option<&RemoteEventRef>) -> Decision {
    let Some(candidate) = candidate else {
        debug!("No remote match for '{}', will create", event.title);
        return Decision {
            event: event.clone(),
            action: SyncAction::Create,
            target: None,
            changes: Vec::new(),
        };
    };

    let changes = diff(event, candidate);
    let action = if changes.is_empty() {
        SyncAction::Skip
    } else {
        SyncAction::Update
    };
    debug!(
        "'{}' matches remote {}: {}{}",
        event.title,
        candidate.remote_id,
        action,
        if changes.is_empty() {
            String::new()
        } else {
            format!(" ({})", changes.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))
        }
    );

    Decision {
        event: event.clone(),
        action,
        target: Some(candidate.clone()),
        changes,
    }
}

/// Exact comparison of the synced fields; timestamps compare at second precision
pub fn diff(event: &Event, remote: &RemoteEventRef) -> Vec<ChangedField> {
    let mut changes = Vec::new();

    if event.title != remote.title {
        changes.push(ChangedField::Title);
    }
    if event.start.with_timezone(&Utc).timestamp() != remote.start.timestamp() {
        changes.push(ChangedField::Start);
    }
    if event.end.with_timezone(&Utc).timestamp() != remote.end.timestamp() {
        changes.push(ChangedField::End);
    }
    if comparable_text(event.description.as_deref()) != comparable_text(remote.description.as_deref()) {
        changes.push(ChangedField::Description);
    }
    if event.status != remote.status {
        changes.push(ChangedField::Status);
    }
    if event.transparency != remote.transparency {
        changes.push(ChangedField::Transparency);
    }

    changes
}

/// Remote stores drop empty descriptions and may trim them
fn comparable_text(text: Option<&str>) -> &str {
    text.map(str::trim).unwrap_or("")
}

/// Counts of each action, for dry-run reporting
pub fn summarize(decisions: &[Decision]) -> (usize, usize, usize) {
    decisions.iter().fold((0, 0, 0), |(c, u, s), d| match d.action {
        SyncAction::Create => (c + 1, u, s),
        SyncAction::Update => (c, u + 1, s),
        SyncAction::Skip => (c, u, s + 1),
    })
}
