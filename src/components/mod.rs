// Export components
pub mod event;
pub mod executor;
pub mod google_calendar;
pub mod ics;
pub mod normalizer;
pub mod outlook_export;
pub mod reconciler;
pub mod remote;
pub mod remote_index;

pub use event::{Event, EventStatus, OccurrenceKey, Organizer, RawEventRecord, Transparency};
pub use executor::{ExecutorConfig, FailedEvent, RunStatistics, SyncExecutor};
pub use google_calendar::GoogleCalendarHandle;
pub use ics::IcsWriter;
pub use normalizer::{normalize, normalize_all, NormalizerConfig, RecordWarning};
pub use reconciler::{decide, ChangedField, Decision, SyncAction};
pub use remote::{RemoteCalendar, RemoteError, RemoteEventRef, TimeWindow};
pub use remote_index::{DuplicateGroup, RemoteEventIndex};
