//! Google Calendar v3 adapter.
//!
//! Requests go through an actor whose handle implements [`RemoteCalendar`],
//! so the sync engine never sees HTTP. Each request runs on its own task,
//! which lets the executor keep several writes in flight.
//!
//! [`RemoteCalendar`]: crate::components::remote::RemoteCalendar

mod actor;
mod handle;
pub mod models;
mod time;
pub mod token;

pub use handle::GoogleCalendarHandle;
pub use models::CalendarEvent;
pub use token::{StoredToken, TokenManager};
