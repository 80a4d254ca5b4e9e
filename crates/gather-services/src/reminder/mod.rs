//! Deadline reminders
//!
//! A background runner that reminds members who have not submitted yet. It
//! reads only the unsubmitted-members query of the submission store.

mod service;

pub use service::{LoggingNotifier, ReminderNotifier, ReminderRunReport, ReminderService};
