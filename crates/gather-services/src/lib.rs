//! Gather Services Layer
//!
//! This crate hosts the engines that sit between storage and any outer
//! surface: the submission intake engine, the export engine and the reminder
//! runner. Repositories and storage come in as trait objects so the engines
//! can be driven by PostgreSQL in production and by in-memory doubles in tests.

pub mod archive;
pub mod export;
pub mod intake;
pub mod key_lock;
pub mod reminder;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use archive::{sanitize_archive_filename, ZipArchiveBuilder};
pub use export::{
    ExportArchive, ExportService, FolderPreview, QuestionnaireContentEntry, RenderedAnswer,
    TextContentEntry, TextExport,
};
pub use intake::{SubmissionDownload, SubmissionService, DEFAULT_MAX_FILE_SIZE_BYTES};
pub use key_lock::KeyedLocks;
pub use reminder::{LoggingNotifier, ReminderNotifier, ReminderRunReport, ReminderService};
pub use tokio_util::sync::CancellationToken;
