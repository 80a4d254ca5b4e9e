//! Export engine
//!
//! Re-assembles a task's submissions into a folder-per-member ZIP archive,
//! an aggregate text document, or structured views for online reading.

mod layout;
mod service;

pub use layout::FolderPreview;
pub use service::{
    ExportArchive, ExportService, QuestionnaireContentEntry, RenderedAnswer, TextContentEntry,
    TextExport,
};
