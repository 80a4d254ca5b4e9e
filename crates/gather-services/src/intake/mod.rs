//! Submission intake
//!
//! Validated writes to submission slots (files, images, text, questionnaire
//! answers) and the read-side queries over them.

mod service;

pub use service::{SubmissionDownload, SubmissionService, DEFAULT_MAX_FILE_SIZE_BYTES};
