//! Error types module
//!
//! This module provides the core error types used throughout Gather.
//! Intake policy violations, storage and persistence failures, export outcomes
//! and infrastructure errors are unified under the `AppError` enum.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use chrono::{DateTime, Utc};
use std::io;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like policy violations
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// Lets a transport layer render a structured (code, message) pair without
/// matching on variants itself.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DEADLINE_PASSED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message. Never contains storage paths or keys.
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Member not found: {0}")]
    OwnerNotFound(Uuid),

    #[error("Deadline passed at {deadline}")]
    DeadlinePassed { deadline: DateTime<Utc> },

    #[error("File type not allowed: {extension}")]
    InvalidFileType { extension: String },

    #[error("Image type not allowed: {extension}")]
    InvalidImageType { extension: String },

    #[error("Required question not answered: {question}")]
    RequiredFieldMissing { index: usize, question: String },

    #[error("Task does not allow modifying an existing submission")]
    ModifyNotAllowed,

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Nothing to export")]
    NothingToExport,

    #[error("Invalid naming template: {0}")]
    InvalidNamingTemplate(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::TaskNotFound(_) => (
            404,
            "TASK_NOT_FOUND",
            false,
            Some("Verify the task ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::OwnerNotFound(_) => (
            404,
            "MEMBER_NOT_FOUND",
            false,
            Some("Verify the member ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::DeadlinePassed { .. } => (
            403,
            "DEADLINE_PASSED",
            false,
            Some("Contact the task owner to extend the deadline"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidFileType { .. } => (
            400,
            "INVALID_FILE_TYPE",
            false,
            Some("Upload a file of an allowed type"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidImageType { .. } => (
            400,
            "INVALID_IMAGE_TYPE",
            false,
            Some("Upload a jpg, jpeg, png, gif, bmp or webp image"),
            false,
            LogLevel::Debug,
        ),
        AppError::RequiredFieldMissing { .. } => (
            400,
            "REQUIRED_FIELD_MISSING",
            false,
            Some("Answer every required question"),
            false,
            LogLevel::Debug,
        ),
        AppError::ModifyNotAllowed => (
            409,
            "MODIFY_NOT_ALLOWED",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        AppError::StorageFailure(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::PersistenceFailure(_) => (
            500,
            "PERSISTENCE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::NothingToExport => (
            404,
            "NOTHING_TO_EXPORT",
            false,
            Some("Wait until members have submitted content"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidNamingTemplate(_) => (
            400,
            "INVALID_NAMING_TEMPLATE",
            false,
            Some("Use {student_id}, {name}, {gender} or {dormitory} placeholders"),
            false,
            LogLevel::Debug,
        ),
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge { .. } => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::Cancelled => (499, "CANCELLED", true, None, false, LogLevel::Debug),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::TaskNotFound(_) => "TaskNotFound",
            AppError::OwnerNotFound(_) => "OwnerNotFound",
            AppError::DeadlinePassed { .. } => "DeadlinePassed",
            AppError::InvalidFileType { .. } => "InvalidFileType",
            AppError::InvalidImageType { .. } => "InvalidImageType",
            AppError::RequiredFieldMissing { .. } => "RequiredFieldMissing",
            AppError::ModifyNotAllowed => "ModifyNotAllowed",
            AppError::StorageFailure(_) => "StorageFailure",
            AppError::PersistenceFailure(_) => "PersistenceFailure",
            AppError::NothingToExport => "NothingToExport",
            AppError::InvalidNamingTemplate(_) => "InvalidNamingTemplate",
            AppError::Database(_) => "Database",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge { .. } => "PayloadTooLarge",
            AppError::Cancelled => "Cancelled",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Input and policy violations: surfaced verbatim, never retried.
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            AppError::TaskNotFound(_)
                | AppError::OwnerNotFound(_)
                | AppError::DeadlinePassed { .. }
                | AppError::InvalidFileType { .. }
                | AppError::InvalidImageType { .. }
                | AppError::RequiredFieldMissing { .. }
                | AppError::ModifyNotAllowed
        )
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::TaskNotFound(_) => "Task not found".to_string(),
            AppError::OwnerNotFound(_) => "Member not found".to_string(),
            AppError::DeadlinePassed { deadline } => {
                format!("The deadline ({}) has passed", deadline.to_rfc3339())
            }
            AppError::InvalidFileType { extension } => {
                format!("File type not allowed: {}", display_extension(extension))
            }
            AppError::InvalidImageType { extension } => format!(
                "Unsupported image format: {}, supported: {}",
                display_extension(extension),
                crate::validation::IMAGE_EXTENSIONS.join(", ")
            ),
            AppError::RequiredFieldMissing { question, .. } => {
                format!("Please answer the required question: {}", question)
            }
            AppError::ModifyNotAllowed => {
                "This task does not allow modifying submitted content".to_string()
            }
            AppError::StorageFailure(_) => "Failed to store uploaded content".to_string(),
            AppError::PersistenceFailure(_) => "Failed to save submission".to_string(),
            AppError::NothingToExport => "There is no content to export".to_string(),
            AppError::InvalidNamingTemplate(ref msg) => msg.clone(),
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::PayloadTooLarge { size, max } => {
                format!("File too large: {} bytes (max: {} bytes)", size, max)
            }
            AppError::Cancelled => "Operation cancelled".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

fn display_extension(extension: &str) -> &str {
    if extension.is_empty() {
        "(none)"
    } else {
        extension
    }
}
