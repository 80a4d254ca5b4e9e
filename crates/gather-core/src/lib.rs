//! Gather Core Library
//!
//! This crate provides the domain models, error types, configuration, naming
//! template engine and validation rules shared by every Gather component.

pub mod config;
pub mod error;
pub mod models;
pub mod naming;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config, GatherConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use naming::{NamingAttributes, NamingVariable, DEFAULT_NAMING_FORMAT};
pub use storage_types::StorageBackend;
