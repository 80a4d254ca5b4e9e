//! Gather Storage Library
//!
//! This crate provides the storage abstraction for submitted binary content
//! and its local filesystem implementation.
//!
//! # Storage key format
//!
//! Keys are task-scoped: `submissions/{task_id}/{uuid}{ext}`. Every upload gets
//! a fresh key, so a resubmission never overwrites the file it replaces.
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use gather_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
