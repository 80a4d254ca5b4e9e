//! Database repositories for data access layer
//!
//! Each repository is responsible for one table and is exposed through a
//! trait so the engines can run against in-memory implementations in tests.

pub mod members;
pub mod reminder_logs;
pub mod setup;
pub mod submissions;
pub mod tasks;
//
// Transaction utilities
pub mod transaction;
