//! Test helpers for the intake and export engines
//!
//! In-memory repositories and storage doubles so the engines can be exercised
//! without PostgreSQL.

pub mod fixtures;
pub mod mock_repositories;
pub mod mock_storage;

pub use fixtures::*;
pub use mock_repositories::*;
pub use mock_storage::*;
