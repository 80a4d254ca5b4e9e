//! Gather database layer
//!
//! Repository traits consumed by the intake and export engines, their
//! PostgreSQL implementations, and pool/migration setup.

pub mod db;

pub use db::{
    members::{MemberRepositoryTrait, PostgresMemberRepository},
    reminder_logs::{PostgresReminderLogRepository, ReminderLogRepositoryTrait},
    setup::setup_database,
    submissions::{
        NewSubmission, PostgresSubmissionRepository, SubmissionRepositoryTrait, UpsertOutcome,
    },
    tasks::{PostgresTaskRepository, TaskRepositoryTrait},
    transaction::TransactionGuard,
};
