//! Data models for the application
//!
//! Tasks, members, submissions and the questionnaire types shared by the
//! intake and export engines.

mod member;
mod questionnaire;
mod reminder;
mod submission;
mod task;

pub use member::{Member, MemberSummary};
pub use questionnaire::{
    AnswerScalar, AnswerValue, QuestionDefinition, QuestionType, QuestionnaireAnswers,
};
pub use reminder::{ReminderLog, ReminderStatus};
pub use submission::{
    FileUpload, PublicSubmission, StoredFile, Submission, SubmissionContent, SubmissionFilter,
    SubmissionKey, SubmissionKind,
};
pub use task::{Task, TaskStats};
