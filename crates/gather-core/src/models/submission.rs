use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::questionnaire::QuestionnaireAnswers;

/// Content kind of a submission. Part of the natural key, so a member can
/// hold a `file` and a `text` submission under the same item index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    File,
    Image,
    Text,
    Questionnaire,
}

impl SubmissionKind {
    pub fn is_binary(&self) -> bool {
        matches!(self, SubmissionKind::File | SubmissionKind::Image)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::File => "file",
            SubmissionKind::Image => "image",
            SubmissionKind::Text => "text",
            SubmissionKind::Questionnaire => "questionnaire",
        }
    }
}

impl Display for SubmissionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(SubmissionKind::File),
            "image" => Ok(SubmissionKind::Image),
            "text" => Ok(SubmissionKind::Text),
            "questionnaire" => Ok(SubmissionKind::Questionnaire),
            _ => Err(anyhow::anyhow!("Invalid submission kind: {}", s)),
        }
    }
}

/// Natural key of a submission slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionKey {
    pub task_id: Uuid,
    pub member_id: Uuid,
    pub item_index: i32,
    pub kind: SubmissionKind,
}

impl SubmissionKey {
    pub fn new(task_id: Uuid, member_id: Uuid, item_index: i32, kind: SubmissionKind) -> Self {
        SubmissionKey {
            task_id,
            member_id,
            item_index,
            kind,
        }
    }
}

impl Display for SubmissionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}/{}/{}/{}",
            self.task_id, self.member_id, self.item_index, self.kind
        )
    }
}

/// Reference to binary content held by the storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(skip_serializing, default)]
    pub storage_key: String,
    pub original_filename: String,
    pub content_type: Option<String>,
    pub file_size: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionContent {
    Binary(StoredFile),
    Text(String),
    Questionnaire(QuestionnaireAnswers),
}

/// One submitted artifact, unique per (task, member, item_index, kind).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub task_id: Uuid,
    pub member_id: Uuid,
    pub item_index: i32,
    pub kind: SubmissionKind,
    pub content: SubmissionContent,
    pub is_private: bool,
    pub upload_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn key(&self) -> SubmissionKey {
        SubmissionKey::new(self.task_id, self.member_id, self.item_index, self.kind)
    }

    pub fn stored_file(&self) -> Option<&StoredFile> {
        match &self.content {
            SubmissionContent::Binary(file) => Some(file),
            _ => None,
        }
    }

    pub fn storage_key(&self) -> Option<&str> {
        self.stored_file().map(|f| f.storage_key.as_str())
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            SubmissionContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn answers(&self) -> Option<&QuestionnaireAnswers> {
        match &self.content {
            SubmissionContent::Questionnaire(answers) => Some(answers),
            _ => None,
        }
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Submission {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let kind: SubmissionKind = row.try_get("kind")?;
        let content = match kind {
            SubmissionKind::File | SubmissionKind::Image => {
                SubmissionContent::Binary(StoredFile {
                    storage_key: row.try_get::<Option<String>, _>("storage_key")?.unwrap_or_default(),
                    original_filename: row
                        .try_get::<Option<String>, _>("original_filename")?
                        .unwrap_or_default(),
                    content_type: row.try_get("content_type")?,
                    file_size: row.try_get::<Option<i64>, _>("file_size")?.unwrap_or(0),
                })
            }
            SubmissionKind::Text => SubmissionContent::Text(
                row.try_get::<Option<String>, _>("text_content")?
                    .unwrap_or_default(),
            ),
            SubmissionKind::Questionnaire => {
                let raw: Option<serde_json::Value> = row.try_get("questionnaire_answers")?;
                let answers = match raw {
                    Some(value) => QuestionnaireAnswers::from_json(value).map_err(|e| {
                        sqlx::Error::Decode(
                            format!("Failed to parse questionnaire_answers: {}", e).into(),
                        )
                    })?,
                    None => QuestionnaireAnswers::default(),
                };
                SubmissionContent::Questionnaire(answers)
            }
        };

        Ok(Submission {
            id: row.try_get("id")?,
            task_id: row.try_get("task_id")?,
            member_id: row.try_get("member_id")?,
            item_index: row.try_get("item_index")?,
            kind,
            content,
            is_private: row.try_get("is_private")?,
            upload_count: row.try_get("upload_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Buffered binary upload as received from a client.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Filter for listing submissions. Newest first.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionFilter {
    pub task_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub offset: i64,
    pub limit: i64,
}

impl Default for SubmissionFilter {
    fn default() -> Self {
        SubmissionFilter {
            task_id: None,
            member_id: None,
            offset: 0,
            limit: 100,
        }
    }
}

/// Submission as seen by other members of the group.
#[derive(Debug, Clone, Serialize)]
pub struct PublicSubmission {
    pub id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    pub kind: SubmissionKind,
    pub original_filename: Option<String>,
    pub text_content: Option<String>,
    pub questionnaire_answers: Option<QuestionnaireAnswers>,
    pub file_size: Option<i64>,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
}

impl PublicSubmission {
    pub fn new(submission: &Submission, member_name: String) -> Self {
        let file = submission.stored_file();
        PublicSubmission {
            id: submission.id,
            member_id: submission.member_id,
            member_name,
            kind: submission.kind,
            original_filename: file.map(|f| f.original_filename.clone()),
            text_content: submission.text().map(str::to_string),
            questionnaire_answers: submission.answers().cloned(),
            file_size: file.map(|f| f.file_size),
            is_private: submission.is_private,
            created_at: submission.created_at,
        }
    }
}
