use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gather_core::models::{
    AnswerValue, Member, QuestionType, QuestionnaireAnswers, Submission, SubmissionKind, Task,
};
use gather_core::{naming, AppError, DEFAULT_NAMING_FORMAT};
use gather_db::{MemberRepositoryTrait, SubmissionRepositoryTrait, TaskRepositoryTrait};
use gather_storage::{Storage, StorageError};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::layout::{plan_folders, ArtifactSource, FolderPreview, OwnerFolder};
use crate::archive::ZipArchiveBuilder;

/// A finished export archive with the counts reported alongside it.
#[derive(Debug, Clone)]
pub struct ExportArchive {
    pub bytes: Vec<u8>,
    pub filename: String,
    /// Entries written; a questionnaire contributes two.
    pub file_count: usize,
    /// Sum of the uncompressed entry sizes.
    pub total_bytes: u64,
}

/// Aggregate document of every text submission of a task.
#[derive(Debug, Clone)]
pub struct TextExport {
    pub bytes: Vec<u8>,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextContentEntry {
    pub submission_id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    pub student_id: String,
    pub item_index: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedAnswer {
    pub question: String,
    pub answer: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionnaireContentEntry {
    pub submission_id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    pub student_id: String,
    pub item_index: i32,
    pub answers: Vec<RenderedAnswer>,
    pub raw_answers: QuestionnaireAnswers,
    pub created_at: DateTime<Utc>,
}

/// The export engine: turns a task's submissions into a folder-per-member
/// archive, an aggregate text document, or online views.
pub struct ExportService {
    tasks: Arc<dyn TaskRepositoryTrait>,
    members: Arc<dyn MemberRepositoryTrait>,
    submissions: Arc<dyn SubmissionRepositoryTrait>,
    storage: Arc<dyn Storage>,
    default_naming_format: String,
}

impl ExportService {
    pub fn new(
        tasks: Arc<dyn TaskRepositoryTrait>,
        members: Arc<dyn MemberRepositoryTrait>,
        submissions: Arc<dyn SubmissionRepositoryTrait>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            tasks,
            members,
            submissions,
            storage,
            default_naming_format: DEFAULT_NAMING_FORMAT.to_string(),
        }
    }

    pub fn with_default_naming_format(mut self, format: impl Into<String>) -> Self {
        self.default_naming_format = format.into();
        self
    }

    pub async fn export_task(
        &self,
        task_id: Uuid,
        member_filter: Option<&[Uuid]>,
        naming_template: Option<&str>,
    ) -> Result<ExportArchive, AppError> {
        self.export_task_cancellable(
            task_id,
            member_filter,
            naming_template,
            &CancellationToken::new(),
        )
        .await
    }

    /// Build the archive for a task, checking `cancel` between entries.
    ///
    /// Stored files that disappeared since the query are skipped. The archive
    /// lives in memory only, so cancellation leaves nothing behind.
    #[tracing::instrument(skip(self, member_filter, cancel))]
    pub async fn export_task_cancellable(
        &self,
        task_id: Uuid,
        member_filter: Option<&[Uuid]>,
        naming_template: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ExportArchive, AppError> {
        let task = self.load_task(task_id).await?;
        let template = self.resolve_template(&task, naming_template)?;

        let submissions = self
            .submissions
            .list_by_task(task_id, member_filter.filter(|ids| !ids.is_empty()))
            .await?;
        if submissions.is_empty() {
            return Err(AppError::NothingToExport);
        }

        let members = self.members_of(&submissions).await?;
        let folders = plan_folders(&template, &members, &submissions);

        let mut builder = ZipArchiveBuilder::new();
        let mut skipped = 0usize;
        for folder in &folders {
            skipped += self
                .write_folder(&mut builder, &task, folder, cancel)
                .await?;
        }

        if builder.entries() == 0 {
            tracing::info!(task_id = %task_id, skipped, "Export produced no entries");
            return Err(AppError::NothingToExport);
        }

        let file_count = builder.entries();
        let total_bytes = builder.total_bytes();
        let bytes = builder.finish()?;

        tracing::info!(
            task_id = %task_id,
            folders = folders.len(),
            file_count,
            total_bytes,
            skipped,
            archive_bytes = bytes.len(),
            "Export archive built"
        );

        Ok(ExportArchive {
            bytes,
            filename: format!("{}_submissions.zip", title_stem(&task)),
            file_count,
            total_bytes,
        })
    }

    /// Folder and entry names an export would produce, without reading content.
    #[tracing::instrument(skip(self, member_filter))]
    pub async fn preview(
        &self,
        task_id: Uuid,
        member_filter: Option<&[Uuid]>,
        naming_template: Option<&str>,
    ) -> Result<Vec<FolderPreview>, AppError> {
        let task = self.load_task(task_id).await?;
        let template = self.resolve_template(&task, naming_template)?;

        let submissions = self
            .submissions
            .list_by_task(task_id, member_filter.filter(|ids| !ids.is_empty()))
            .await?;
        let members = self.members_of(&submissions).await?;

        Ok(plan_folders(&template, &members, &submissions)
            .iter()
            .map(FolderPreview::from)
            .collect())
    }

    /// Every text submission in one plain-text document, one block per entry.
    #[tracing::instrument(skip(self))]
    pub async fn export_texts(&self, task_id: Uuid) -> Result<TextExport, AppError> {
        let task = self.load_task(task_id).await?;

        let mut lines = vec![
            format!("Text submissions - {}", task.title),
            "=".repeat(50),
            String::new(),
        ];
        for entry in self.text_entries(task_id).await? {
            lines.push(format!("[{} - {}]", entry.student_id, entry.member_name));
            lines.push(if entry.content.is_empty() {
                "(empty)".to_string()
            } else {
                entry.content
            });
            lines.push("-".repeat(30));
            lines.push(String::new());
        }

        Ok(TextExport {
            bytes: lines.join("\n").into_bytes(),
            filename: format!("{}_texts.txt", title_stem(&task)),
        })
    }

    pub async fn list_text_contents(
        &self,
        task_id: Uuid,
    ) -> Result<Vec<TextContentEntry>, AppError> {
        self.load_task(task_id).await?;
        self.text_entries(task_id).await
    }

    /// Questionnaire submissions with each configured question paired with its answer.
    #[tracing::instrument(skip(self))]
    pub async fn list_questionnaire_contents(
        &self,
        task_id: Uuid,
    ) -> Result<Vec<QuestionnaireContentEntry>, AppError> {
        let task = self.load_task(task_id).await?;
        let rows = self.rows_of_kind(task_id, SubmissionKind::Questionnaire).await?;
        let members = self.members_of(&rows).await?;

        Ok(rows
            .iter()
            .filter_map(|s| {
                let member = members.get(&s.member_id)?;
                let raw = s.answers().cloned().unwrap_or_default();
                let answers = task
                    .questionnaire_config
                    .iter()
                    .enumerate()
                    .map(|(i, q)| RenderedAnswer {
                        question: q.display_title(i),
                        answer: raw.get(i).map(AnswerValue::render).unwrap_or_default(),
                        question_type: q.question_type,
                    })
                    .collect();

                Some(QuestionnaireContentEntry {
                    submission_id: s.id,
                    member_id: member.id,
                    member_name: member.name.clone(),
                    student_id: member.student_id.clone(),
                    item_index: s.item_index,
                    answers,
                    raw_answers: raw,
                    created_at: s.created_at,
                })
            })
            .collect())
    }

    async fn write_folder(
        &self,
        builder: &mut ZipArchiveBuilder,
        task: &Task,
        folder: &OwnerFolder<'_>,
        cancel: &CancellationToken,
    ) -> Result<usize, AppError> {
        let mut skipped = 0;
        for artifact in &folder.artifacts {
            if cancel.is_cancelled() {
                tracing::info!(task_id = %task.id, "Export cancelled");
                return Err(AppError::Cancelled);
            }

            let data = match artifact.source {
                ArtifactSource::Stored(file) => {
                    match self.storage.download(&file.storage_key).await {
                        Ok(data) => data,
                        Err(StorageError::NotFound(_)) => {
                            tracing::warn!(
                                task_id = %task.id,
                                member_id = %folder.member.id,
                                entry = %artifact.name,
                                "Stored file missing, skipping entry"
                            );
                            skipped += 1;
                            continue;
                        }
                        Err(e) => return Err(AppError::StorageFailure(e.to_string())),
                    }
                }
                ArtifactSource::Text(text) => text.as_bytes().to_vec(),
                ArtifactSource::AnswersJson(answers) => serde_json::to_vec_pretty(answers)?,
                ArtifactSource::AnswersText(answers) => answers
                    .render_text(&task.title, &task.questionnaire_config)
                    .into_bytes(),
            };

            builder.add_file(&folder.entry_path(artifact), &data)?;
        }
        Ok(skipped)
    }

    async fn load_task(&self, task_id: Uuid) -> Result<Task, AppError> {
        self.tasks
            .get_task(task_id)
            .await?
            .ok_or(AppError::TaskNotFound(task_id))
    }

    /// Explicit template, then the task's, then the configured default. Only
    /// the explicit one is validated here; stored ones were checked on write.
    fn resolve_template(&self, task: &Task, explicit: Option<&str>) -> Result<String, AppError> {
        if let Some(template) = explicit.filter(|t| !t.is_empty()) {
            naming::validate(template)?;
        }
        Ok(task
            .effective_naming_format(explicit, &self.default_naming_format)
            .to_string())
    }

    async fn members_of(
        &self,
        submissions: &[Submission],
    ) -> Result<HashMap<Uuid, Member>, AppError> {
        let ids: Vec<Uuid> = submissions
            .iter()
            .map(|s| s.member_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        Ok(self
            .members
            .get_members(&ids)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect())
    }

    /// Rows of one kind for a task.
    async fn rows_of_kind(
        &self,
        task_id: Uuid,
        kind: SubmissionKind,
    ) -> Result<Vec<Submission>, AppError> {
        Ok(self
            .submissions
            .list_by_task(task_id, None)
            .await?
            .into_iter()
            .filter(|s| s.kind == kind)
            .collect())
    }

    async fn text_entries(&self, task_id: Uuid) -> Result<Vec<TextContentEntry>, AppError> {
        let rows = self.rows_of_kind(task_id, SubmissionKind::Text).await?;
        let members = self.members_of(&rows).await?;

        let mut entries: Vec<TextContentEntry> = rows
            .iter()
            .filter_map(|s| {
                let member = members.get(&s.member_id)?;
                Some(TextContentEntry {
                    submission_id: s.id,
                    member_id: member.id,
                    member_name: member.name.clone(),
                    student_id: member.student_id.clone(),
                    item_index: s.item_index,
                    content: s.text().unwrap_or_default().to_string(),
                    created_at: s.created_at,
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.student_id.as_str(), a.item_index).cmp(&(b.student_id.as_str(), b.item_index))
        });
        Ok(entries)
    }
}

fn title_stem(task: &Task) -> String {
    let stem = naming::sanitize(&task.title);
    if stem.is_empty() {
        "task".to_string()
    } else {
        stem
    }
}
