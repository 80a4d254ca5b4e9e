use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use gather_core::models::{
    FileUpload, Member, MemberSummary, PublicSubmission, QuestionnaireAnswers, StoredFile,
    Submission, SubmissionContent, SubmissionFilter, SubmissionKey, SubmissionKind, Task,
    TaskStats,
};
use gather_core::validation::{effective_private_for_task, file_extension, validate_file_type};
use gather_core::AppError;
use gather_db::{
    MemberRepositoryTrait, NewSubmission, SubmissionRepositoryTrait, TaskRepositoryTrait,
    UpsertOutcome,
};
use gather_storage::{Storage, StorageError};
use uuid::Uuid;

use crate::key_lock::KeyedLocks;

pub const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 100 * 1024 * 1024;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Bytes and metadata for serving one submission's content.
#[derive(Debug, Clone)]
pub struct SubmissionDownload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// The submission store: validated writes to submission slots and the
/// read-side queries built on them.
///
/// Writes to one (task, member, item_index, kind) slot are serialized by an
/// in-process lock; the repository adds row-level isolation underneath.
pub struct SubmissionService {
    tasks: Arc<dyn TaskRepositoryTrait>,
    members: Arc<dyn MemberRepositoryTrait>,
    submissions: Arc<dyn SubmissionRepositoryTrait>,
    storage: Arc<dyn Storage>,
    locks: KeyedLocks<SubmissionKey>,
    max_file_size_bytes: usize,
}

impl SubmissionService {
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
            locks: KeyedLocks::new(),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size_bytes: usize) -> Self {
        self.max_file_size_bytes = max_file_size_bytes;
        self
    }

    /// Store a file or image for a slot.
    ///
    /// The new binary is written before the record changes; the binary it
    /// replaces is removed only after the record points at the new one.
    #[tracing::instrument(skip(self, upload), fields(size_bytes = upload.data.len()))]
    pub async fn submit_file(
        &self,
        task_id: Uuid,
        member_id: Uuid,
        item_index: i32,
        kind: SubmissionKind,
        upload: FileUpload,
        requested_private: bool,
    ) -> Result<Submission, AppError> {
        if !kind.is_binary() {
            return Err(AppError::InvalidInput(format!(
                "'{}' submissions do not carry a file",
                kind
            )));
        }

        let key = SubmissionKey::new(task_id, member_id, item_index, kind);
        let _guard = self.locks.lock(&key).await;

        let task = self.check_preconditions(&key).await?;
        validate_file_type(kind, task.allowed_types.as_deref(), &upload.filename)?;
        self.check_payload(&upload)?;
        self.ensure_modifiable(&task, &key).await?;

        let FileUpload {
            filename,
            content_type,
            data,
        } = upload;
        let extension = file_extension(&filename).to_string();
        let file_size = data.len() as i64;

        let storage_key = self
            .storage
            .upload(
                task_id,
                &extension,
                content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE),
                data,
            )
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = %e, "Failed to store submitted file");
                AppError::StorageFailure(e.to_string())
            })?;

        let new = NewSubmission {
            key,
            content: SubmissionContent::Binary(StoredFile {
                storage_key: storage_key.clone(),
                original_filename: filename,
                content_type,
                file_size,
            }),
            is_private: effective_private_for_task(&task, requested_private),
        };

        let outcome = match self.submissions.upsert(new, task.allow_modify).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.discard_orphan(&storage_key).await;
                return Err(persistence_error(e));
            }
        };

        self.remove_superseded(&outcome, &storage_key).await;
        log_write(&outcome);
        Ok(outcome.submission)
    }

    #[tracing::instrument(skip(self, text))]
    pub async fn submit_text(
        &self,
        task_id: Uuid,
        member_id: Uuid,
        item_index: i32,
        text: String,
        requested_private: bool,
    ) -> Result<Submission, AppError> {
        let key = SubmissionKey::new(task_id, member_id, item_index, SubmissionKind::Text);
        let _guard = self.locks.lock(&key).await;

        let task = self.check_preconditions(&key).await?;
        self.commit_inline(&task, key, SubmissionContent::Text(text), requested_private)
            .await
    }

    #[tracing::instrument(skip(self, answers))]
    pub async fn submit_questionnaire(
        &self,
        task_id: Uuid,
        member_id: Uuid,
        item_index: i32,
        answers: QuestionnaireAnswers,
        requested_private: bool,
    ) -> Result<Submission, AppError> {
        let key = SubmissionKey::new(
            task_id,
            member_id,
            item_index,
            SubmissionKind::Questionnaire,
        );
        let _guard = self.locks.lock(&key).await;

        let task = self.check_preconditions(&key).await?;
        if let Some((index, question)) = answers.first_missing_required(&task.questionnaire_config)
        {
            return Err(AppError::RequiredFieldMissing { index, question });
        }

        self.commit_inline(
            &task,
            key,
            SubmissionContent::Questionnaire(answers),
            requested_private,
        )
        .await
    }

    /// Remove a submission and its stored content. The row goes first so a
    /// failed file removal never leaves a row pointing at nothing.
    #[tracing::instrument(skip(self))]
    pub async fn delete_submission(&self, id: Uuid) -> Result<Submission, AppError> {
        let existing = self
            .submissions
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;

        let _guard = self.locks.lock(&existing.key()).await;

        let deleted = self
            .submissions
            .delete(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;

        if let Some(storage_key) = deleted.storage_key() {
            if let Err(e) = self.storage.delete(storage_key).await {
                tracing::warn!(
                    submission_id = %id,
                    error = %e,
                    "Failed to delete stored file of removed submission"
                );
            }
        }

        tracing::info!(submission_id = %id, key = %deleted.key(), "Submission deleted");
        Ok(deleted)
    }

    /// Content of a submission ready for download.
    #[tracing::instrument(skip(self))]
    pub async fn open_content(&self, id: Uuid) -> Result<SubmissionDownload, AppError> {
        let submission = self
            .submissions
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;

        match &submission.content {
            SubmissionContent::Binary(file) => {
                let data = self
                    .storage
                    .download(&file.storage_key)
                    .await
                    .map_err(|e| match e {
                        StorageError::NotFound(_) => {
                            tracing::warn!(submission_id = %id, "Stored file is missing");
                            AppError::NotFound("Submission content is missing".to_string())
                        }
                        other => AppError::StorageFailure(other.to_string()),
                    })?;

                Ok(SubmissionDownload {
                    filename: file.original_filename.clone(),
                    content_type: file
                        .content_type
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                    data,
                })
            }
            SubmissionContent::Text(text) => Ok(SubmissionDownload {
                filename: "text.txt".to_string(),
                content_type: "text/plain; charset=utf-8".to_string(),
                data: text.clone().into_bytes(),
            }),
            SubmissionContent::Questionnaire(answers) => {
                let task = self.load_task(submission.task_id).await?;
                Ok(SubmissionDownload {
                    filename: "questionnaire.txt".to_string(),
                    content_type: "text/plain; charset=utf-8".to_string(),
                    data: answers
                        .render_text(&task.title, &task.questionnaire_config)
                        .into_bytes(),
                })
            }
        }
    }

    pub async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, AppError> {
        self.submissions.get(id).await
    }

    pub async fn list_submissions(
        &self,
        filter: SubmissionFilter,
    ) -> Result<Vec<Submission>, AppError> {
        self.submissions.list(filter).await
    }

    /// Submissions other members may see. Empty when the task is admin-only.
    #[tracing::instrument(skip(self))]
    pub async fn list_public_submissions(
        &self,
        task_id: Uuid,
        exclude_member_id: Option<Uuid>,
    ) -> Result<Vec<PublicSubmission>, AppError> {
        let task = self.load_task(task_id).await?;
        if task.admin_only_visible {
            return Ok(Vec::new());
        }

        let rows = self
            .submissions
            .list_public(task_id, exclude_member_id)
            .await?;

        let member_ids: Vec<Uuid> = rows
            .iter()
            .map(|s| s.member_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let names: HashMap<Uuid, String> = self
            .members
            .get_members(&member_ids)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();

        Ok(rows
            .iter()
            .filter_map(|s| {
                names
                    .get(&s.member_id)
                    .map(|name| PublicSubmission::new(s, name.clone()))
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn task_stats(&self, task_id: Uuid) -> Result<TaskStats, AppError> {
        let task = self.load_task(task_id).await?;
        let total = self.members.count_by_group(task.group_id).await?;
        let submitted = self.submissions.count_distinct_submitters(task_id).await?;

        Ok(TaskStats::compute(task_id, total, submitted.min(total)))
    }

    /// Members of the task's group with no submission of any kind.
    #[tracing::instrument(skip(self))]
    pub async fn unsubmitted_members(&self, task_id: Uuid) -> Result<Vec<MemberSummary>, AppError> {
        let task = self.load_task(task_id).await?;
        let members = self
            .members
            .list_without_submission(task.group_id, task_id)
            .await?;

        Ok(members.iter().map(MemberSummary::from).collect())
    }

    pub async fn member_submission_count(
        &self,
        task_id: Uuid,
        member_id: Uuid,
    ) -> Result<i64, AppError> {
        self.submissions.count_for_member(task_id, member_id).await
    }

    async fn load_task(&self, task_id: Uuid) -> Result<Task, AppError> {
        self.tasks
            .get_task(task_id)
            .await?
            .ok_or(AppError::TaskNotFound(task_id))
    }

    async fn load_member(&self, member_id: Uuid) -> Result<Member, AppError> {
        self.members
            .get_member(member_id)
            .await?
            .ok_or(AppError::OwnerNotFound(member_id))
    }

    /// Existence and deadline checks shared by every write.
    async fn check_preconditions(&self, key: &SubmissionKey) -> Result<Task, AppError> {
        let task = self.load_task(key.task_id).await?;
        self.load_member(key.member_id).await?;

        if let Some(deadline) = task.deadline {
            if task.is_deadline_passed(Utc::now()) {
                tracing::debug!(key = %key, %deadline, "Write rejected after deadline");
                return Err(AppError::DeadlinePassed { deadline });
            }
        }

        Ok(task)
    }

    fn check_payload(&self, upload: &FileUpload) -> Result<(), AppError> {
        if upload.data.len() > self.max_file_size_bytes {
            return Err(AppError::PayloadTooLarge {
                size: upload.data.len(),
                max: self.max_file_size_bytes,
            });
        }
        Ok(())
    }

    async fn ensure_modifiable(&self, task: &Task, key: &SubmissionKey) -> Result<(), AppError> {
        if task.allow_modify {
            return Ok(());
        }
        if self.submissions.find_by_key(key).await?.is_some() {
            tracing::debug!(key = %key, "Modification rejected by task policy");
            return Err(AppError::ModifyNotAllowed);
        }
        Ok(())
    }

    async fn commit_inline(
        &self,
        task: &Task,
        key: SubmissionKey,
        content: SubmissionContent,
        requested_private: bool,
    ) -> Result<Submission, AppError> {
        self.ensure_modifiable(task, &key).await?;

        let new = NewSubmission {
            key,
            content,
            is_private: effective_private_for_task(task, requested_private),
        };
        let outcome = self
            .submissions
            .upsert(new, task.allow_modify)
            .await
            .map_err(persistence_error)?;

        log_write(&outcome);
        Ok(outcome.submission)
    }

    async fn discard_orphan(&self, storage_key: &str) {
        if let Err(e) = self.storage.delete(storage_key).await {
            tracing::error!(
                storage_key = %storage_key,
                error = %e,
                "Failed to remove stored file after the record write failed"
            );
        }
    }

    async fn remove_superseded(&self, outcome: &UpsertOutcome, new_key: &str) {
        let Some(old_key) = outcome.previous.as_ref().and_then(Submission::storage_key) else {
            return;
        };
        if old_key == new_key {
            return;
        }
        if let Err(e) = self.storage.delete(old_key).await {
            tracing::warn!(
                submission_id = %outcome.submission.id,
                error = %e,
                "Failed to delete superseded file"
            );
        }
    }
}

fn persistence_error(err: AppError) -> AppError {
    match err {
        AppError::ModifyNotAllowed => AppError::ModifyNotAllowed,
        other => {
            tracing::error!(error = %other, "Submission record write failed");
            AppError::PersistenceFailure(other.to_string())
        }
    }
}

fn log_write(outcome: &UpsertOutcome) {
    let submission = &outcome.submission;
    tracing::info!(
        submission_id = %submission.id,
        key = %submission.key(),
        upload_count = submission.upload_count,
        is_private = submission.is_private,
        replaced = outcome.previous.is_some(),
        "Submission stored"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        sample_member, sample_task, FailingStorage, MockMemberRepository,
        MockSubmissionRepository, MockTaskRepository,
    };
    use chrono::Duration;
    use gather_core::models::QuestionDefinition;
    use gather_storage::LocalStorage;
    use serde_json::json;
    use tempfile::TempDir;

    struct Harness {
        service: Arc<SubmissionService>,
        tasks: MockTaskRepository,
        members: MockMemberRepository,
        submissions: MockSubmissionRepository,
        storage: Arc<dyn Storage>,
        dir: Option<TempDir>,
        group_id: Uuid,
    }

    impl Harness {
        async fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
            Self::build(storage, Some(dir), None)
        }

        fn with_storage(storage: Arc<dyn Storage>) -> Self {
            Self::build(storage, None, None)
        }

        async fn with_max_file_size(max: usize) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
            Self::build(storage, Some(dir), Some(max))
        }

        fn build(storage: Arc<dyn Storage>, dir: Option<TempDir>, max: Option<usize>) -> Self {
            let tasks = MockTaskRepository::new();
            let submissions = MockSubmissionRepository::new();
            let members = MockMemberRepository::new(submissions.clone());

            let mut service = SubmissionService::new(
                Arc::new(tasks.clone()),
                Arc::new(members.clone()),
                Arc::new(submissions.clone()),
                storage.clone(),
            );
            if let Some(max) = max {
                service = service.with_max_file_size(max);
            }

            Self {
                service: Arc::new(service),
                tasks,
                members,
                submissions,
                storage,
                dir,
                group_id: Uuid::new_v4(),
            }
        }

        fn add_task(&self, configure: impl FnOnce(&mut Task)) -> Task {
            let mut task = sample_task(self.group_id);
            configure(&mut task);
            self.tasks.add_task(task.clone());
            task
        }

        fn add_member(&self, student_id: &str, name: &str) -> Member {
            let member = sample_member(self.group_id, student_id, name);
            self.members.add_member(member.clone());
            member
        }

        fn files_on_disk(&self, task_id: Uuid) -> usize {
            let dir = self
                .dir
                .as_ref()
                .unwrap()
                .path()
                .join("submissions")
                .join(task_id.to_string());
            std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
        }
    }

    fn pdf(content: &[u8]) -> FileUpload {
        FileUpload {
            filename: "report.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            data: content.to_vec(),
        }
    }

    fn questions() -> Vec<QuestionDefinition> {
        serde_json::from_value(json!([
            {"title": "Major", "type": "text", "required": true},
            {"title": "Hobbies", "type": "checkbox", "required": false, "options": ["chess", "go"]}
        ]))
        .unwrap()
    }

    #[tokio::test]
    async fn test_modify_disallowed_keeps_first_text() {
        let h = Harness::new().await;
        let task = h.add_task(|t| t.allow_modify = false);
        let member = h.add_member("A001", "Alice");

        let first = h
            .service
            .submit_text(task.id, member.id, 1, "hello".to_string(), false)
            .await
            .unwrap();
        assert_eq!(first.upload_count, 1);

        let second = h
            .service
            .submit_text(task.id, member.id, 1, "world".to_string(), false)
            .await;
        assert!(matches!(second, Err(AppError::ModifyNotAllowed)));

        let stored = h.submissions.get(first.id).await.unwrap().unwrap();
        assert_eq!(stored, first);
        assert_eq!(stored.text(), Some("hello"));
    }

    #[tokio::test]
    async fn test_resubmission_updates_in_place() {
        let h = Harness::new().await;
        let task = h.add_task(|_| {});
        let member = h.add_member("A001", "Alice");

        for text in ["one", "two", "three"] {
            h.service
                .submit_text(task.id, member.id, 1, text.to_string(), false)
                .await
                .unwrap();
        }

        let key = SubmissionKey::new(task.id, member.id, 1, SubmissionKind::Text);
        assert_eq!(h.submissions.count_for_key(&key), 1);

        let stored = h.submissions.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(stored.upload_count, 3);
        assert_eq!(stored.text(), Some("three"));
    }

    #[tokio::test]
    async fn test_kinds_are_independent_slots() {
        let h = Harness::new().await;
        let task = h.add_task(|t| t.allow_modify = false);
        let member = h.add_member("A001", "Alice");

        h.service
            .submit_text(task.id, member.id, 1, "notes".to_string(), false)
            .await
            .unwrap();
        h.service
            .submit_file(task.id, member.id, 1, SubmissionKind::File, pdf(b"v1"), false)
            .await
            .unwrap();

        assert_eq!(h.submissions.all().len(), 2);
        assert_eq!(
            h.service
                .member_submission_count(task.id, member.id)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_deadline_passed_rejects_new_and_existing() {
        let h = Harness::new().await;
        let mut task = h.add_task(|_| {});
        let member = h.add_member("A001", "Alice");

        h.service
            .submit_text(task.id, member.id, 1, "early".to_string(), false)
            .await
            .unwrap();

        task.deadline = Some(Utc::now() - Duration::hours(1));
        h.tasks.add_task(task.clone());

        let existing = h
            .service
            .submit_text(task.id, member.id, 1, "late".to_string(), false)
            .await;
        assert!(matches!(existing, Err(AppError::DeadlinePassed { .. })));

        let fresh = h
            .service
            .submit_file(task.id, member.id, 2, SubmissionKind::File, pdf(b"x"), false)
            .await;
        assert!(matches!(fresh, Err(AppError::DeadlinePassed { .. })));

        assert_eq!(h.submissions.all().len(), 1);
        assert_eq!(h.files_on_disk(task.id), 0);
    }

    #[tokio::test]
    async fn test_required_question_missing() {
        let h = Harness::new().await;
        let task = h.add_task(|t| t.questionnaire_config = questions());
        let member = h.add_member("A001", "Alice");

        let answers = QuestionnaireAnswers::from_json(json!({"1": ["chess"]})).unwrap();
        let result = h
            .service
            .submit_questionnaire(task.id, member.id, 1, answers, false)
            .await;

        match result {
            Err(AppError::RequiredFieldMissing { index, question }) => {
                assert_eq!(index, 0);
                assert_eq!(question, "Major");
            }
            other => panic!("expected RequiredFieldMissing, got {:?}", other),
        }
        assert!(h.submissions.all().is_empty());
    }

    #[tokio::test]
    async fn test_questionnaire_with_answers_is_stored() {
        let h = Harness::new().await;
        let task = h.add_task(|t| t.questionnaire_config = questions());
        let member = h.add_member("A001", "Alice");

        let answers = QuestionnaireAnswers::from_json(json!({"0": "Physics"})).unwrap();
        let stored = h
            .service
            .submit_questionnaire(task.id, member.id, 1, answers.clone(), false)
            .await
            .unwrap();

        assert_eq!(stored.kind, SubmissionKind::Questionnaire);
        assert_eq!(stored.answers(), Some(&answers));
    }

    #[tokio::test]
    async fn test_missing_task_checked_before_member() {
        let h = Harness::new().await;

        let result = h
            .service
            .submit_text(Uuid::new_v4(), Uuid::new_v4(), 1, "x".to_string(), false)
            .await;
        assert!(matches!(result, Err(AppError::TaskNotFound(_))));

        let task = h.add_task(|_| {});
        let result = h
            .service
            .submit_text(task.id, Uuid::new_v4(), 1, "x".to_string(), false)
            .await;
        assert!(matches!(result, Err(AppError::OwnerNotFound(_))));
    }

    #[tokio::test]
    async fn test_file_resubmission_replaces_binary() {
        let h = Harness::new().await;
        let task = h.add_task(|_| {});
        let member = h.add_member("A001", "Alice");

        let first = h
            .service
            .submit_file(task.id, member.id, 1, SubmissionKind::File, pdf(b"v1"), false)
            .await
            .unwrap();
        let second = h
            .service
            .submit_file(task.id, member.id, 1, SubmissionKind::File, pdf(b"v2"), false)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.upload_count, 2);
        assert_ne!(first.storage_key(), second.storage_key());
        assert_eq!(h.files_on_disk(task.id), 1);

        let download = h.service.open_content(second.id).await.unwrap();
        assert_eq!(download.data, b"v2");
        assert_eq!(download.filename, "report.pdf");
        assert_eq!(download.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_file_type_rules() {
        let h = Harness::new().await;
        let task = h.add_task(|t| t.allowed_types = Some(vec!["document".to_string()]));
        let member = h.add_member("A001", "Alice");

        let photo = FileUpload {
            filename: "scan.pdf".to_string(),
            content_type: None,
            data: b"img".to_vec(),
        };
        let result = h
            .service
            .submit_file(task.id, member.id, 1, SubmissionKind::Image, photo, false)
            .await;
        assert!(matches!(result, Err(AppError::InvalidImageType { .. })));

        let binary = FileUpload {
            filename: "setup.exe".to_string(),
            content_type: None,
            data: b"MZ".to_vec(),
        };
        let result = h
            .service
            .submit_file(task.id, member.id, 1, SubmissionKind::File, binary, false)
            .await;
        assert!(matches!(result, Err(AppError::InvalidFileType { .. })));

        let upper = FileUpload {
            filename: "REPORT.PDF".to_string(),
            content_type: None,
            data: b"%PDF".to_vec(),
        };
        h.service
            .submit_file(task.id, member.id, 1, SubmissionKind::File, upper, false)
            .await
            .unwrap();

        assert_eq!(h.files_on_disk(task.id), 1);
    }

    #[tokio::test]
    async fn test_text_kind_rejected_for_file_upload() {
        let h = Harness::new().await;
        let task = h.add_task(|_| {});
        let member = h.add_member("A001", "Alice");

        let result = h
            .service
            .submit_file(task.id, member.id, 1, SubmissionKind::Text, pdf(b"x"), false)
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_payload_size_limits() {
        let h = Harness::with_max_file_size(4).await;
        let task = h.add_task(|_| {});
        let member = h.add_member("A001", "Alice");

        let result = h
            .service
            .submit_file(task.id, member.id, 1, SubmissionKind::File, pdf(b"12345"), false)
            .await;
        assert!(matches!(
            result,
            Err(AppError::PayloadTooLarge { size: 5, max: 4 })
        ));

        assert!(h.submissions.all().is_empty());
    }

    #[tokio::test]
    async fn test_long_client_metadata_is_kept() {
        let h = Harness::new().await;
        let task = h.add_task(|_| {});
        let member = h.add_member("A001", "Alice");

        let filename = format!("{}.pdf", "x".repeat(300));
        let content_type = format!("application/vnd.{}", "y".repeat(150));
        let stored = h
            .service
            .submit_file(
                task.id,
                member.id,
                1,
                SubmissionKind::File,
                FileUpload {
                    filename: filename.clone(),
                    content_type: Some(content_type.clone()),
                    data: b"%PDF".to_vec(),
                },
                false,
            )
            .await
            .unwrap();

        let download = h.service.open_content(stored.id).await.unwrap();
        assert_eq!(download.filename, filename);
        assert_eq!(download.content_type, content_type);
    }

    #[tokio::test]
    async fn test_empty_file_is_stored() {
        let h = Harness::new().await;
        let task = h.add_task(|_| {});
        let member = h.add_member("A001", "Alice");

        let stored = h
            .service
            .submit_file(
                task.id,
                member.id,
                1,
                SubmissionKind::File,
                FileUpload {
                    filename: "empty.txt".to_string(),
                    content_type: Some("text/plain".to_string()),
                    data: Vec::new(),
                },
                false,
            )
            .await
            .unwrap();

        assert_eq!(stored.upload_count, 1);
        assert_eq!(stored.stored_file().unwrap().file_size, 0);

        let download = h.service.open_content(stored.id).await.unwrap();
        assert_eq!(download.filename, "empty.txt");
        assert!(download.data.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_leaves_no_record() {
        let storage = FailingStorage::new();
        let h = Harness::with_storage(Arc::new(storage.clone()));
        let task = h.add_task(|_| {});
        let member = h.add_member("A001", "Alice");

        let result = h
            .service
            .submit_file(task.id, member.id, 1, SubmissionKind::File, pdf(b"v1"), false)
            .await;

        assert!(matches!(result, Err(AppError::StorageFailure(_))));
        assert_eq!(storage.upload_attempts(), 1);
        assert!(h.submissions.all().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_discards_new_binary() {
        let h = Harness::new().await;
        let task = h.add_task(|_| {});
        let member = h.add_member("A001", "Alice");

        h.submissions.set_fail_writes(true);
        let result = h
            .service
            .submit_file(task.id, member.id, 1, SubmissionKind::File, pdf(b"v1"), false)
            .await;

        assert!(matches!(result, Err(AppError::PersistenceFailure(_))));
        assert_eq!(h.files_on_disk(task.id), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_previous_binary() {
        let h = Harness::new().await;
        let task = h.add_task(|_| {});
        let member = h.add_member("A001", "Alice");

        let first = h
            .service
            .submit_file(task.id, member.id, 1, SubmissionKind::File, pdf(b"v1"), false)
            .await
            .unwrap();

        h.submissions.set_fail_writes(true);
        let result = h
            .service
            .submit_file(task.id, member.id, 1, SubmissionKind::File, pdf(b"v2"), false)
            .await;
        assert!(matches!(result, Err(AppError::PersistenceFailure(_))));

        h.submissions.set_fail_writes(false);
        assert_eq!(h.files_on_disk(task.id), 1);
        let download = h.service.open_content(first.id).await.unwrap();
        assert_eq!(download.data, b"v1");
    }

    #[tokio::test]
    async fn test_visibility_follows_task_policy() {
        let h = Harness::new().await;
        let member = h.add_member("A001", "Alice");

        let admin_only = h.add_task(|t| t.admin_only_visible = true);
        let stored = h
            .service
            .submit_text(admin_only.id, member.id, 1, "x".to_string(), false)
            .await
            .unwrap();
        assert!(stored.is_private);

        let fixed_public = h.add_task(|t| t.allow_user_set_visibility = false);
        let stored = h
            .service
            .submit_text(fixed_public.id, member.id, 1, "x".to_string(), true)
            .await
            .unwrap();
        assert!(!stored.is_private);

        let user_choice = h.add_task(|_| {});
        let stored = h
            .service
            .submit_text(user_choice.id, member.id, 1, "x".to_string(), true)
            .await
            .unwrap();
        assert!(stored.is_private);

        let stored = h
            .service
            .submit_text(user_choice.id, member.id, 1, "y".to_string(), false)
            .await
            .unwrap();
        assert!(!stored.is_private);
    }

    #[tokio::test]
    async fn test_concurrent_resubmissions_to_one_slot() {
        let h = Harness::new().await;
        let task = h.add_task(|_| {});
        let member = h.add_member("A001", "Alice");

        let mut handles = Vec::new();
        for i in 0..10u8 {
            let service = h.service.clone();
            let (task_id, member_id) = (task.id, member.id);
            handles.push(tokio::spawn(async move {
                service
                    .submit_file(task_id, member_id, 1, SubmissionKind::File, pdf(&[i + 1]), false)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let key = SubmissionKey::new(task.id, member.id, 1, SubmissionKind::File);
        assert_eq!(h.submissions.count_for_key(&key), 1);

        let stored = h.submissions.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(stored.upload_count, 10);
        assert_eq!(h.files_on_disk(task.id), 1);
        assert!(h
            .storage
            .exists(stored.storage_key().unwrap())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_file() {
        let h = Harness::new().await;
        let task = h.add_task(|_| {});
        let member = h.add_member("A001", "Alice");

        let stored = h
            .service
            .submit_file(task.id, member.id, 1, SubmissionKind::File, pdf(b"v1"), false)
            .await
            .unwrap();

        h.service.delete_submission(stored.id).await.unwrap();
        assert!(h.submissions.all().is_empty());
        assert_eq!(h.files_on_disk(task.id), 0);

        let again = h.service.delete_submission(stored.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_content_is_not_found() {
        let h = Harness::new().await;
        let task = h.add_task(|_| {});
        let member = h.add_member("A001", "Alice");

        let stored = h
            .service
            .submit_file(task.id, member.id, 1, SubmissionKind::File, pdf(b"v1"), false)
            .await
            .unwrap();
        h.storage
            .delete(stored.storage_key().unwrap())
            .await
            .unwrap();

        let result = h.service.open_content(stored.id).await;
        match result {
            Err(AppError::NotFound(message)) => assert!(!message.contains("submissions/")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_public_listing() {
        let h = Harness::new().await;
        let task = h.add_task(|_| {});
        let alice = h.add_member("A001", "Alice");
        let bob = h.add_member("A002", "Bob");

        h.service
            .submit_text(task.id, alice.id, 1, "shared".to_string(), false)
            .await
            .unwrap();
        h.service
            .submit_text(task.id, bob.id, 1, "secret".to_string(), true)
            .await
            .unwrap();

        let public = h.service.list_public_submissions(task.id, None).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].member_name, "Alice");

        let others = h
            .service
            .list_public_submissions(task.id, Some(alice.id))
            .await
            .unwrap();
        assert!(others.is_empty());

        let mut hidden = task.clone();
        hidden.admin_only_visible = true;
        h.tasks.add_task(hidden);
        let public = h.service.list_public_submissions(task.id, None).await.unwrap();
        assert!(public.is_empty());
    }

    #[tokio::test]
    async fn test_stats_and_unsubmitted_members() {
        let h = Harness::new().await;
        let task = h.add_task(|_| {});
        let alice = h.add_member("A001", "Alice");
        h.add_member("A002", "Bob");
        h.add_member("A003", "Carol");

        h.service
            .submit_text(task.id, alice.id, 1, "done".to_string(), false)
            .await
            .unwrap();
        h.service
            .submit_text(task.id, alice.id, 2, "also done".to_string(), false)
            .await
            .unwrap();

        let stats = h.service.task_stats(task.id).await.unwrap();
        assert_eq!(stats.total_members, 3);
        assert_eq!(stats.submitted_count, 1);
        assert_eq!(stats.not_submitted_count, 2);
        assert_eq!(stats.submission_rate, 33.33);

        let pending = h.service.unsubmitted_members(task.id).await.unwrap();
        let names: Vec<&str> = pending.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Carol"]);
    }

    #[tokio::test]
    async fn test_list_submissions_by_member() {
        let h = Harness::new().await;
        let task = h.add_task(|_| {});
        let alice = h.add_member("A001", "Alice");
        let bob = h.add_member("A002", "Bob");

        h.service
            .submit_text(task.id, alice.id, 1, "a".to_string(), false)
            .await
            .unwrap();
        h.service
            .submit_text(task.id, bob.id, 1, "b".to_string(), false)
            .await
            .unwrap();

        let filter = SubmissionFilter {
            task_id: Some(task.id),
            member_id: Some(bob.id),
            ..Default::default()
        };
        let rows = h.service.list_submissions(filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text(), Some("b"));
    }
}
