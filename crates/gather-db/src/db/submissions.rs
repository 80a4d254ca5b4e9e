use gather_core::models::{
    Submission, SubmissionContent, SubmissionFilter, SubmissionKey,
};
use gather_core::AppError;
use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use super::transaction::TransactionGuard;

const SUBMISSION_COLUMNS: &str = "id, task_id, member_id, item_index, kind, original_filename, \
    storage_key, content_type, file_size, text_content, questionnaire_answers, is_private, \
    upload_count, created_at, updated_at";

/// Payload for a write to one submission slot.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub key: SubmissionKey,
    pub content: SubmissionContent,
    pub is_private: bool,
}

/// Result of an upsert: the stored row and, on update, the row it replaced.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub submission: Submission,
    pub previous: Option<Submission>,
}

#[async_trait::async_trait]
pub trait SubmissionRepositoryTrait: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Submission>, AppError>;

    async fn find_by_key(&self, key: &SubmissionKey) -> Result<Option<Submission>, AppError>;

    /// Insert the slot with `upload_count = 1`, or replace its content and
    /// increment `upload_count`. With `allow_modify = false` an existing slot
    /// yields `ModifyNotAllowed` and is left untouched.
    async fn upsert(
        &self,
        new: NewSubmission,
        allow_modify: bool,
    ) -> Result<UpsertOutcome, AppError>;

    /// Delete a row, returning it if it existed.
    async fn delete(&self, id: Uuid) -> Result<Option<Submission>, AppError>;

    /// Newest first.
    async fn list(&self, filter: SubmissionFilter) -> Result<Vec<Submission>, AppError>;

    /// Every submission of a task, optionally limited to some members.
    async fn list_by_task(
        &self,
        task_id: Uuid,
        member_ids: Option<&[Uuid]>,
    ) -> Result<Vec<Submission>, AppError>;

    /// Non-private submissions of a task, optionally excluding one member.
    async fn list_public(
        &self,
        task_id: Uuid,
        exclude_member_id: Option<Uuid>,
    ) -> Result<Vec<Submission>, AppError>;

    async fn count_distinct_submitters(&self, task_id: Uuid) -> Result<i64, AppError>;

    async fn count_for_member(&self, task_id: Uuid, member_id: Uuid) -> Result<i64, AppError>;
}

/// Column values for one content variant; the others are stored as NULL.
struct ContentColumns {
    original_filename: Option<String>,
    storage_key: Option<String>,
    content_type: Option<String>,
    file_size: Option<i64>,
    text_content: Option<String>,
    questionnaire_answers: Option<JsonValue>,
}

impl From<&SubmissionContent> for ContentColumns {
    fn from(content: &SubmissionContent) -> Self {
        let mut cols = ContentColumns {
            original_filename: None,
            storage_key: None,
            content_type: None,
            file_size: None,
            text_content: None,
            questionnaire_answers: None,
        };
        match content {
            SubmissionContent::Binary(file) => {
                cols.original_filename = Some(file.original_filename.clone());
                cols.storage_key = Some(file.storage_key.clone());
                cols.content_type = file.content_type.clone();
                cols.file_size = Some(file.file_size);
            }
            SubmissionContent::Text(text) => cols.text_content = Some(text.clone()),
            SubmissionContent::Questionnaire(answers) => {
                cols.questionnaire_answers = Some(answers.to_json())
            }
        }
        cols
    }
}

#[derive(Clone)]
pub struct PostgresSubmissionRepository {
    pool: PgPool,
}

impl PostgresSubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn select_for_update(
        conn: &mut PgConnection,
        key: &SubmissionKey,
    ) -> Result<Option<Submission>, AppError> {
        let sql = format!(
            "SELECT {} FROM submissions WHERE task_id = $1 AND member_id = $2 AND item_index = $3 AND kind = $4 FOR UPDATE",
            SUBMISSION_COLUMNS
        );
        let row = sqlx::query_as::<Postgres, Submission>(&sql)
            .bind(key.task_id)
            .bind(key.member_id)
            .bind(key.item_index)
            .bind(key.kind)
            .fetch_optional(conn)
            .await?;

        Ok(row)
    }

    async fn try_insert(
        conn: &mut PgConnection,
        new: &NewSubmission,
    ) -> Result<Option<Submission>, AppError> {
        let cols = ContentColumns::from(&new.content);
        let sql = format!(
            r#"
            INSERT INTO submissions (
                id, task_id, member_id, item_index, kind, original_filename, storage_key,
                content_type, file_size, text_content, questionnaire_answers, is_private,
                upload_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 1)
            ON CONFLICT ON CONSTRAINT uq_submissions_slot DO NOTHING
            RETURNING {}
            "#,
            SUBMISSION_COLUMNS
        );
        let row = sqlx::query_as::<Postgres, Submission>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.key.task_id)
            .bind(new.key.member_id)
            .bind(new.key.item_index)
            .bind(new.key.kind)
            .bind(cols.original_filename)
            .bind(cols.storage_key)
            .bind(cols.content_type)
            .bind(cols.file_size)
            .bind(cols.text_content)
            .bind(cols.questionnaire_answers)
            .bind(new.is_private)
            .fetch_optional(conn)
            .await?;

        Ok(row)
    }

    async fn replace_content(
        conn: &mut PgConnection,
        id: Uuid,
        new: &NewSubmission,
    ) -> Result<Submission, AppError> {
        let cols = ContentColumns::from(&new.content);
        let sql = format!(
            r#"
            UPDATE submissions
            SET original_filename = $2, storage_key = $3, content_type = $4, file_size = $5,
                text_content = $6, questionnaire_answers = $7, is_private = $8,
                upload_count = upload_count + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SUBMISSION_COLUMNS
        );
        let row = sqlx::query_as::<Postgres, Submission>(&sql)
            .bind(id)
            .bind(cols.original_filename)
            .bind(cols.storage_key)
            .bind(cols.content_type)
            .bind(cols.file_size)
            .bind(cols.text_content)
            .bind(cols.questionnaire_answers)
            .bind(new.is_private)
            .fetch_one(conn)
            .await?;

        Ok(row)
    }
}

#[async_trait::async_trait]
impl SubmissionRepositoryTrait for PostgresSubmissionRepository {
    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<Submission>, AppError> {
        let sql = format!("SELECT {} FROM submissions WHERE id = $1", SUBMISSION_COLUMNS);
        let row = sqlx::query_as::<Postgres, Submission>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "select", key = %key))]
    async fn find_by_key(&self, key: &SubmissionKey) -> Result<Option<Submission>, AppError> {
        let sql = format!(
            "SELECT {} FROM submissions WHERE task_id = $1 AND member_id = $2 AND item_index = $3 AND kind = $4",
            SUBMISSION_COLUMNS
        );
        let row = sqlx::query_as::<Postgres, Submission>(&sql)
            .bind(key.task_id)
            .bind(key.member_id)
            .bind(key.item_index)
            .bind(key.kind)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self, new), fields(db.table = "submissions", db.operation = "upsert", key = %new.key))]
    async fn upsert(
        &self,
        new: NewSubmission,
        allow_modify: bool,
    ) -> Result<UpsertOutcome, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let mut existing = Self::select_for_update(tx.conn()?, &new.key).await?;

        if existing.is_none() {
            if let Some(inserted) = Self::try_insert(tx.conn()?, &new).await? {
                tx.commit().await?;
                return Ok(UpsertOutcome {
                    submission: inserted,
                    previous: None,
                });
            }
            // A concurrent writer inserted the slot first; lock its row instead.
            existing = Self::select_for_update(tx.conn()?, &new.key).await?;
        }

        let existing = match existing {
            Some(row) => row,
            None => {
                tx.rollback().await?;
                return Err(AppError::Internal(format!(
                    "Submission slot {} vanished during upsert",
                    new.key
                )));
            }
        };

        if !allow_modify {
            tx.rollback().await?;
            return Err(AppError::ModifyNotAllowed);
        }

        let updated = Self::replace_content(tx.conn()?, existing.id, &new).await?;
        tx.commit().await?;

        Ok(UpsertOutcome {
            submission: updated,
            previous: Some(existing),
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<Option<Submission>, AppError> {
        let sql = format!(
            "DELETE FROM submissions WHERE id = $1 RETURNING {}",
            SUBMISSION_COLUMNS
        );
        let row = sqlx::query_as::<Postgres, Submission>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "select"))]
    async fn list(&self, filter: SubmissionFilter) -> Result<Vec<Submission>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM submissions
            WHERE ($1::uuid IS NULL OR task_id = $1)
              AND ($2::uuid IS NULL OR member_id = $2)
            ORDER BY created_at DESC
            OFFSET $3 LIMIT $4
            "#,
            SUBMISSION_COLUMNS
        );
        let rows = sqlx::query_as::<Postgres, Submission>(&sql)
            .bind(filter.task_id)
            .bind(filter.member_id)
            .bind(filter.offset)
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self, member_ids), fields(db.table = "submissions", db.operation = "select", db.task_id = %task_id))]
    async fn list_by_task(
        &self,
        task_id: Uuid,
        member_ids: Option<&[Uuid]>,
    ) -> Result<Vec<Submission>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM submissions
            WHERE task_id = $1 AND ($2::uuid[] IS NULL OR member_id = ANY($2))
            ORDER BY member_id, kind, item_index
            "#,
            SUBMISSION_COLUMNS
        );
        let rows = sqlx::query_as::<Postgres, Submission>(&sql)
            .bind(task_id)
            .bind(member_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "select", db.task_id = %task_id))]
    async fn list_public(
        &self,
        task_id: Uuid,
        exclude_member_id: Option<Uuid>,
    ) -> Result<Vec<Submission>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM submissions
            WHERE task_id = $1 AND is_private = FALSE
              AND ($2::uuid IS NULL OR member_id <> $2)
            ORDER BY created_at DESC
            "#,
            SUBMISSION_COLUMNS
        );
        let rows = sqlx::query_as::<Postgres, Submission>(&sql)
            .bind(task_id)
            .bind(exclude_member_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "count"))]
    async fn count_distinct_submitters(&self, task_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(DISTINCT member_id) FROM submissions WHERE task_id = $1",
        )
        .bind(task_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(db.table = "submissions", db.operation = "count"))]
    async fn count_for_member(&self, task_id: Uuid, member_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM submissions WHERE task_id = $1 AND member_id = $2",
        )
        .bind(task_id)
        .bind(member_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
