use chrono::{DateTime, Utc};
use gather_core::models::{ReminderLog, ReminderStatus};
use gather_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[async_trait::async_trait]
pub trait ReminderLogRepositoryTrait: Send + Sync {
    /// Time of the most recent reminder recorded for a task.
    async fn last_sent_at(&self, task_id: Uuid) -> Result<Option<DateTime<Utc>>, AppError>;

    async fn record(
        &self,
        task_id: Uuid,
        member_id: Uuid,
        email: Option<&str>,
        status: ReminderStatus,
        error_message: Option<&str>,
    ) -> Result<ReminderLog, AppError>;
}

#[derive(Clone)]
pub struct PostgresReminderLogRepository {
    pool: PgPool,
}

impl PostgresReminderLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReminderLogRepositoryTrait for PostgresReminderLogRepository {
    #[tracing::instrument(skip(self), fields(db.table = "reminder_logs", db.operation = "select"))]
    async fn last_sent_at(&self, task_id: Uuid) -> Result<Option<DateTime<Utc>>, AppError> {
        let last = sqlx::query_scalar::<Postgres, Option<DateTime<Utc>>>(
            "SELECT MAX(sent_at) FROM reminder_logs WHERE task_id = $1",
        )
        .bind(task_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(last)
    }

    #[tracing::instrument(skip(self, email, error_message), fields(db.table = "reminder_logs", db.operation = "insert"))]
    async fn record(
        &self,
        task_id: Uuid,
        member_id: Uuid,
        email: Option<&str>,
        status: ReminderStatus,
        error_message: Option<&str>,
    ) -> Result<ReminderLog, AppError> {
        let log = sqlx::query_as::<Postgres, ReminderLog>(
            r#"
            INSERT INTO reminder_logs (id, task_id, member_id, email, status, error_message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, task_id, member_id, email, status, error_message, sent_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(member_id)
        .bind(email)
        .bind(status)
        .bind(error_message)
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }
}
