use chrono::{DateTime, Utc};
use gather_core::models::Task;
use gather_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, group_id, title, description, deadline, allow_modify, \
    admin_only_visible, allow_user_set_visibility, allowed_types, naming_format, \
    questionnaire_config, items_per_person, remind_before_hours, auto_remind_enabled, \
    created_at, updated_at";

/// Read access to task configuration. Tasks are created and edited elsewhere.
#[async_trait::async_trait]
pub trait TaskRepositoryTrait: Send + Sync {
    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, AppError>;

    /// Tasks with auto-remind enabled whose deadline is still ahead of `now`.
    async fn list_auto_remind_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>, AppError>;
}

#[derive(Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TaskRepositoryTrait for PostgresTaskRepository {
    #[tracing::instrument(skip(self), fields(db.table = "tasks", db.operation = "select", db.record_id = %id))]
    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let task = sqlx::query_as::<Postgres, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(task)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tasks", db.operation = "select"))]
    async fn list_auto_remind_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>, AppError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE auto_remind_enabled AND deadline IS NOT NULL AND deadline > $1 ORDER BY deadline ASC",
            TASK_COLUMNS
        );
        let tasks = sqlx::query_as::<Postgres, Task>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        Ok(tasks)
    }
}
