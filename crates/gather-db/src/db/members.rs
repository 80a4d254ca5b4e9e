use gather_core::models::Member;
use gather_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const MEMBER_COLUMNS: &str =
    "id, student_id, name, gender, dormitory, email, group_id, created_at, updated_at";
const MEMBER_COLUMNS_QUALIFIED: &str = "m.id, m.student_id, m.name, m.gender, m.dormitory, \
    m.email, m.group_id, m.created_at, m.updated_at";

/// Read access to members. Member import and editing happen elsewhere.
#[async_trait::async_trait]
pub trait MemberRepositoryTrait: Send + Sync {
    async fn get_member(&self, id: Uuid) -> Result<Option<Member>, AppError>;

    async fn get_members(&self, ids: &[Uuid]) -> Result<Vec<Member>, AppError>;

    async fn list_by_group(&self, group_id: Uuid) -> Result<Vec<Member>, AppError>;

    async fn count_by_group(&self, group_id: Uuid) -> Result<i64, AppError>;

    /// Members of `group_id` without any submission for `task_id`.
    async fn list_without_submission(
        &self,
        group_id: Uuid,
        task_id: Uuid,
    ) -> Result<Vec<Member>, AppError>;
}

#[derive(Clone)]
pub struct PostgresMemberRepository {
    pool: PgPool,
}

impl PostgresMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MemberRepositoryTrait for PostgresMemberRepository {
    #[tracing::instrument(skip(self), fields(db.table = "members", db.operation = "select", db.record_id = %id))]
    async fn get_member(&self, id: Uuid) -> Result<Option<Member>, AppError> {
        let sql = format!("SELECT {} FROM members WHERE id = $1", MEMBER_COLUMNS);
        let member = sqlx::query_as::<Postgres, Member>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(member)
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "members", db.operation = "select", count = ids.len()))]
    async fn get_members(&self, ids: &[Uuid]) -> Result<Vec<Member>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {} FROM members WHERE id = ANY($1)", MEMBER_COLUMNS);
        let members = sqlx::query_as::<Postgres, Member>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(members)
    }

    #[tracing::instrument(skip(self), fields(db.table = "members", db.operation = "select"))]
    async fn list_by_group(&self, group_id: Uuid) -> Result<Vec<Member>, AppError> {
        let sql = format!(
            "SELECT {} FROM members WHERE group_id = $1 ORDER BY student_id ASC",
            MEMBER_COLUMNS
        );
        let members = sqlx::query_as::<Postgres, Member>(&sql)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(members)
    }

    #[tracing::instrument(skip(self), fields(db.table = "members", db.operation = "count"))]
    async fn count_by_group(&self, group_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM members WHERE group_id = $1",
        )
        .bind(group_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(db.table = "members", db.operation = "select"))]
    async fn list_without_submission(
        &self,
        group_id: Uuid,
        task_id: Uuid,
    ) -> Result<Vec<Member>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM members m
            WHERE m.group_id = $1
              AND NOT EXISTS (
                SELECT 1 FROM submissions s WHERE s.task_id = $2 AND s.member_id = m.id
              )
            ORDER BY m.student_id ASC
            "#,
            MEMBER_COLUMNS_QUALIFIED
        );
        let members = sqlx::query_as::<Postgres, Member>(&sql)
            .bind(group_id)
            .bind(task_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(members)
    }
}
