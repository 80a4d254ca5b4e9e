use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::questionnaire::QuestionDefinition;

/// A collection campaign: what members must submit, until when, and how the
/// result is named on export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub allow_modify: bool,
    pub admin_only_visible: bool,
    pub allow_user_set_visibility: bool,
    /// Category tags (`image`, `document`, ...) or bare extensions; `None` means unrestricted.
    pub allowed_types: Option<Vec<String>>,
    pub naming_format: Option<String>,
    pub questionnaire_config: Vec<QuestionDefinition>,
    pub items_per_person: i32,
    pub remind_before_hours: i32,
    pub auto_remind_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Task {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let questionnaire_config: Option<serde_json::Value> = row.try_get("questionnaire_config")?;
        let questionnaire_config = match questionnaire_config {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse questionnaire_config: {}", e).into())
            })?,
            None => Vec::new(),
        };

        Ok(Task {
            id: row.try_get("id")?,
            group_id: row.try_get("group_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            deadline: row.try_get("deadline")?,
            allow_modify: row.try_get("allow_modify")?,
            admin_only_visible: row.try_get("admin_only_visible")?,
            allow_user_set_visibility: row.try_get("allow_user_set_visibility")?,
            allowed_types: row.try_get("allowed_types")?,
            naming_format: row.try_get("naming_format")?,
            questionnaire_config,
            items_per_person: row.try_get("items_per_person")?,
            remind_before_hours: row.try_get("remind_before_hours")?,
            auto_remind_enabled: row.try_get("auto_remind_enabled")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl Task {
    /// A task without a deadline never closes.
    pub fn is_deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| now > deadline)
    }

    /// Whether the reminder window is open: reminders enabled, deadline still
    /// ahead, and within `remind_before_hours` of it.
    pub fn is_reminder_due(&self, now: DateTime<Utc>) -> bool {
        if !self.auto_remind_enabled {
            return false;
        }
        match self.deadline {
            Some(deadline) if deadline > now => {
                now >= deadline - Duration::hours(i64::from(self.remind_before_hours))
            }
            _ => false,
        }
    }

    /// Naming template for export: explicit override, then the task's own, then `fallback`.
    pub fn effective_naming_format<'a>(
        &'a self,
        explicit: Option<&'a str>,
        fallback: &'a str,
    ) -> &'a str {
        explicit
            .filter(|t| !t.is_empty())
            .or(self.naming_format.as_deref().filter(|t| !t.is_empty()))
            .unwrap_or(fallback)
    }
}

/// Submission statistics for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    pub task_id: Uuid,
    pub total_members: i64,
    pub submitted_count: i64,
    pub not_submitted_count: i64,
    /// Percentage rounded to two decimals; 0 when the group is empty.
    pub submission_rate: f64,
}

impl TaskStats {
    pub fn compute(task_id: Uuid, total_members: i64, submitted_count: i64) -> Self {
        let submission_rate = if total_members > 0 {
            let rate = submitted_count as f64 / total_members as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        } else {
            0.0
        };

        TaskStats {
            task_id,
            total_members,
            submitted_count,
            not_submitted_count: total_members - submitted_count,
            submission_rate,
        }
    }
}
