use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Sent,
    Failed,
}

impl Display for ReminderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ReminderStatus::Sent => write!(f, "sent"),
            ReminderStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ReminderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(ReminderStatus::Sent),
            "failed" => Ok(ReminderStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid reminder status: {}", s)),
        }
    }
}

/// One reminder delivered (or attempted) to one member for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReminderLog {
    pub id: Uuid,
    pub task_id: Uuid,
    pub member_id: Uuid,
    pub email: Option<String>,
    pub status: ReminderStatus,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}
