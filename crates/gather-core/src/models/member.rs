use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::naming::NamingAttributes;

/// A person who may submit against the tasks of their group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Member {
    pub id: Uuid,
    /// External identifier, unique across members.
    pub student_id: String,
    pub name: String,
    pub gender: Option<String>,
    pub dormitory: Option<String>,
    pub email: Option<String>,
    pub group_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn naming_attributes(&self) -> NamingAttributes {
        NamingAttributes {
            student_id: self.student_id.clone(),
            name: self.name.clone(),
            gender: self.gender.clone(),
            dormitory: self.dormitory.clone(),
        }
    }
}

/// Lightweight member view returned by the unsubmitted-owners query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub id: Uuid,
    pub student_id: String,
    pub name: String,
    pub email: Option<String>,
}

impl From<&Member> for MemberSummary {
    fn from(member: &Member) -> Self {
        MemberSummary {
            id: member.id,
            student_id: member.student_id.clone(),
            name: member.name.clone(),
            email: member.email.clone(),
        }
    }
}
