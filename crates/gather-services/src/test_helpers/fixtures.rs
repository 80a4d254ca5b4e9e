use chrono::Utc;
use gather_core::models::{Member, Task};
use uuid::Uuid;

pub fn sample_task(group_id: Uuid) -> Task {
    let now = Utc::now();
    Task {
        id: Uuid::new_v4(),
        group_id,
        title: "Homework 1".to_string(),
        description: None,
        deadline: None,
        allow_modify: true,
        admin_only_visible: false,
        allow_user_set_visibility: true,
        allowed_types: None,
        naming_format: None,
        questionnaire_config: Vec::new(),
        items_per_person: 1,
        remind_before_hours: 24,
        auto_remind_enabled: false,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_member(group_id: Uuid, student_id: &str, name: &str) -> Member {
    let now = Utc::now();
    Member {
        id: Uuid::new_v4(),
        student_id: student_id.to_string(),
        name: name.to_string(),
        gender: None,
        dormitory: None,
        email: Some(format!("{}@example.com", student_id.to_lowercase())),
        group_id,
        created_at: now,
        updated_at: now,
    }
}
