//! Mock repository implementations for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_core::models::{
    Member, ReminderLog, ReminderStatus, Submission, SubmissionFilter, SubmissionKey, Task,
};
use gather_core::AppError;
use gather_db::{
    MemberRepositoryTrait, NewSubmission, ReminderLogRepositoryTrait, SubmissionRepositoryTrait,
    TaskRepositoryTrait, UpsertOutcome,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MockTaskRepository {
    tasks: Arc<Mutex<HashMap<Uuid, Task>>>,
}

impl MockTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&self, task: Task) {
        self.tasks.lock().unwrap().insert(task.id, task);
    }
}

#[async_trait]
impl TaskRepositoryTrait for MockTaskRepository {
    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        Ok(self.tasks.lock().unwrap().get(&id).cloned())
    }

    async fn list_auto_remind_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>, AppError> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.auto_remind_enabled && t.deadline.is_some_and(|d| d > now))
            .cloned()
            .collect())
    }
}

/// Submission rows keyed by id; `fail_writes` makes every upsert fail.
#[derive(Clone, Default)]
pub struct MockSubmissionRepository {
    rows: Arc<Mutex<HashMap<Uuid, Submission>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockSubmissionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<Submission> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn count_for_key(&self, key: &SubmissionKey) -> usize {
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.key() == *key)
            .count()
    }
}

#[async_trait]
impl SubmissionRepositoryTrait for MockSubmissionRepository {
    async fn get(&self, id: Uuid) -> Result<Option<Submission>, AppError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_key(&self, key: &SubmissionKey) -> Result<Option<Submission>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|s| s.key() == *key)
            .cloned())
    }

    async fn upsert(
        &self,
        new: NewSubmission,
        allow_modify: bool,
    ) -> Result<UpsertOutcome, AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal("simulated write failure".to_string()));
        }

        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();

        let existing = rows.values().find(|s| s.key() == new.key).cloned();
        match existing {
            Some(previous) => {
                if !allow_modify {
                    return Err(AppError::ModifyNotAllowed);
                }
                let mut updated = previous.clone();
                updated.content = new.content;
                updated.is_private = new.is_private;
                updated.upload_count += 1;
                updated.updated_at = now;
                rows.insert(updated.id, updated.clone());
                Ok(UpsertOutcome {
                    submission: updated,
                    previous: Some(previous),
                })
            }
            None => {
                let submission = Submission {
                    id: Uuid::new_v4(),
                    task_id: new.key.task_id,
                    member_id: new.key.member_id,
                    item_index: new.key.item_index,
                    kind: new.key.kind,
                    content: new.content,
                    is_private: new.is_private,
                    upload_count: 1,
                    created_at: now,
                    updated_at: now,
                };
                rows.insert(submission.id, submission.clone());
                Ok(UpsertOutcome {
                    submission,
                    previous: None,
                })
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Submission>, AppError> {
        Ok(self.rows.lock().unwrap().remove(&id))
    }

    async fn list(&self, filter: SubmissionFilter) -> Result<Vec<Submission>, AppError> {
        let mut rows: Vec<Submission> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|s| filter.task_id.map_or(true, |t| s.task_id == t))
            .filter(|s| filter.member_id.map_or(true, |m| s.member_id == m))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn list_by_task(
        &self,
        task_id: Uuid,
        member_ids: Option<&[Uuid]>,
    ) -> Result<Vec<Submission>, AppError> {
        let mut rows: Vec<Submission> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.task_id == task_id)
            .filter(|s| member_ids.map_or(true, |ids| ids.contains(&s.member_id)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn list_public(
        &self,
        task_id: Uuid,
        exclude_member_id: Option<Uuid>,
    ) -> Result<Vec<Submission>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.task_id == task_id && !s.is_private)
            .filter(|s| Some(s.member_id) != exclude_member_id)
            .cloned()
            .collect())
    }

    async fn count_distinct_submitters(&self, task_id: Uuid) -> Result<i64, AppError> {
        let members: HashSet<Uuid> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.task_id == task_id)
            .map(|s| s.member_id)
            .collect();
        Ok(members.len() as i64)
    }

    async fn count_for_member(&self, task_id: Uuid, member_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.task_id == task_id && s.member_id == member_id)
            .count() as i64)
    }
}

/// Members, plus a view of the submission rows for the unsubmitted query.
#[derive(Clone)]
pub struct MockMemberRepository {
    members: Arc<Mutex<HashMap<Uuid, Member>>>,
    submissions: MockSubmissionRepository,
}

impl MockMemberRepository {
    pub fn new(submissions: MockSubmissionRepository) -> Self {
        Self {
            members: Arc::new(Mutex::new(HashMap::new())),
            submissions,
        }
    }

    pub fn add_member(&self, member: Member) {
        self.members.lock().unwrap().insert(member.id, member);
    }
}

#[async_trait]
impl MemberRepositoryTrait for MockMemberRepository {
    async fn get_member(&self, id: Uuid) -> Result<Option<Member>, AppError> {
        Ok(self.members.lock().unwrap().get(&id).cloned())
    }

    async fn get_members(&self, ids: &[Uuid]) -> Result<Vec<Member>, AppError> {
        let members = self.members.lock().unwrap();
        Ok(ids.iter().filter_map(|id| members.get(id).cloned()).collect())
    }

    async fn list_by_group(&self, group_id: Uuid) -> Result<Vec<Member>, AppError> {
        let mut members: Vec<Member> = self
            .members
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        Ok(members)
    }

    async fn count_by_group(&self, group_id: Uuid) -> Result<i64, AppError> {
        Ok(self.list_by_group(group_id).await?.len() as i64)
    }

    async fn list_without_submission(
        &self,
        group_id: Uuid,
        task_id: Uuid,
    ) -> Result<Vec<Member>, AppError> {
        let submitted: HashSet<Uuid> = self
            .submissions
            .all()
            .into_iter()
            .filter(|s| s.task_id == task_id)
            .map(|s| s.member_id)
            .collect();
        Ok(self
            .list_by_group(group_id)
            .await?
            .into_iter()
            .filter(|m| !submitted.contains(&m.id))
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct MockReminderLogRepository {
    logs: Arc<Mutex<Vec<ReminderLog>>>,
}

impl MockReminderLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<ReminderLog> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReminderLogRepositoryTrait for MockReminderLogRepository {
    async fn last_sent_at(&self, task_id: Uuid) -> Result<Option<DateTime<Utc>>, AppError> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.task_id == task_id)
            .map(|l| l.sent_at)
            .max())
    }

    async fn record(
        &self,
        task_id: Uuid,
        member_id: Uuid,
        email: Option<&str>,
        status: ReminderStatus,
        error_message: Option<&str>,
    ) -> Result<ReminderLog, AppError> {
        let log = ReminderLog {
            id: Uuid::new_v4(),
            task_id,
            member_id,
            email: email.map(str::to_string),
            status,
            error_message: error_message.map(str::to_string),
            sent_at: Utc::now(),
        };
        self.logs.lock().unwrap().push(log.clone());
        Ok(log)
    }
}
