use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_core::models::{MemberSummary, ReminderStatus, Task};
use gather_core::AppError;
use gather_db::{ReminderLogRepositoryTrait, TaskRepositoryTrait};
use tokio::time::interval;

use crate::intake::SubmissionService;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(600);
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(3600);

/// Delivers one reminder to one member.
#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn notify(&self, task: &Task, member: &MemberSummary) -> Result<(), AppError>;
}

/// Notifier that only writes the reminder to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl ReminderNotifier for LoggingNotifier {
    async fn notify(&self, task: &Task, member: &MemberSummary) -> Result<(), AppError> {
        tracing::info!(
            task_id = %task.id,
            task_title = %task.title,
            member_id = %member.id,
            student_id = %member.student_id,
            deadline = ?task.deadline,
            "Submission reminder"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderRunReport {
    pub tasks_reminded: usize,
    pub tasks_in_cooldown: usize,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ReminderService {
    tasks: Arc<dyn TaskRepositoryTrait>,
    intake: Arc<SubmissionService>,
    logs: Arc<dyn ReminderLogRepositoryTrait>,
    notifier: Arc<dyn ReminderNotifier>,
    interval: Duration,
    cooldown: Duration,
}

impl ReminderService {
    pub fn new(
        tasks: Arc<dyn TaskRepositoryTrait>,
        intake: Arc<SubmissionService>,
        logs: Arc<dyn ReminderLogRepositoryTrait>,
        notifier: Arc<dyn ReminderNotifier>,
    ) -> Self {
        Self {
            tasks,
            intake,
            logs,
            notifier,
            interval: DEFAULT_INTERVAL,
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Minimum time between two reminder rounds for the same task.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Start the background reminder loop.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval);

            loop {
                ticker.tick().await;

                match self.run_once(Utc::now()).await {
                    Ok(report) => tracing::info!(
                        tasks_reminded = report.tasks_reminded,
                        tasks_in_cooldown = report.tasks_in_cooldown,
                        sent = report.sent,
                        failed = report.failed,
                        "Reminder check completed"
                    ),
                    Err(e) => tracing::error!(error = %e, "Reminder check failed"),
                }
            }
        })
    }

    /// One pass over every task whose reminder window is open at `now`.
    #[tracing::instrument(skip(self), fields(reminder.operation = "run_once"))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<ReminderRunReport, AppError> {
        let mut report = ReminderRunReport::default();

        for task in self.tasks.list_auto_remind_tasks(now).await? {
            if !task.is_reminder_due(now) {
                continue;
            }

            if self.in_cooldown(&task, now).await? {
                report.tasks_in_cooldown += 1;
                continue;
            }

            let pending = match self.intake.unsubmitted_members(task.id).await {
                Ok(pending) => pending,
                Err(e) => {
                    tracing::error!(task_id = %task.id, error = %e, "Failed to load unsubmitted members");
                    continue;
                }
            };
            if pending.is_empty() {
                continue;
            }

            tracing::info!(
                task_id = %task.id,
                members = pending.len(),
                "Sending submission reminders"
            );
            report.tasks_reminded += 1;

            for member in &pending {
                if self.remind(&task, member).await {
                    report.sent += 1;
                } else {
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn in_cooldown(&self, task: &Task, now: DateTime<Utc>) -> Result<bool, AppError> {
        let Some(last) = self.logs.last_sent_at(task.id).await? else {
            return Ok(false);
        };
        Ok((now - last)
            .to_std()
            .map(|elapsed| elapsed < self.cooldown)
            .unwrap_or(true))
    }

    /// Notify one member and record the attempt. Returns whether it was sent.
    async fn remind(&self, task: &Task, member: &MemberSummary) -> bool {
        let result = match member.email.as_deref() {
            None => Err("Member has no email address".to_string()),
            Some(_) => self
                .notifier
                .notify(task, member)
                .await
                .map_err(|e| e.to_string()),
        };

        let (status, error_message) = match &result {
            Ok(()) => (ReminderStatus::Sent, None),
            Err(message) => (ReminderStatus::Failed, Some(message.as_str())),
        };

        if let Err(e) = self
            .logs
            .record(
                task.id,
                member.id,
                member.email.as_deref(),
                status,
                error_message,
            )
            .await
        {
            tracing::warn!(
                task_id = %task.id,
                member_id = %member.id,
                error = %e,
                "Failed to record reminder"
            );
        }

        if let Err(message) = &result {
            tracing::warn!(
                task_id = %task.id,
                member_id = %member.id,
                reason = %message,
                "Reminder not sent"
            );
        }

        result.is_ok()
    }
}
