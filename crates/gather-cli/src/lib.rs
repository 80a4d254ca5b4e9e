use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use gather_core::Config;
use gather_db::{
    setup_database, PostgresMemberRepository, PostgresReminderLogRepository,
    PostgresSubmissionRepository, PostgresTaskRepository,
};
use gather_services::{ExportService, LoggingNotifier, ReminderService, SubmissionService};
use gather_storage::create_storage;

/// Engines wired against PostgreSQL and the configured storage backend.
pub struct AppContext {
    pub config: Config,
    pub intake: Arc<SubmissionService>,
    pub export: Arc<ExportService>,
    pub reminders: Arc<ReminderService>,
}

impl AppContext {
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        config.validate().context("Invalid configuration")?;

        let pool = setup_database(&config).await?;
        let storage = create_storage(&config)
            .await
            .context("Failed to initialize storage")?;

        let tasks = Arc::new(PostgresTaskRepository::new(pool.clone()));
        let members = Arc::new(PostgresMemberRepository::new(pool.clone()));
        let submissions = Arc::new(PostgresSubmissionRepository::new(pool.clone()));
        let reminder_logs = Arc::new(PostgresReminderLogRepository::new(pool));

        let intake = Arc::new(
            SubmissionService::new(
                tasks.clone(),
                members.clone(),
                submissions.clone(),
                storage.clone(),
            )
            .with_max_file_size(config.max_file_size_bytes()),
        );
        let export = Arc::new(
            ExportService::new(tasks.clone(), members, submissions, storage)
                .with_default_naming_format(config.default_naming_format()),
        );
        let reminders = Arc::new(
            ReminderService::new(tasks, intake.clone(), reminder_logs, Arc::new(LoggingNotifier))
                .with_interval(Duration::from_secs(config.reminder_interval_secs()))
                .with_cooldown(Duration::from_secs(config.reminder_cooldown_secs())),
        );

        Ok(Self {
            config,
            intake,
            export,
            reminders,
        })
    }
}

/// Truncate to `max_chars` characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Initialize tracing for the CLI. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_telemetry() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gather=debug,info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}
