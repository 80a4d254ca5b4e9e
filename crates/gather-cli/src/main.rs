//! Gather CLI: operator commands against the submission database.
//!
//! Reads the same environment as the services (DATABASE_URL, LOCAL_STORAGE_PATH, ...).

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use gather_cli::{init_telemetry, truncate_string, AppContext};
use gather_core::Config;
use gather_services::CancellationToken;
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "gather", about = "Gather submission tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a task's submissions as a ZIP archive (one folder per member)
    Export {
        /// Task UUID
        task: Uuid,
        /// Only export these members (comma separated UUIDs)
        #[arg(long, value_delimiter = ',')]
        members: Vec<Uuid>,
        /// Folder naming template, e.g. "{student_id}_{name}"
        #[arg(long)]
        naming: Option<String>,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Show the folders and files an export would produce
    Preview {
        /// Task UUID
        task: Uuid,
        #[arg(long)]
        naming: Option<String>,
    },
    /// Write every text submission of a task into one document
    ExportTexts {
        /// Task UUID
        task: Uuid,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Submission statistics for a task
    Stats {
        /// Task UUID
        task: Uuid,
    },
    /// Members who have not submitted anything for a task
    Unsubmitted {
        /// Task UUID
        task: Uuid,
        /// Output format: json or table
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Run deadline reminders
    Remind {
        /// Run a single pass instead of the periodic loop
        #[arg(long)]
        once: bool,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Write through a temporary file in the target directory and move it into
/// place once complete.
fn write_output(dir: &Path, filename: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).context("Failed to create temp file")?;
    tmp.write_all(bytes).context("Failed to write output")?;
    tmp.as_file().sync_all().context("Failed to sync output")?;

    let target = dir.join(filename);
    tmp.persist(&target)
        .with_context(|| format!("Failed to move output to {}", target.display()))?;
    Ok(target)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry();
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    let ctx = AppContext::from_config(config).await?;

    match cli.command {
        Commands::Export {
            task,
            members,
            naming,
            out,
        } => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let filter = (!members.is_empty()).then_some(members.as_slice());
            let archive = ctx
                .export
                .export_task_cancellable(task, filter, naming.as_deref(), &cancel)
                .await?;

            let path = write_output(&out, &archive.filename, &archive.bytes)?;
            print_json(&serde_json::json!({
                "path": path,
                "file_count": archive.file_count,
                "total_bytes": archive.total_bytes,
                "archive_bytes": archive.bytes.len(),
            }))?;
        }
        Commands::Preview { task, naming } => {
            let preview = ctx.export.preview(task, None, naming.as_deref()).await?;
            print_json(&preview)?;
        }
        Commands::ExportTexts { task, out } => {
            let export = ctx.export.export_texts(task).await?;
            let path = write_output(&out, &export.filename, &export.bytes)?;
            print_json(&serde_json::json!({ "path": path }))?;
        }
        Commands::Stats { task } => {
            let stats = ctx.intake.task_stats(task).await?;
            print_json(&stats)?;
        }
        Commands::Unsubmitted { task, format } => {
            let members = ctx.intake.unsubmitted_members(task).await?;
            match format.as_str() {
                "json" => print_json(&members)?,
                _ => {
                    println!("{:<16} {:<24} EMAIL", "STUDENT ID", "NAME");
                    for member in &members {
                        println!(
                            "{:<16} {:<24} {}",
                            truncate_string(&member.student_id, 16),
                            truncate_string(&member.name, 24),
                            member.email.as_deref().unwrap_or("-")
                        );
                    }
                    println!("{} member(s) without a submission", members.len());
                }
            }
        }
        Commands::Remind { once } => {
            if once {
                let report = ctx.reminders.run_once(chrono::Utc::now()).await?;
                tracing::info!(
                    tasks_reminded = report.tasks_reminded,
                    sent = report.sent,
                    failed = report.failed,
                    "Reminder pass finished"
                );
            } else {
                tracing::info!(
                    environment = %ctx.config.environment(),
                    interval_secs = ctx.config.reminder_interval_secs(),
                    "Starting reminder loop"
                );
                let handle = ctx.reminders.clone().start();
                tokio::select! {
                    result = handle => result.context("Reminder loop stopped")?,
                    _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down reminder loop"),
                }
            }
        }
    }

    Ok(())
}
