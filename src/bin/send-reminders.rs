//! One reminder sweep, for cron.
//!
//! Usage: send-reminders [--days N] [--dry-run]
//!   --days N   : window in days (default: notifications.reminderDaysBefore)
//!   --dry-run  : only count the students who would be reminded

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;

use library_seats_api::{
    config::Config,
    db,
    services::{
        reminders, settings::SettingsService, students::StudentService, whatsapp::WhatsAppService,
    },
};

#[derive(Parser)]
#[command(name = "send-reminders", about = "Send WhatsApp reminders for expiring subscriptions")]
struct Args {
    /// Days ahead to look for ending subscriptions
    #[arg(long)]
    days: Option<u32>,
    /// Report candidates without sending anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL required")?;

    let pool = db::create_pool(database_url)?;
    let settings = SettingsService::get_or_init(&pool)
        .await
        .context("Failed to load settings")?;
    let students = StudentService::list(&pool)
        .await
        .context("Failed to load students")?;
    let whatsapp = WhatsAppService::new(config.whatsapp.clone())?;

    tracing::info!("Starting reminder sweep over {} student(s)", students.len());
    let report = reminders::run_sweep(
        &whatsapp,
        &settings,
        &students,
        Local::now().date_naive(),
        args.days,
        args.dry_run,
    )
    .await?;

    for failure in &report.failures {
        tracing::error!("Reminder to {} ({}) failed: {}", failure.name, failure.student_id, failure.error);
    }
    tracing::info!(
        "Sweep done: {} candidate(s), {} sent, {} failed{}",
        report.candidates,
        report.sent,
        report.failed,
        if report.dry_run { " (dry run)" } else { "" }
    );

    Ok(())
}
