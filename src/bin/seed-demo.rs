//! Loads the sample students into the database.
//!
//! Usage:
//!   DATABASE_URL=... ./seed-demo [--reset]
//!
//! The students are the same ones the API serves as fallback data, so a
//! seeded database and a database-less demo look alike.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;

use library_seats_api::{
    db,
    services::{fallback::sample_students, settings::SettingsService},
};

#[derive(Parser)]
#[command(name = "seed-demo", about = "Seed the library database with sample students")]
struct Args {
    /// Delete every student (and their payments) before seeding
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL required")?;

    let pool = db::create_pool(&database_url)?;
    db::run_migrations(&pool)
        .await
        .context("Failed to apply migrations")?;

    if args.reset {
        let removed = sqlx::query("DELETE FROM students")
            .execute(&pool)
            .await
            .context("Failed to clear students")?
            .rows_affected();
        tracing::info!("Removed {} existing student(s)", removed);
    }

    SettingsService::get_or_init(&pool)
        .await
        .context("Failed to initialise settings")?;

    let mut inserted = 0;
    for student in sample_students(Local::now().date_naive()) {
        let result = sqlx::query(
            "INSERT INTO students (id, name, email, mobile, plan_type, day_type, half_day_slot,
                                   seat_number, status, subscription_start_date,
                                   subscription_end_date, currency, monthly_amount,
                                   half_day_amount, full_day_amount, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(student.id)
        .bind(&student.name)
        .bind(&student.email)
        .bind(&student.mobile)
        .bind(student.plan_type)
        .bind(student.day_type)
        .bind(student.half_day_slot)
        .bind(student.seat_number)
        .bind(student.status)
        .bind(student.subscription_start_date)
        .bind(student.subscription_end_date)
        .bind(student.currency)
        .bind(student.monthly_amount)
        .bind(student.half_day_amount)
        .bind(student.full_day_amount)
        .bind(student.created_at)
        .execute(&pool)
        .await
        .with_context(|| format!("Failed to insert {}", student.name))?;
        inserted += result.rows_affected();
    }

    tracing::info!("Seeded {} sample student(s)", inserted);
    Ok(())
}
