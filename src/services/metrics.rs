use chrono::Local;
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, CounterVec, Gauge, GaugeVec,
};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    models::seat::SeatStatus,
    services::{payments::PaymentService, seats, students::StudentService, ServiceError},
};

lazy_static! {
    // ── Event counters ──────────────────────────────────────────────────────
    pub static ref FALLBACK_COUNTER: CounterVec = register_counter_vec!(
        "api_fallback_responses_total",
        "Responses served from sample data, by resource",
        &["resource"]
    ).unwrap();

    pub static ref WHATSAPP_COUNTER: CounterVec = register_counter_vec!(
        "whatsapp_messages_total",
        "WhatsApp template messages by kind and outcome",
        &["kind", "outcome"]
    ).unwrap();

    // ── Business metrics ────────────────────────────────────────────────────
    pub static ref STUDENTS_GAUGE: GaugeVec = register_gauge_vec!(
        "library_students_total",
        "Students by status",
        &["status"]
    ).unwrap();

    pub static ref SEATS_OCCUPIED_GAUGE: Gauge = register_gauge!(
        "library_seats_occupied",
        "Seats fully occupied (full-day or both half-day slots)"
    ).unwrap();

    pub static ref PAYMENTS_GAUGE: GaugeVec = register_gauge_vec!(
        "library_payments_total",
        "Payments by status for the current due month",
        &["status"]
    ).unwrap();
}

/// Spawn the background collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
        }
    });
}

async fn collect(pool: &PgPool) -> Result<(), ServiceError> {
    let students = StudentService::list(pool).await?;

    STUDENTS_GAUGE.reset();
    for student in &students {
        STUDENTS_GAUGE
            .with_label_values(&[student.status.as_str()])
            .inc();
    }

    let occupied = seats::derive_seats(&students)
        .iter()
        .filter(|s| matches!(s.status, SeatStatus::Full | SeatStatus::HalfShared))
        .count();
    SEATS_OCCUPIED_GAUGE.set(occupied as f64);

    let due_date = crate::services::billing::due_date_for(Local::now().date_naive());
    PAYMENTS_GAUGE.reset();
    for payment in PaymentService::list(pool)
        .await?
        .iter()
        .filter(|p| p.due_date == due_date)
    {
        PAYMENTS_GAUGE
            .with_label_values(&[payment.status.as_str()])
            .inc();
    }

    info!("Metrics: collected for {} student(s)", students.len());
    Ok(())
}
