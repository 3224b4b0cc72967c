use axum::http::{header, StatusCode};
use prometheus::{Encoder, TextEncoder};

use crate::services::metrics::{
    FALLBACK_COUNTER, PAYMENTS_GAUGE, SEATS_OCCUPIED_GAUGE, STUDENTS_GAUGE, WHATSAPP_COUNTER,
};

/// GET /metrics: Prometheus text exposition of every registered metric
pub async fn metrics_handler() -> Result<([(header::HeaderName, String); 1], String), StatusCode> {
    // Registration is lazy; touch each metric so the families exist before
    // their first event.
    lazy_static::initialize(&FALLBACK_COUNTER);
    lazy_static::initialize(&WHATSAPP_COUNTER);
    lazy_static::initialize(&STUDENTS_GAUGE);
    lazy_static::initialize(&SEATS_OCCUPIED_GAUGE);
    lazy_static::initialize(&PAYMENTS_GAUGE);

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let body = String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], body))
}
