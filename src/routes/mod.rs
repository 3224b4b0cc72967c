pub mod health;
pub mod metrics;
pub mod payments;
pub mod seats;
pub mod settings;
pub mod students;
pub mod whatsapp;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};

use crate::{
    services::{metrics::FALLBACK_COUNTER, ServiceError},
    AppState,
};

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult<T> = Result<T, ApiError>;

pub fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

pub fn service_error(e: ServiceError) -> ApiError {
    let status = match &e {
        ServiceError::Validation(_) | ServiceError::SeatConflict(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::NoDatabase => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("request failed: {e}");
    }
    error(status, e.to_string())
}

/// `Json` body extractor whose rejections use the API's `{"error": ..}`
/// shape with status 400.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(error(StatusCode::BAD_REQUEST, rejection.body_text())),
        }
    }
}

/// Local calendar date used for due dates and status derivation.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Returns the primary-path result, or, for storage failures while fallback
/// is enabled, the sample payload built by `fallback`. Request errors
/// (validation, not found) always pass through.
pub fn with_fallback<T>(
    state: &AppState,
    resource: &'static str,
    result: Result<T, ServiceError>,
    fallback: impl FnOnce() -> Result<T, ServiceError>,
) -> ApiResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_storage() && state.config.fallback_enabled => {
            tracing::warn!(resource, "serving fallback data: {e}");
            FALLBACK_COUNTER.with_label_values(&[resource]).inc();
            fallback().map_err(service_error)
        }
        Err(e) => Err(service_error(e)),
    }
}
