use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    models::{
        payment::{CreatePaymentRequest, Payment, UpdatePaymentRequest},
        settings::FeeDefaults,
        student::IdQuery,
    },
    routes::{error, today, with_fallback, ApiJson, ApiResult},
    services::{
        fallback, payments::PaymentService, settings::SettingsService, ServiceError,
    },
    AppState,
};

async fn fee_defaults(state: &AppState) -> Result<FeeDefaults, ServiceError> {
    let pool = state.pool()?;
    Ok(SettingsService::get_or_init(pool).await?.fees)
}

/// GET /api/payments: re-derives the current month's rows, then lists all
pub async fn list_payments(State(state): State<AppState>) -> ApiResult<Json<Vec<Payment>>> {
    let today = today();
    let result = async {
        let fees = fee_defaults(&state).await?;
        PaymentService::list_synced(state.pool()?, today, &fees).await
    }
    .await;

    with_fallback(&state, "payments", result, || {
        Ok(fallback::sample_payments(today, &FeeDefaults::default()))
    })
    .map(Json)
}

/// POST /api/payments
pub async fn create_payment(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    let today = today();
    let result = async {
        let fees = fee_defaults(&state).await?;
        PaymentService::create(state.pool()?, body.clone(), today, &fees).await
    }
    .await;

    let payment = with_fallback(&state, "payments", result, || {
        fallback::echo_created_payment(today, body, &FeeDefaults::default())
    })?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// PUT /api/payments?id=: the id may also be sent in the body
pub async fn update_payment(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    ApiJson(body): ApiJson<UpdatePaymentRequest>,
) -> ApiResult<Json<Payment>> {
    let Some(id) = query.id.or(body.id) else {
        return Err(error(StatusCode::BAD_REQUEST, "Payment ID is required"));
    };
    let today = today();

    let result = async {
        PaymentService::update(state.pool()?, id, body.clone(), today).await
    }
    .await;

    with_fallback(&state, "payments", result, || {
        fallback::echo_updated_payment(today, id, body, &FeeDefaults::default())
    })
    .map(Json)
}
