use axum::{extract::State, Json};

use crate::{
    models::{
        seat::{Seat, SeatAvailability},
        student::Student,
    },
    routes::{today, with_fallback, ApiResult},
    services::{fallback, seats, students::StudentService, ServiceError},
    AppState,
};

async fn current_students(state: &AppState) -> Result<Vec<Student>, ServiceError> {
    StudentService::list(state.pool()?).await
}

/// GET /api/seats
pub async fn list_seats(State(state): State<AppState>) -> ApiResult<Json<Vec<Seat>>> {
    let students = with_fallback(&state, "seats", current_students(&state).await, || {
        Ok(fallback::sample_students(today()))
    })?;
    Ok(Json(seats::derive_seats(&students)))
}

/// GET /api/seats-availability
pub async fn seat_availability(
    State(state): State<AppState>,
) -> ApiResult<Json<SeatAvailability>> {
    let students = with_fallback(
        &state,
        "seats-availability",
        current_students(&state).await,
        || Ok(fallback::sample_students(today())),
    )?;
    Ok(Json(seats::summarize(&seats::derive_seats(&students))))
}
