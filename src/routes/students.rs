use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::{
    models::student::{CreateStudentRequest, IdQuery, Student, UpdateStudentRequest},
    routes::{error, today, with_fallback, ApiJson, ApiResult},
    services::{fallback, students::StudentService, ServiceError},
    AppState,
};

/// GET /api/students[?id=]: the whole list, or one student
pub async fn get_students(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Response> {
    let result = async {
        let pool = state.pool()?;
        Ok::<_, ServiceError>(match query.id {
            Some(id) => Json(StudentService::get(pool, id).await?).into_response(),
            None => Json(StudentService::list(pool).await?).into_response(),
        })
    }
    .await;

    with_fallback(&state, "students", result, || match query.id {
        Some(id) => Ok(Json(fallback::sample_student(today(), id)?).into_response()),
        None => Ok(Json(fallback::sample_students(today())).into_response()),
    })
}

/// POST /api/students
pub async fn create_student(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateStudentRequest>,
) -> ApiResult<(StatusCode, Json<Student>)> {
    let result = async {
        let pool = state.pool()?;
        StudentService::create(pool, body.clone()).await
    }
    .await;

    let student = with_fallback(&state, "students", result, || {
        fallback::echo_created_student(today(), body)
    })?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// PUT /api/students?id=: the id may also be sent in the body
pub async fn update_student(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    ApiJson(body): ApiJson<UpdateStudentRequest>,
) -> ApiResult<Json<Student>> {
    let Some(id) = query.id.or(body.id) else {
        return Err(error(StatusCode::BAD_REQUEST, "Student ID is required"));
    };

    let result = async {
        let pool = state.pool()?;
        StudentService::update(pool, id, body.clone()).await
    }
    .await;

    let student = with_fallback(&state, "students", result, || {
        fallback::echo_updated_student(today(), id, body)
    })?;
    Ok(Json(student))
}

/// DELETE /api/students?id=
pub async fn delete_student(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Json<Value>> {
    let Some(id) = query.id else {
        return Err(error(StatusCode::BAD_REQUEST, "Student ID is required"));
    };

    let result = async {
        let pool = state.pool()?;
        StudentService::delete(pool, id).await
    }
    .await;

    with_fallback(&state, "students", result, || Ok(()))?;
    Ok(Json(json!({ "message": "Student deleted successfully", "id": id })))
}
