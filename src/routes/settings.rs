use axum::{extract::State, Json};
use serde_json::Value;

use crate::{
    models::settings::Settings,
    routes::{with_fallback, ApiJson, ApiResult},
    services::settings::{apply_patch, SettingsService},
    AppState,
};

/// GET /api/settings: created with defaults on first read
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<Settings>> {
    let result = async { SettingsService::get_or_init(state.pool()?).await }.await;
    with_fallback(&state, "settings", result, || Ok(Settings::default())).map(Json)
}

/// PUT /api/settings: deep-merges the body into the stored document
pub async fn update_settings(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Json<Settings>> {
    let result = async { SettingsService::update(state.pool()?, body.clone()).await }.await;
    with_fallback(&state, "settings", result, || {
        apply_patch(&Settings::default(), body)
    })
    .map(Json)
}
