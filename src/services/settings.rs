use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::{
    models::settings::{merge_json, Settings, APP_SETTINGS},
    services::ServiceError,
};

pub struct SettingsService;

/// Deep-merges a partial settings document into `current` and validates the
/// result.
pub fn apply_patch(current: &Settings, patch: Value) -> Result<Settings, ServiceError> {
    if !patch.is_object() {
        return Err(ServiceError::Validation("Settings body must be a JSON object".into()));
    }
    let mut doc = serde_json::to_value(Settings {
        updated_at: None,
        ..current.clone()
    })
    .map_err(|e| ServiceError::Validation(e.to_string()))?;
    merge_json(&mut doc, patch);

    let mut merged: Settings = serde_json::from_value(doc)
        .map_err(|e| ServiceError::Validation(format!("Invalid settings: {e}")))?;
    merged.updated_at = None;
    merged.validate().map_err(ServiceError::Validation)?;
    Ok(merged)
}

impl SettingsService {
    /// Returns the singleton settings document, creating it with defaults on
    /// first read.
    pub async fn get_or_init(pool: &PgPool) -> Result<Settings, ServiceError> {
        let row: Option<(Value, DateTime<Utc>)> =
            sqlx::query_as("SELECT data, updated_at FROM settings WHERE type = $1")
                .bind(APP_SETTINGS)
                .fetch_optional(pool)
                .await?;

        match row {
            Some((data, updated_at)) => {
                let mut settings = serde_json::from_value::<Settings>(data).unwrap_or_else(|e| {
                    tracing::warn!("stored settings unreadable, using defaults: {e}");
                    Settings::default()
                });
                settings.updated_at = Some(updated_at);
                Ok(settings)
            }
            None => {
                let defaults = Settings::default();
                let data = serde_json::to_value(&defaults)
                    .map_err(|e| ServiceError::Validation(e.to_string()))?;
                sqlx::query(
                    "INSERT INTO settings (type, data) VALUES ($1, $2)
                     ON CONFLICT (type) DO NOTHING",
                )
                .bind(APP_SETTINGS)
                .bind(data)
                .execute(pool)
                .await?;
                tracing::info!("created default settings document");
                Ok(defaults)
            }
        }
    }

    pub async fn update(pool: &PgPool, patch: Value) -> Result<Settings, ServiceError> {
        let current = Self::get_or_init(pool).await?;
        let mut settings = apply_patch(&current, patch)?;
        let data = serde_json::to_value(&settings)
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        let updated_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO settings (type, data) VALUES ($1, $2)
             ON CONFLICT (type) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
             RETURNING updated_at",
        )
        .bind(APP_SETTINGS)
        .bind(data)
        .fetch_one(pool)
        .await?;

        settings.updated_at = Some(updated_at);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_merges_nested_sections() {
        let current = Settings::default();
        let updated = apply_patch(
            &current,
            json!({ "wifi": { "ssid": "Reading-Room", "password": "quiet" },
                    "notifications": { "autoReminderEnabled": false } }),
        )
        .unwrap();
        assert_eq!(updated.wifi.ssid, "Reading-Room");
        assert!(!updated.notifications.auto_reminder_enabled);
        assert!(updated.notifications.whatsapp_enabled);
        assert_eq!(updated.fees, current.fees);
    }

    #[test]
    fn patch_must_be_an_object() {
        assert!(matches!(
            apply_patch(&Settings::default(), json!([1, 2])),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn patch_with_wrong_types_is_rejected() {
        let result = apply_patch(
            &Settings::default(),
            json!({ "fees": { "fullDayFee": "a lot" } }),
        );
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }
}
