use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::json;

use crate::{
    models::{
        settings::Settings,
        whatsapp::{
            MessageKind, Notification, ReminderSweepReport, ReminderSweepRequest,
            SendMessageRequest, SendReceipt,
        },
    },
    routes::{error, service_error, today, with_fallback, ApiError, ApiJson, ApiResult},
    services::{
        billing, metrics::WHATSAPP_COUNTER, reminders, settings::SettingsService,
        students::StudentService, whatsapp::WhatsAppError,
    },
    AppState,
};

fn whatsapp_error(e: WhatsAppError) -> ApiError {
    match e {
        WhatsAppError::Gateway { status, body } => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": format!("WhatsApp gateway returned {status}"),
                "status": status,
                "details": body,
            })),
        ),
        e if e.is_rejection() => error(StatusCode::BAD_REQUEST, e.to_string()),
        e => error(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

/// Builds the template message from the request, filling WiFi details and
/// defaults from settings.
pub fn notification_for(
    req: &SendMessageRequest,
    settings: &Settings,
) -> Result<Notification, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "Recipient name is required"));
    }

    Ok(match req.kind {
        MessageKind::Welcome => Notification::Welcome {
            name: name.to_string(),
            seat_number: req.seat_number,
            wifi_ssid: settings.wifi.ssid.clone(),
            wifi_password: settings.wifi.password.clone(),
        },
        MessageKind::Reminder => {
            let Some(amount) = req.amount.filter(|a| a.is_finite() && *a >= 0.0) else {
                return Err(error(
                    StatusCode::BAD_REQUEST,
                    "A non-negative amount is required for reminders",
                ));
            };
            Notification::Reminder {
                name: name.to_string(),
                amount,
                currency: req.currency.unwrap_or(settings.fees.currency),
                due_date: req
                    .due_date
                    .unwrap_or_else(|| billing::due_date_for(today())),
            }
        }
    })
}

/// POST /api/whatsapp: send one `welcome` or `reminder` template message
pub async fn send_message(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SendMessageRequest>,
) -> ApiResult<Json<SendReceipt>> {
    let result = async { SettingsService::get_or_init(state.pool()?).await }.await;
    let settings = with_fallback(&state, "settings", result, || Ok(Settings::default()))?;

    let notification = notification_for(&body, &settings)?;
    let kind = notification.kind().as_str();

    match state.whatsapp.send(&settings, &notification, &body.to).await {
        Ok(receipt) => {
            WHATSAPP_COUNTER.with_label_values(&[kind, "sent"]).inc();
            Ok(Json(receipt))
        }
        Err(e) => {
            let outcome = if e.is_rejection() { "rejected" } else { "failed" };
            WHATSAPP_COUNTER.with_label_values(&[kind, outcome]).inc();
            Err(whatsapp_error(e))
        }
    }
}

/// POST /api/whatsapp/reminders: remind every student whose subscription
/// ends within the window. Needs a live database.
pub async fn send_reminders(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ReminderSweepReport>> {
    let req: ReminderSweepRequest = if body.is_empty() {
        ReminderSweepRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| error(StatusCode::BAD_REQUEST, format!("Invalid body: {e}")))?
    };

    let pool = state.pool().map_err(service_error)?;
    let settings = SettingsService::get_or_init(pool)
        .await
        .map_err(service_error)?;
    let students = StudentService::list(pool).await.map_err(service_error)?;

    reminders::run_sweep(
        &state.whatsapp,
        &settings,
        &students,
        today(),
        req.days_before,
        req.dry_run,
    )
    .await
    .map(Json)
    .map_err(whatsapp_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: serde_json::Value) -> SendMessageRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn welcome_carries_wifi_details() {
        let mut settings = Settings::default();
        settings.wifi.ssid = "Library".into();
        settings.wifi.password = "books123".into();
        let n = notification_for(
            &request(json!({ "type": "welcome", "to": "9876543210", "name": "Om", "seatNumber": 12 })),
            &settings,
        )
        .unwrap();
        assert_eq!(n.variables(), vec!["Om", "12", "Library", "books123"]);
    }

    #[test]
    fn reminder_requires_an_amount() {
        let err = notification_for(
            &request(json!({ "type": "reminder", "to": "9876543210", "name": "Om" })),
            &Settings::default(),
        )
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn gateway_failures_map_to_bad_gateway() {
        let (status, Json(body)) = whatsapp_error(WhatsAppError::Gateway {
            status: 401,
            body: "bad credentials".into(),
        });
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["status"], 401);
        assert_eq!(body["details"], "bad credentials");

        let (status, _) = whatsapp_error(WhatsAppError::KindDisabled(MessageKind::Reminder));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
