use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{
    config::WhatsAppConfig,
    models::{
        settings::Settings,
        whatsapp::{GatewayPayload, MessageKind, Notification, SendReceipt},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    #[error("WhatsApp notifications are disabled in settings")]
    ChannelDisabled,
    #[error("{} messages are disabled in settings", .0.as_str())]
    KindDisabled(MessageKind),
    #[error("WhatsApp gateway credentials are not configured")]
    NotConfigured,
    #[error("Invalid phone number: {0:?}")]
    InvalidPhone(String),
    #[error("WhatsApp gateway returned {status}")]
    Gateway { status: u16, body: String },
    #[error("WhatsApp gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl WhatsAppError {
    /// Errors caused by the request or local configuration rather than the
    /// gateway.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, WhatsAppError::Gateway { .. } | WhatsAppError::Http(_))
    }
}

/// Strips everything but digits and prefixes the country code onto bare
/// 10-digit numbers.
pub fn format_phone(raw: &str, country_code: &str) -> Result<String, WhatsAppError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        0 => Err(WhatsAppError::InvalidPhone(raw.to_string())),
        10 => Ok(format!("{country_code}{digits}")),
        _ => Ok(digits),
    }
}

/// Checks the per-kind switches in settings before anything leaves the box.
pub fn ensure_enabled(settings: &Settings, kind: MessageKind) -> Result<(), WhatsAppError> {
    let flags = &settings.notifications;
    if !flags.whatsapp_enabled {
        return Err(WhatsAppError::ChannelDisabled);
    }
    let enabled = match kind {
        MessageKind::Welcome => flags.welcome_message_enabled,
        MessageKind::Reminder => flags.auto_reminder_enabled,
    };
    if enabled {
        Ok(())
    } else {
        Err(WhatsAppError::KindDisabled(kind))
    }
}

pub struct WhatsAppService {
    client: Client,
    config: WhatsAppConfig,
}

impl WhatsAppService {
    pub fn new(config: WhatsAppConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { client, config })
    }

    /// Gateway credentials, or `NotConfigured` when either is missing.
    pub fn credentials(&self) -> Result<(&str, &str), WhatsAppError> {
        match (&self.config.username, &self.config.secret) {
            (Some(username), Some(secret)) => Ok((username.as_str(), secret.as_str())),
            _ => Err(WhatsAppError::NotConfigured),
        }
    }

    pub fn build_payload(
        &self,
        settings: &Settings,
        notification: &Notification,
        to: &str,
    ) -> Result<GatewayPayload, WhatsAppError> {
        let template_id = match notification.kind() {
            MessageKind::Welcome => &self.config.welcome_template_id,
            MessageKind::Reminder => &self.config.reminder_template_id,
        };
        let from = settings
            .notifications
            .sender_number
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.config.sender_number.clone());

        Ok(GatewayPayload {
            from,
            to: format_phone(to, &self.config.default_country_code)?,
            template_id: template_id.clone(),
            variables: notification.variables(),
        })
    }

    /// Sends one template message. Gates and phone validation run before any
    /// network I/O; a non-2xx answer from the gateway is returned as
    /// [`WhatsAppError::Gateway`]. No retries.
    pub async fn send(
        &self,
        settings: &Settings,
        notification: &Notification,
        to: &str,
    ) -> Result<SendReceipt, WhatsAppError> {
        let kind = notification.kind();
        ensure_enabled(settings, kind)?;
        let (username, secret) = self.credentials()?;
        let payload = self.build_payload(settings, notification, to)?;

        let response = self
            .client
            .post(&self.config.api_url)
            .basic_auth(username, Some(secret))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(kind = kind.as_str(), to = %payload.to, "WhatsApp gateway error {status}: {body}");
            return Err(WhatsAppError::Gateway {
                status: status.as_u16(),
                body,
            });
        }

        let message_id = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| {
                body.get("messageId")
                    .or_else(|| body.get("id"))
                    .and_then(|id| match id {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
            });

        tracing::info!(kind = kind.as_str(), to = %payload.to, "WhatsApp message sent");
        Ok(SendReceipt {
            success: true,
            kind,
            to: payload.to,
            message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_digit_numbers_get_the_country_code() {
        assert_eq!(format_phone("(987) 654-3210", "91").unwrap(), "919876543210");
        assert_eq!(format_phone("98765 43210", "44").unwrap(), "449876543210");
    }

    #[test]
    fn other_lengths_are_kept() {
        assert_eq!(format_phone("+91 98765 43210", "91").unwrap(), "919876543210");
        assert_eq!(format_phone("12345", "91").unwrap(), "12345");
    }

    #[test]
    fn empty_numbers_are_invalid() {
        assert!(matches!(
            format_phone("n/a", "91"),
            Err(WhatsAppError::InvalidPhone(_))
        ));
    }

    #[test]
    fn gates_follow_settings() {
        let mut settings = Settings::default();
        assert!(ensure_enabled(&settings, MessageKind::Reminder).is_ok());

        settings.notifications.auto_reminder_enabled = false;
        assert!(matches!(
            ensure_enabled(&settings, MessageKind::Reminder),
            Err(WhatsAppError::KindDisabled(MessageKind::Reminder))
        ));
        assert!(ensure_enabled(&settings, MessageKind::Welcome).is_ok());

        settings.notifications.whatsapp_enabled = false;
        assert!(matches!(
            ensure_enabled(&settings, MessageKind::Welcome),
            Err(WhatsAppError::ChannelDisabled)
        ));
    }

    #[test]
    fn disabled_kind_message_names_the_kind() {
        let err = WhatsAppError::KindDisabled(MessageKind::Reminder);
        assert_eq!(err.to_string(), "reminder messages are disabled in settings");
        assert!(err.is_rejection());
    }
}
