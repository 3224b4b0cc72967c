use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::student::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Welcome,
    Reminder,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Welcome => "welcome",
            MessageKind::Reminder => "reminder",
        }
    }
}

/// Body of POST /api/whatsapp.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(alias = "phone", alias = "mobile")]
    pub to: String,
    #[serde(alias = "studentName")]
    pub name: String,
    pub seat_number: Option<i32>,
    pub amount: Option<f64>,
    pub currency: Option<Currency>,
    pub due_date: Option<NaiveDate>,
}

/// A fully resolved template message, ready to be turned into a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Welcome {
        name: String,
        seat_number: Option<i32>,
        wifi_ssid: String,
        wifi_password: String,
    },
    Reminder {
        name: String,
        amount: f64,
        currency: Currency,
        due_date: NaiveDate,
    },
}

impl Notification {
    pub fn kind(&self) -> MessageKind {
        match self {
            Notification::Welcome { .. } => MessageKind::Welcome,
            Notification::Reminder { .. } => MessageKind::Reminder,
        }
    }

    /// Positional template variables, in the order the templates expect.
    pub fn variables(&self) -> Vec<String> {
        match self {
            Notification::Welcome {
                name,
                seat_number,
                wifi_ssid,
                wifi_password,
            } => vec![
                name.clone(),
                seat_number
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "Not assigned".into()),
                wifi_ssid.clone(),
                wifi_password.clone(),
            ],
            Notification::Reminder {
                name,
                amount,
                currency,
                due_date,
            } => vec![
                name.clone(),
                format!("{}{:.2}", currency.symbol(), amount),
                due_date.format("%d/%m/%Y").to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPayload {
    pub from: String,
    pub to: String,
    pub template_id: String,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub success: bool,
    pub kind: MessageKind,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// Options for a reminder sweep over expiring subscriptions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSweepRequest {
    /// Overrides `notifications.reminderDaysBefore`.
    pub days_before: Option<u32>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSweepReport {
    pub candidates: usize,
    pub sent: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub failures: Vec<ReminderFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderFailure {
    pub student_id: Uuid,
    pub name: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_variables_format_amount_and_date() {
        let n = Notification::Reminder {
            name: "Anil".into(),
            amount: 1200.0,
            currency: Currency::Inr,
            due_date: NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(),
        };
        assert_eq!(n.variables(), vec!["Anil", "₹1200.00", "15/05/2024"]);
        assert_eq!(n.kind(), MessageKind::Reminder);
    }

    #[test]
    fn welcome_without_seat_says_so() {
        let n = Notification::Welcome {
            name: "Tara".into(),
            seat_number: None,
            wifi_ssid: "Lib".into(),
            wifi_password: "secret".into(),
        };
        assert_eq!(n.variables(), vec!["Tara", "Not assigned", "Lib", "secret"]);
    }

    #[test]
    fn request_accepts_phone_aliases() {
        let req: SendMessageRequest = serde_json::from_str(
            r#"{"type": "welcome", "mobile": "9876543210", "studentName": "Tara", "seatNumber": 4}"#,
        )
        .unwrap();
        assert_eq!(req.kind, MessageKind::Welcome);
        assert_eq!(req.to, "9876543210");
        assert_eq!(req.name, "Tara");
    }
}
