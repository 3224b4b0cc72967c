use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::student::{Currency, DayType};

/// Key of the singleton row in the `settings` table.
pub const APP_SETTINGS: &str = "app_settings";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub library: LibraryProfile,
    pub fees: FeeDefaults,
    pub notifications: NotificationSettings,
    pub wifi: WifiDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LibraryProfile {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeeDefaults {
    pub currency: Currency,
    pub full_day_fee: f64,
    pub half_day_fee: f64,
    pub monthly_fee: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub whatsapp_enabled: bool,
    pub welcome_message_enabled: bool,
    pub auto_reminder_enabled: bool,
    pub reminder_days_before: u32,
    /// Overrides the gateway sender number from the environment.
    pub sender_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WifiDetails {
    pub ssid: String,
    pub password: String,
}

impl Default for LibraryProfile {
    fn default() -> Self {
        Self {
            name: "Study Library".into(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
        }
    }
}

impl Default for FeeDefaults {
    fn default() -> Self {
        Self {
            currency: Currency::Inr,
            full_day_fee: 1500.0,
            half_day_fee: 900.0,
            monthly_fee: 1500.0,
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            whatsapp_enabled: true,
            welcome_message_enabled: true,
            auto_reminder_enabled: true,
            reminder_days_before: 3,
            sender_number: None,
        }
    }
}

impl FeeDefaults {
    pub fn for_day_type(&self, day_type: DayType) -> f64 {
        let fee = match day_type {
            DayType::Full => self.full_day_fee,
            DayType::Half => self.half_day_fee,
        };
        if fee > 0.0 {
            fee
        } else {
            self.monthly_fee
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        let fees = &self.fees;
        if fees.full_day_fee < 0.0 || fees.half_day_fee < 0.0 || fees.monthly_fee < 0.0 {
            return Err("Fees cannot be negative".into());
        }
        if self.notifications.reminder_days_before > 60 {
            return Err("reminderDaysBefore must be between 0 and 60".into());
        }
        if self.library.name.trim().is_empty() {
            return Err("Library name is required".into());
        }
        Ok(())
    }
}

/// Recursively merges `patch` into `target`. Objects merge key by key; any
/// other value (including arrays and `null`) replaces the target.
pub fn merge_json(target: &mut serde_json::Value, patch: serde_json::Value) {
    match (target, patch) {
        (serde_json::Value::Object(target), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}
