use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means no database: read endpoints serve fallback data.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Serve sample data instead of errors when the database fails.
    pub fallback_enabled: bool,
    pub whatsapp: WhatsAppConfig,
}

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub username: Option<String>,
    pub secret: Option<String>,
    pub sender_number: String,
    pub welcome_template_id: String,
    pub reminder_template_id: String,
    pub default_country_code: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: optional("DATABASE_URL"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            fallback_enabled: flag("FALLBACK_ENABLED", true)?,
            whatsapp: WhatsAppConfig::from_env(),
        })
    }
}

impl WhatsAppConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: env::var("WHATSAPP_API_URL")
                .unwrap_or_else(|_| "https://api.whatsapp-gateway.example/v1/messages".into()),
            username: optional("WHATSAPP_USERNAME"),
            secret: optional("WHATSAPP_SECRET"),
            sender_number: env::var("WHATSAPP_SENDER").unwrap_or_default(),
            welcome_template_id: env::var("WHATSAPP_WELCOME_TEMPLATE")
                .unwrap_or_else(|_| "welcome_message".into()),
            reminder_template_id: env::var("WHATSAPP_REMINDER_TEMPLATE")
                .unwrap_or_else(|_| "payment_reminder".into()),
            default_country_code: env::var("WHATSAPP_COUNTRY_CODE")
                .unwrap_or_else(|_| "91".into()),
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn flag(key: &str, default: bool) -> anyhow::Result<bool> {
    match optional(key) {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow::anyhow!("Invalid boolean for {}: {}", key, v)),
        },
    }
}
