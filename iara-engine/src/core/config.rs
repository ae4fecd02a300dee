use chrono::{DateTime, Utc};
use shared::error::{AppError, AppResult, ErrorCode};
use std::time::Duration;

use crate::lifecycle::SessionSettings;

/// Engine configuration
///
/// # Environment
///
/// Every value can be overridden through environment variables:
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | STORE_URL | http://localhost:54321 | REST store base URL |
/// | STORE_API_KEY | (empty) | REST store API key |
/// | GATEWAY_WEBHOOK_URL | http://localhost:5678/webhook/evolution | Messaging gateway webhook |
/// | CONVERSATION_WEBHOOK_URL | http://localhost:5678/webhook/conversation | Assistant conversation webhook |
/// | SALES_WEBHOOK_URL | http://localhost:5678/webhook/sales | Checkout webhook |
/// | SALES_CONTACT_NUMBER | 5555996079863 | WhatsApp number for human sales contact |
/// | TENANT_ID | (empty) | Tenant user id |
/// | TENANT_EMAIL | (empty) | Tenant login email |
/// | TENANT_CREATED_AT | now | Account creation time (RFC 3339) |
/// | TRIAL_HOURS | 48 | Default trial length |
/// | TICK_INTERVAL_MS | 1000 | Countdown tick |
/// | POLL_INTERVAL_MS | 5000 | Connection status poll |
/// | QR_DELAY_MS | 1200 | Delay between instance creation and QR request |
/// | PAIRING_CLOSE_DELAY_MS | 2000 | Pairing view auto-close after connection |
/// | REQUEST_TIMEOUT_MS | 30000 | HTTP request timeout |
/// | CONVERSATION_TIMEOUT_MS | 30000 | Assistant reply timeout |
/// | LOG_LEVEL | info | Log level |
/// | LOG_DIR | (unset) | Daily rolling log directory |
/// | ENVIRONMENT | development | Runtime environment |
///
/// # Example
///
/// ```ignore
/// TENANT_ID=8c1f... TENANT_EMAIL=owner@gym.com cargo run -p iara-engine
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub store_url: String,
    pub store_api_key: String,
    pub gateway_url: String,
    pub conversation_url: String,
    pub sales_url: String,
    pub sales_contact_number: String,

    // === Tenant ===
    pub tenant_id: String,
    pub tenant_email: String,
    pub tenant_created_at: DateTime<Utc>,

    // === Timing ===
    pub trial_hours: i64,
    pub tick_interval_ms: u64,
    pub poll_interval_ms: u64,
    pub qr_delay_ms: u64,
    pub pairing_close_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub conversation_timeout_ms: u64,

    pub log_level: String,
    pub log_dir: Option<String>,
    /// development | staging | production
    pub environment: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Unset or unparsable variables fall back to their defaults.
    pub fn from_env() -> Self {
        Self {
            store_url: env_or("STORE_URL", "http://localhost:54321"),
            store_api_key: env_or("STORE_API_KEY", ""),
            gateway_url: env_or(
                "GATEWAY_WEBHOOK_URL",
                "http://localhost:5678/webhook/evolution",
            ),
            conversation_url: env_or(
                "CONVERSATION_WEBHOOK_URL",
                "http://localhost:5678/webhook/conversation",
            ),
            sales_url: env_or("SALES_WEBHOOK_URL", "http://localhost:5678/webhook/sales"),
            sales_contact_number: env_or("SALES_CONTACT_NUMBER", "5555996079863"),

            tenant_id: env_or("TENANT_ID", ""),
            tenant_email: env_or("TENANT_EMAIL", ""),
            tenant_created_at: std::env::var("TENANT_CREATED_AT")
                .ok()
                .and_then(|v| DateTime::parse_from_rfc3339(v.trim()).ok())
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_else(Utc::now),

            trial_hours: env_parse("TRIAL_HOURS", 48),
            tick_interval_ms: env_parse("TICK_INTERVAL_MS", 1000),
            poll_interval_ms: env_parse("POLL_INTERVAL_MS", 5000),
            qr_delay_ms: env_parse("QR_DELAY_MS", 1200),
            pairing_close_delay_ms: env_parse("PAIRING_CLOSE_DELAY_MS", 2000),
            request_timeout_ms: env_parse("REQUEST_TIMEOUT_MS", 30000),
            conversation_timeout_ms: env_parse("CONVERSATION_TIMEOUT_MS", 30000),

            log_level: env_or("LOG_LEVEL", "info"),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            environment: env_or("ENVIRONMENT", "development"),
        }
    }

    /// Timing and trial settings handed to the session
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            trial_hours: self.trial_hours,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            qr_delay: Duration::from_millis(self.qr_delay_ms),
            pairing_close_delay: Duration::from_millis(self.pairing_close_delay_ms),
            sales_contact_number: self.sales_contact_number.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn conversation_timeout(&self) -> Duration {
        Duration::from_millis(self.conversation_timeout_ms)
    }

    /// Whether the tenant identity required to start a session is set
    pub fn has_tenant(&self) -> bool {
        !self.tenant_id.trim().is_empty() && !self.tenant_email.trim().is_empty()
    }

    /// Reject a configuration the engine cannot start with
    pub fn validate(&self) -> AppResult<()> {
        if !self.has_tenant() {
            return Err(AppError::with_message(
                ErrorCode::ConfigError,
                "TENANT_ID and TENANT_EMAIL must be set",
            ));
        }
        for (key, url) in [
            ("STORE_URL", &self.store_url),
            ("GATEWAY_WEBHOOK_URL", &self.gateway_url),
            ("CONVERSATION_WEBHOOK_URL", &self.conversation_url),
            ("SALES_WEBHOOK_URL", &self.sales_url),
        ] {
            if url.trim().is_empty() {
                return Err(
                    AppError::with_message(ErrorCode::ConfigError, format!("{key} must be set"))
                        .with_detail("variable", key),
                );
            }
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
