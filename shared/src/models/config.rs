//! Tenant configuration
//!
//! Column names follow the `gym_configs` table of the external store.

use crate::models::connection::ConnectionState;
use crate::util::null_as_default;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Columns that must never be written back with a configuration row
pub const CREDENTIAL_COLUMNS: &[&str] = &["email", "password"];

/// Additional business location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// Opaque identifier assigned by the panel
    pub id: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
}

/// Feature configuration priced by the pricing engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSnapshot {
    // === Paid add-ons ===
    #[serde(default, deserialize_with = "null_as_default")]
    pub omnichannel: bool,
    #[serde(rename = "integrate_agenda", default, deserialize_with = "null_as_default")]
    pub calendar_integration: bool,
    #[serde(rename = "recognize_payments", default, deserialize_with = "null_as_default")]
    pub payment_recognition: bool,
    #[serde(rename = "mass_sender_active", default, deserialize_with = "null_as_default")]
    pub mass_sender: bool,
    #[serde(
        rename = "use_official_api_coexistencia",
        default,
        deserialize_with = "null_as_default"
    )]
    pub official_api_coexistence: bool,
    #[serde(
        rename = "use_official_api_somente",
        default,
        deserialize_with = "null_as_default"
    )]
    pub official_api_only: bool,
    #[serde(rename = "ia_gestor_midias", default, deserialize_with = "null_as_default")]
    pub media_manager: bool,

    // === Assistant behaviour ===
    #[serde(default, deserialize_with = "null_as_default")]
    pub allow_calls: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reply_audio: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub send_images: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reply_groups: bool,

    /// The official API channel is connected
    #[serde(rename = "use_official_api", default, deserialize_with = "null_as_default")]
    pub official_api_connected: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub branches: Vec<Branch>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extra_users_count: i64,

    // === Training ===
    #[serde(default, deserialize_with = "null_as_default")]
    pub tone_of_voice: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub opening_hours: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pricing_info: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub faq_text: String,
}

/// Persisted configuration row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantConfig {
    #[serde(flatten)]
    pub snapshot: ConfigurationSnapshot,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extra_channels_count: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ai_active: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ai_active_instagram: bool,
    /// Last confirmed gateway state
    #[serde(default, deserialize_with = "null_as_default")]
    pub connection_status: ConnectionState,
    #[serde(default, deserialize_with = "null_as_default")]
    pub needs_reprocessing: bool,
    /// Columns the core does not interpret, written back untouched
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl TenantConfig {
    /// Drop credential columns and store bookkeeping before a write
    pub fn without_credentials(mut self) -> Self {
        for key in CREDENTIAL_COLUMNS {
            self.other.remove(*key);
        }
        self.other.remove("user_id");
        self.other.remove("updated_at");
        self
    }

    pub fn apply(&mut self, patch: &ConfigPatch) {
        if let Some(v) = patch.ai_active {
            self.ai_active = v;
        }
        if let Some(v) = patch.ai_active_instagram {
            self.ai_active_instagram = v;
        }
        if let Some(v) = patch.connection_status {
            self.connection_status = v;
        }
    }
}

/// Partial update of a configuration row
///
/// Only the fields that are set are serialized, so absent fields are never
/// overwritten in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_active_instagram: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_status: Option<ConnectionState>,
}

impl ConfigPatch {
    pub fn ai_active(value: bool) -> Self {
        Self {
            ai_active: Some(value),
            ..Default::default()
        }
    }

    pub fn ai_active_instagram(value: bool) -> Self {
        Self {
            ai_active_instagram: Some(value),
            ..Default::default()
        }
    }

    pub fn connection(state: ConnectionState) -> Self {
        Self {
            connection_status: Some(state.confirmed()),
            ..Default::default()
        }
    }

    /// Assistant off and channel disconnected, in one write
    pub fn paused_and_disconnected() -> Self {
        Self {
            ai_active: Some(false),
            ai_active_instagram: None,
            connection_status: Some(ConnectionState::Disconnected),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ai_active.is_none()
            && self.ai_active_instagram.is_none()
            && self.connection_status.is_none()
    }
}
