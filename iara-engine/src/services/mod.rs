//! External collaborators
//!
//! The core talks to the outside world only through these traits. Each has
//! an HTTP adapter for production and the store has an in-memory one for
//! local runs and tests.

pub mod checkout;
pub mod clock;
pub mod conversation;
pub mod gateway;
pub mod memory;
pub mod store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use shared::error::AppResult;
use shared::models::{
    ChatMessage, ConfigPatch, InteractionLog, SubscriptionRecord, TenantConfig, TrialOverride,
};
use std::fmt;
use std::sync::Arc;

use crate::pricing::CheckoutOrder;

pub use checkout::HttpCheckoutProvider;
pub use clock::{ManualClock, SystemClock};
pub use conversation::HttpConversationWebhook;
pub use gateway::HttpGateway;
pub use memory::InMemoryConfigStore;
pub use store::RestConfigStore;

/// Persistence of tenant rows, keyed by tenant id
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_config(&self, tenant_id: &str) -> AppResult<Option<TenantConfig>>;

    /// Insert or replace the whole row
    async fn upsert_config(&self, tenant_id: &str, config: &TenantConfig) -> AppResult<()>;

    /// Update only the fields set in `patch`
    async fn patch_config(&self, tenant_id: &str, patch: &ConfigPatch) -> AppResult<()>;

    async fn get_subscription(&self, tenant_id: &str) -> AppResult<Option<SubscriptionRecord>>;

    async fn upsert_subscription(
        &self,
        tenant_id: &str,
        record: &SubscriptionRecord,
    ) -> AppResult<()>;

    async fn get_trial_override(&self, tenant_id: &str) -> AppResult<Option<TrialOverride>>;

    /// Newest first
    async fn recent_interaction_logs(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> AppResult<Vec<InteractionLog>>;

    async fn append_chat_message(&self, tenant_id: &str, message: &ChatMessage) -> AppResult<()>;

    /// Newest first
    async fn recent_chat_messages(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> AppResult<Vec<ChatMessage>>;

    /// Delete every chat message of the tenant
    async fn clear_chat_messages(&self, tenant_id: &str) -> AppResult<()>;
}

/// Messaging gateway actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayAction {
    Create,
    Qr,
    Status,
    Restart,
    Logout,
}

impl GatewayAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Qr => "qr",
            Self::Status => "status",
            Self::Restart => "restart",
            Self::Logout => "logout",
        }
    }
}

impl fmt::Display for GatewayAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unofficial WhatsApp gateway
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Run `action` on `instance`; an empty response is an error
    async fn call(&self, action: GatewayAction, instance: &str) -> AppResult<Value>;
}

/// Message sent to the assistant workflow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationRequest {
    pub event: &'static str,
    pub source: &'static str,
    pub user_id: String,
    pub email: String,
    /// Single line; newlines are replaced by spaces
    pub message: String,
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationRequest {
    pub fn user_message(
        user_id: impl Into<String>,
        email: impl Into<String>,
        message: &str,
        conversation_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event: "user_message",
            source: "home_ai_start",
            user_id: user_id.into(),
            email: email.into(),
            message: message.replace(['\r', '\n'], " "),
            conversation_id: conversation_id.into(),
            created_at,
        }
    }
}

/// Assistant conversation workflow
#[async_trait]
pub trait ConversationWebhook: Send + Sync {
    /// Reply text of the assistant
    async fn send(&self, request: &ConversationRequest) -> AppResult<String>;
}

/// Payment checkout
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Embeddable checkout markup for `order`
    async fn submit(&self, order: &CheckoutOrder) -> AppResult<String>;
}

/// Wall clock
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Handles to every collaborator of a session
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ConfigStore>,
    pub gateway: Arc<dyn MessagingGateway>,
    pub conversation: Arc<dyn ConversationWebhook>,
    pub checkout: Arc<dyn CheckoutProvider>,
    pub clock: Arc<dyn Clock>,
}
