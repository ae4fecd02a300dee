//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use iara_engine::lifecycle::{Session, SessionSettings, TenantIdentity};
use iara_engine::pricing::{CheckoutOrder, PricingTable};
use iara_engine::services::{
    CheckoutProvider, Collaborators, ConversationRequest, ConversationWebhook, GatewayAction,
    InMemoryConfigStore, ManualClock, MessagingGateway,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use shared::error::{AppError, AppResult};
use shared::models::{Branch, ConfigurationSnapshot, TenantConfig};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

pub const TENANT: &str = "tenant-1";
pub const EMAIL: &str = "Academia.Forte@gym.com";
pub const INSTANCE: &str = "academiaforte";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
}

// ============================================================================
// Scripted gateway
// ============================================================================

/// Gateway answering from per-action queues, then from per-action defaults
#[derive(Default)]
pub struct ScriptedGateway {
    queued: Mutex<HashMap<GatewayAction, VecDeque<AppResult<Value>>>>,
    defaults: Mutex<HashMap<GatewayAction, AppResult<Value>>>,
    calls: Mutex<Vec<(GatewayAction, String)>>,
}

impl ScriptedGateway {
    pub fn push(&self, action: GatewayAction, response: AppResult<Value>) {
        self.queued
            .lock()
            .entry(action)
            .or_default()
            .push_back(response);
    }

    pub fn set_default(&self, action: GatewayAction, response: AppResult<Value>) {
        self.defaults.lock().insert(action, response);
    }

    pub fn calls(&self) -> Vec<GatewayAction> {
        self.calls.lock().iter().map(|(a, _)| *a).collect()
    }

    pub fn count(&self, action: GatewayAction) -> usize {
        self.calls.lock().iter().filter(|(a, _)| *a == action).count()
    }

    pub fn instances(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(_, i)| i.clone()).collect()
    }
}

#[async_trait]
impl MessagingGateway for ScriptedGateway {
    async fn call(&self, action: GatewayAction, instance: &str) -> AppResult<Value> {
        self.calls.lock().push((action, instance.to_string()));
        if let Some(response) = self
            .queued
            .lock()
            .get_mut(&action)
            .and_then(VecDeque::pop_front)
        {
            return response;
        }
        self.defaults
            .lock()
            .get(&action)
            .cloned()
            .unwrap_or_else(|| Err(AppError::gateway(format!("no scripted {action} response"))))
    }
}

// ============================================================================
// Conversation and checkout stubs
// ============================================================================

#[derive(Default)]
pub struct StubConversation {
    pub requests: Mutex<Vec<ConversationRequest>>,
    reply: Mutex<Option<AppResult<String>>>,
}

impl StubConversation {
    pub fn set_reply(&self, reply: AppResult<String>) {
        *self.reply.lock() = Some(reply);
    }
}

#[async_trait]
impl ConversationWebhook for StubConversation {
    async fn send(&self, request: &ConversationRequest) -> AppResult<String> {
        self.requests.lock().push(request.clone());
        self.reply
            .lock()
            .clone()
            .unwrap_or_else(|| Ok("Olá! Como posso ajudar?".to_string()))
    }
}

#[derive(Default)]
pub struct StubCheckout {
    pub orders: Mutex<Vec<CheckoutOrder>>,
    fail: Mutex<bool>,
}

impl StubCheckout {
    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

#[async_trait]
impl CheckoutProvider for StubCheckout {
    async fn submit(&self, order: &CheckoutOrder) -> AppResult<String> {
        self.orders.lock().push(order.clone());
        if *self.fail.lock() {
            return Err(AppError::checkout("Failed to fetch"));
        }
        Ok("<div id=\"hotmart-checkout\"></div>".to_string())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub store: Arc<InMemoryConfigStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub conversation: Arc<StubConversation>,
    pub checkout: Arc<StubCheckout>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryConfigStore::new()),
            gateway: Arc::new(ScriptedGateway::default()),
            conversation: Arc::new(StubConversation::default()),
            checkout: Arc::new(StubCheckout::default()),
            clock: Arc::new(ManualClock::new(t0())),
        }
    }

    pub fn services(&self) -> Collaborators {
        Collaborators {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
            conversation: self.conversation.clone(),
            checkout: self.checkout.clone(),
            clock: self.clock.clone(),
        }
    }

    /// Tenant whose account was created at `t0`
    pub fn identity(&self) -> TenantIdentity {
        TenantIdentity {
            user_id: TENANT.to_string(),
            email: EMAIL.to_string(),
            created_at: t0(),
        }
    }

    pub fn settings() -> SessionSettings {
        SessionSettings {
            tick_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(5),
            ..SessionSettings::default()
        }
    }

    pub fn session(&self) -> Session {
        Session::new(
            self.identity(),
            Self::settings(),
            PricingTable::default(),
            self.services(),
        )
    }

    pub async fn open(&self) -> Session {
        Session::open(
            self.identity(),
            Self::settings(),
            PricingTable::default(),
            self.services(),
        )
        .await
        .expect("session should load")
    }

    pub fn seed_config(&self, config: TenantConfig) {
        self.store.insert_config(TENANT, config);
    }
}

// ============================================================================
// Snapshots
// ============================================================================

pub fn branches(n: usize) -> Vec<Branch> {
    (0..n)
        .map(|i| Branch {
            id: json!(i + 1),
            address: format!("Rua {}, 100", i + 1),
        })
        .collect()
}

/// Trained snapshot: opening hours and pricing filled in
pub fn trained() -> ConfigurationSnapshot {
    ConfigurationSnapshot {
        opening_hours: "Seg a Sex 6h-22h".to_string(),
        pricing_info: "Mensal R$ 99".to_string(),
        ..ConfigurationSnapshot::default()
    }
}

pub fn config_with(snapshot: ConfigurationSnapshot) -> TenantConfig {
    TenantConfig {
        snapshot,
        ..TenantConfig::default()
    }
}

pub fn status_open() -> AppResult<Value> {
    Ok(json!({"instance": {"state": "open"}}))
}

pub fn status_closed() -> AppResult<Value> {
    Ok(json!({"status": "close"}))
}

pub fn paid_subscription(plan: &str) -> shared::models::SubscriptionRecord {
    shared::models::SubscriptionRecord {
        plan_type: Some(plan.to_string()),
        status: Some("active".to_string()),
        addons: None,
    }
}
