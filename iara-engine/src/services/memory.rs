//! In-memory store for local runs and tests

use async_trait::async_trait;
use shared::error::{AppError, AppResult};
use shared::models::{
    ChatMessage, ConfigPatch, InteractionLog, SubscriptionRecord, TenantConfig, TrialOverride,
};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::ConfigStore;

#[derive(Default)]
struct Tables {
    configs: HashMap<String, TenantConfig>,
    subscriptions: HashMap<String, SubscriptionRecord>,
    trial_overrides: HashMap<String, TrialOverride>,
    logs: HashMap<String, Vec<InteractionLog>>,
    chats: HashMap<String, Vec<ChatMessage>>,
    patches: Vec<(String, ConfigPatch)>,
}

/// [`ConfigStore`] backed by hash maps
///
/// Writes can be made to fail on demand to exercise error paths.
#[derive(Default)]
pub struct InMemoryConfigStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    fail_trial_reads: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock()
    }

    fn check_write(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::persistence("store unavailable"));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    // === Seeding ===

    pub fn insert_config(&self, tenant_id: &str, config: TenantConfig) {
        self.tables().configs.insert(tenant_id.to_string(), config);
    }

    pub fn insert_subscription(&self, tenant_id: &str, record: SubscriptionRecord) {
        self.tables()
            .subscriptions
            .insert(tenant_id.to_string(), record);
    }

    pub fn insert_trial_override(&self, tenant_id: &str, row: TrialOverride) {
        self.tables()
            .trial_overrides
            .insert(tenant_id.to_string(), row);
    }

    pub fn push_log(&self, tenant_id: &str, log: InteractionLog) {
        self.tables()
            .logs
            .entry(tenant_id.to_string())
            .or_default()
            .push(log);
    }

    // === Failure injection ===

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_trial_reads(&self, fail: bool) {
        self.fail_trial_reads.store(fail, Ordering::SeqCst);
    }

    // === Inspection ===

    pub fn config(&self, tenant_id: &str) -> Option<TenantConfig> {
        self.tables().configs.get(tenant_id).cloned()
    }

    pub fn subscription(&self, tenant_id: &str) -> Option<SubscriptionRecord> {
        self.tables().subscriptions.get(tenant_id).cloned()
    }

    /// Every successful patch, oldest first
    pub fn patches(&self, tenant_id: &str) -> Vec<ConfigPatch> {
        self.tables()
            .patches
            .iter()
            .filter(|(id, _)| id == tenant_id)
            .map(|(_, p)| *p)
            .collect()
    }

    /// Stored chat messages in insertion order
    pub fn chat_messages(&self, tenant_id: &str) -> Vec<ChatMessage> {
        self.tables()
            .chats
            .get(tenant_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of successful writes of any kind
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn get_config(&self, tenant_id: &str) -> AppResult<Option<TenantConfig>> {
        Ok(self.tables().configs.get(tenant_id).cloned())
    }

    async fn upsert_config(&self, tenant_id: &str, config: &TenantConfig) -> AppResult<()> {
        self.check_write()?;
        self.tables()
            .configs
            .insert(tenant_id.to_string(), config.clone().without_credentials());
        Ok(())
    }

    async fn patch_config(&self, tenant_id: &str, patch: &ConfigPatch) -> AppResult<()> {
        self.check_write()?;
        let mut tables = self.tables();
        tables
            .configs
            .entry(tenant_id.to_string())
            .or_default()
            .apply(patch);
        tables.patches.push((tenant_id.to_string(), *patch));
        Ok(())
    }

    async fn get_subscription(&self, tenant_id: &str) -> AppResult<Option<SubscriptionRecord>> {
        Ok(self.tables().subscriptions.get(tenant_id).cloned())
    }

    async fn upsert_subscription(
        &self,
        tenant_id: &str,
        record: &SubscriptionRecord,
    ) -> AppResult<()> {
        self.check_write()?;
        self.tables()
            .subscriptions
            .insert(tenant_id.to_string(), record.clone());
        Ok(())
    }

    async fn get_trial_override(&self, tenant_id: &str) -> AppResult<Option<TrialOverride>> {
        if self.fail_trial_reads.load(Ordering::SeqCst) {
            return Err(AppError::persistence("user_trial_settings unavailable"));
        }
        Ok(self.tables().trial_overrides.get(tenant_id).cloned())
    }

    async fn recent_interaction_logs(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> AppResult<Vec<InteractionLog>> {
        let mut logs = self
            .tables()
            .logs
            .get(tenant_id)
            .cloned()
            .unwrap_or_default();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        logs.truncate(limit);
        Ok(logs)
    }

    async fn append_chat_message(&self, tenant_id: &str, message: &ChatMessage) -> AppResult<()> {
        self.check_write()?;
        self.tables()
            .chats
            .entry(tenant_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn recent_chat_messages(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> AppResult<Vec<ChatMessage>> {
        let mut messages = self.chat_messages(tenant_id);
        // stable sort keeps insertion order between equal timestamps
        messages.reverse();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        messages.truncate(limit);
        Ok(messages)
    }

    async fn clear_chat_messages(&self, tenant_id: &str) -> AppResult<()> {
        self.check_write()?;
        self.tables().chats.remove(tenant_id);
        Ok(())
    }
}
