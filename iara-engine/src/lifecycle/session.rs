//! Tenant session
//!
//! A [`Session`] owns everything the panel knows about one tenant: the
//! persisted configuration, the subscription, the trial window, the live
//! connection tracker and the applied coupon. It is driven by exactly one
//! owner (the [`SessionRunner`](super::SessionRunner) or a test), so user
//! actions and timer ticks never interleave.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    ChatMessage, ChatRole, ConfigPatch, ConfigurationSnapshot, ConnectionState, InteractionLog,
    PlanTier,
    SubscriptionRecord, SubscriptionState, TenantConfig,
};
use std::time::Duration;
use uuid::Uuid;

use super::connection::{ConnectionEvent, ConnectionTracker};
use super::trial::{ExpiryGuard, TrialStatus, TrialWindow};
use crate::pricing::checkout::{SUPPORT_MESSAGE, contact_link, high_ticket_message};
use crate::pricing::{
    CheckoutKind, CheckoutOrder, CheckoutRoute, Coupon, CouponError, Feature, OnboardingProgress,
    OrderDetails, PriceBreakdown, PricingInputs, PricingTable, check_entitlements, classify_paid,
    is_feature_unlocked, mass_sender_tier, onboarding_discount, quote, route_checkout,
    set_official_api_coexistence, set_official_api_only, upgrade_value, validate_coupon,
    validate_snapshot,
};
use crate::services::gateway::{extract_pairing_artifact, instance_name_from_email, is_connected_response};
use crate::services::{Collaborators, ConversationRequest, GatewayAction};

/// Interaction logs fetched at load
const RECENT_LOG_LIMIT: usize = 10;

/// Chat messages restored at load
const CHAT_HISTORY_LIMIT: usize = 50;

/// Opening hours shorter than this block activation
const MIN_OPENING_HOURS_CHARS: usize = 5;

/// Who the session belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantIdentity {
    pub user_id: String,
    pub email: String,
    /// Account creation, start of the default trial
    pub created_at: DateTime<Utc>,
}

/// Timing and trial settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub trial_hours: i64,
    pub tick_interval: Duration,
    pub poll_interval: Duration,
    /// Wait between instance creation and the QR request
    pub qr_delay: Duration,
    /// Pairing view stays open this long after the connection is confirmed
    pub pairing_close_delay: Duration,
    pub sales_contact_number: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            trial_hours: 48,
            tick_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(5),
            qr_delay: Duration::from_millis(1200),
            pairing_close_delay: Duration::from_secs(2),
            sales_contact_number: "5555996079863".to_string(),
        }
    }
}

/// Price quote shown on the subscription tab
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub breakdown: PriceBreakdown,
    pub tier: PlanTier,
    pub plan_label: &'static str,
    /// Breakdown total, or the operator override when one is set
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub upgrade_value: Decimal,
    pub coupon: Option<Coupon>,
    pub onboarding: OnboardingProgress,
    pub mass_sender_unlocked: bool,
}

/// Result of a local configuration edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigEdit {
    /// Applied coupon that no longer qualifies and was removed
    pub coupon_dropped: Option<CouponError>,
    /// Omnichannel was switched on by official-API-only mode
    pub omnichannel_forced: bool,
}

/// How a checkout ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Closed by a salesperson over WhatsApp
    HighTicket { value: Decimal, contact_link: String },
    /// Nothing to charge; the configuration was saved
    NoCharge,
    /// Checkout markup to embed
    Checkout {
        value: Decimal,
        kind: CheckoutKind,
        markup: String,
    },
    /// Automatic checkout failed; fall back to human contact
    Fallback { contact_link: String, reason: String },
}

pub struct Session {
    identity: TenantIdentity,
    instance_name: String,
    settings: SessionSettings,
    table: PricingTable,
    services: Collaborators,

    config: TenantConfig,
    subscription: SubscriptionState,
    trial: TrialWindow,
    expiry_guard: ExpiryGuard,
    /// Forced-pause patch not yet persisted
    pending_pause: Option<ConfigPatch>,
    connection: ConnectionTracker,
    coupon: Option<Coupon>,
    recent_logs: Vec<InteractionLog>,
    /// Oldest first
    chat_history: Vec<ChatMessage>,

    ready: bool,
    conversation_id: String,
}

impl Session {
    /// Session with default state; nothing is writable until [`Session::load`]
    pub fn new(
        identity: TenantIdentity,
        settings: SessionSettings,
        table: PricingTable,
        services: Collaborators,
    ) -> Self {
        let instance_name = instance_name_from_email(&identity.email);
        let trial = TrialWindow::default_for(identity.created_at, settings.trial_hours);
        Self {
            identity,
            instance_name,
            settings,
            table,
            services,
            config: TenantConfig::default(),
            subscription: SubscriptionState::trial(),
            trial,
            expiry_guard: ExpiryGuard::default(),
            pending_pause: None,
            connection: ConnectionTracker::default(),
            coupon: None,
            recent_logs: Vec::new(),
            chat_history: Vec::new(),
            ready: false,
            conversation_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create and load in one step
    pub async fn open(
        identity: TenantIdentity,
        settings: SessionSettings,
        table: PricingTable,
        services: Collaborators,
    ) -> AppResult<Self> {
        let mut session = Self::new(identity, settings, table, services);
        session.load().await?;
        Ok(session)
    }

    /// Read the tenant's rows, creating the missing ones
    ///
    /// Config and subscription failures abort the load. The trial override,
    /// the interaction logs and the chat history are optional and fall back
    /// quietly. An existing history continues its latest conversation.
    pub async fn load(&mut self) -> AppResult<()> {
        let tenant = self.identity.user_id.clone();
        let store = self.services.store.clone();

        let config = match store.get_config(&tenant).await? {
            Some(config) => config,
            None => {
                let config = TenantConfig::default();
                store.upsert_config(&tenant, &config).await?;
                tracing::info!(tenant = %tenant, "Created default configuration");
                config
            }
        };

        let record = match store.get_subscription(&tenant).await? {
            Some(record) => record,
            None => {
                let record = SubscriptionRecord::new_trial();
                store.upsert_subscription(&tenant, &record).await?;
                tracing::info!(tenant = %tenant, "Created trial subscription");
                record
            }
        };

        let trial_override = store.get_trial_override(&tenant).await.unwrap_or_else(|e| {
            tracing::warn!(tenant = %tenant, error = %e, "Trial override lookup failed, using default window");
            None
        });

        self.recent_logs = store
            .recent_interaction_logs(&tenant, RECENT_LOG_LIMIT)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(tenant = %tenant, error = %e, "Failed to load interaction logs");
                Vec::new()
            });

        match store.recent_chat_messages(&tenant, CHAT_HISTORY_LIMIT).await {
            Ok(mut history) => {
                if let Some(latest) = history.first() {
                    self.conversation_id = latest.conversation_id.clone();
                }
                history.reverse();
                self.chat_history = history;
            }
            Err(e) => {
                tracing::warn!(tenant = %tenant, error = %e, "Failed to load chat history");
            }
        }

        self.trial = TrialWindow::resolve(
            self.identity.created_at,
            self.settings.trial_hours,
            trial_override.as_ref(),
        );
        self.connection = ConnectionTracker::new(config.connection_status);
        self.config = config;
        self.subscription = SubscriptionState::from(record);
        self.ready = true;

        tracing::info!(
            tenant = %tenant,
            plan = %self.subscription.plan_type,
            trial_source = ?self.trial.source,
            trial_ends_at = %self.trial.ends_at(),
            connection = %self.connection.state(),
            "Session loaded"
        );

        self.evaluate_trial().await;
        Ok(())
    }

    fn ensure_ready(&self) -> AppResult<()> {
        if self.ready {
            Ok(())
        } else {
            Err(AppError::not_ready())
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.services.clock.now()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn identity(&self) -> &TenantIdentity {
        &self.identity
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn pricing_table(&self) -> &PricingTable {
        &self.table
    }

    pub fn config(&self) -> &TenantConfig {
        &self.config
    }

    pub fn subscription(&self) -> &SubscriptionState {
        &self.subscription
    }

    pub fn trial(&self) -> &TrialWindow {
        &self.trial
    }

    pub fn connection(&self) -> &ConnectionTracker {
        &self.connection
    }

    pub fn coupon(&self) -> Option<&Coupon> {
        self.coupon.as_ref()
    }

    pub fn recent_logs(&self) -> &[InteractionLog] {
        &self.recent_logs
    }

    /// Restored and exchanged chat messages, oldest first
    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Whether a forced pause still waits to be persisted
    pub fn has_pending_pause(&self) -> bool {
        self.pending_pause.is_some()
    }

    pub fn set_connection_view_focused(&mut self, focused: bool) {
        self.connection.set_view_focused(focused);
    }

    pub fn close_pairing_view(&mut self) {
        self.connection.close_pairing();
    }

    // ========================================================================
    // Trial
    // ========================================================================

    pub fn trial_status(&self) -> TrialStatus {
        self.trial.status(self.now())
    }

    /// Expired trial of a tenant still on the trial plan
    pub fn is_trial_expired(&self) -> bool {
        self.subscription.is_trial() && self.trial.is_expired(self.now())
    }

    pub fn countdown(&self) -> String {
        self.trial.countdown(self.now())
    }

    pub fn remaining_hours(&self) -> i64 {
        self.trial.remaining_hours(self.now())
    }

    /// Timer entry point: trial evaluation and pairing auto-close
    pub async fn tick(&mut self) {
        if !self.ready {
            return;
        }
        self.evaluate_trial().await;
        if self.connection.close_pairing_if_due(self.now()) {
            tracing::debug!(instance = %self.instance_name, "Pairing view closed");
        }
    }

    /// Check the trial window and run the forced pause on first expiry
    ///
    /// A pause whose persist failed is retried on every later evaluation
    /// until it succeeds.
    pub async fn evaluate_trial(&mut self) -> TrialStatus {
        let status = self.trial.status(self.now());
        let expired = status == TrialStatus::Expired;

        if self.expiry_guard.observe(expired) {
            if self.subscription.is_trial() {
                self.force_pause().await;
            }
        } else if expired {
            self.flush_pending_pause().await;
        } else {
            self.pending_pause = None;
        }
        status
    }

    async fn force_pause(&mut self) {
        let was_connected = self.connection.is_connected();
        tracing::warn!(
            action = "ForcedSafetyAction",
            tenant = %self.identity.user_id,
            was_connected,
            assistant_was_active = self.config.ai_active,
            "Trial expired, pausing assistant"
        );

        self.config.ai_active = false;
        let mut patch = ConfigPatch::ai_active(false);

        if self.connection.state() != ConnectionState::Disconnected {
            if was_connected {
                if let Err(e) = self
                    .services
                    .gateway
                    .call(GatewayAction::Logout, &self.instance_name)
                    .await
                {
                    tracing::warn!(instance = %self.instance_name, error = %e, "Forced logout failed");
                }
                patch = ConfigPatch::paused_and_disconnected();
                self.config.connection_status = ConnectionState::Disconnected;
            }
            if let Err(e) = self.connection.apply(ConnectionEvent::ForcedPause) {
                tracing::error!(error = %e, "Forced pause rejected by connection tracker");
            }
            self.connection.close_pairing();
        }

        self.pending_pause = Some(patch);
        self.flush_pending_pause().await;
    }

    async fn flush_pending_pause(&mut self) {
        let Some(patch) = self.pending_pause else {
            return;
        };
        match self
            .services
            .store
            .patch_config(&self.identity.user_id, &patch)
            .await
        {
            Ok(()) => {
                self.pending_pause = None;
                tracing::info!(tenant = %self.identity.user_id, "Forced pause persisted");
            }
            Err(e) => {
                tracing::warn!(
                    tenant = %self.identity.user_id,
                    error = %e,
                    "Forced pause not persisted, retrying on next evaluation"
                );
            }
        }
    }

    // ========================================================================
    // Connection
    // ========================================================================

    /// Create a gateway instance and fetch its pairing QR
    pub async fn initiate_connect(&mut self) -> AppResult<ConnectionState> {
        self.ensure_ready()?;
        self.connection.apply(ConnectionEvent::ConnectRequested)?;
        self.connection.open_pairing();

        let gateway = self.services.gateway.clone();
        let instance = self.instance_name.clone();

        if let Err(e) = gateway.call(GatewayAction::Create, &instance).await {
            tracing::warn!(instance = %instance, error = %e, "Instance creation failed");
            self.connection.apply(ConnectionEvent::CreateFailed)?;
            self.connection.close_pairing();
            return Err(e);
        }
        self.connection.apply(ConnectionEvent::InstanceCreated)?;

        tokio::time::sleep(self.settings.qr_delay).await;

        match gateway.call(GatewayAction::Qr, &instance).await {
            Ok(response) => self.refresh_pairing_artifact(&response),
            Err(e) => tracing::warn!(instance = %instance, error = %e, "QR request failed"),
        }
        if self.connection.pairing_artifact().is_none() {
            match gateway.call(GatewayAction::Status, &instance).await {
                Ok(response) => self.refresh_pairing_artifact(&response),
                Err(e) => tracing::warn!(instance = %instance, error = %e, "Status fallback failed"),
            }
        }

        self.poll_status().await;
        Ok(self.connection.state())
    }

    fn refresh_pairing_artifact(&mut self, response: &Value) {
        if !self.connection.is_pairing_open() {
            return;
        }
        if let Some(artifact) = extract_pairing_artifact(response) {
            self.connection.set_pairing_artifact(artifact);
        }
    }

    /// One status poll; failures are logged and swallowed
    pub async fn poll_status(&mut self) -> Option<ConnectionState> {
        if self.connection.state() == ConnectionState::Connecting {
            return None;
        }
        match self
            .services
            .gateway
            .call(GatewayAction::Status, &self.instance_name)
            .await
        {
            Ok(response) => {
                if is_connected_response(&response) {
                    self.confirm_connected().await;
                } else {
                    self.refresh_pairing_artifact(&response);
                }
                Some(self.connection.state())
            }
            Err(e) => {
                tracing::debug!(instance = %self.instance_name, error = %e, "Status poll failed");
                None
            }
        }
    }

    async fn confirm_connected(&mut self) {
        let was_connected = self.connection.is_connected();
        if let Err(e) = self.connection.apply(ConnectionEvent::Confirmed) {
            tracing::warn!(error = %e, "Connected signal ignored");
            return;
        }
        if was_connected {
            return;
        }

        tracing::info!(instance = %self.instance_name, "WhatsApp connected");
        self.config.connection_status = ConnectionState::Connected;
        if let Err(e) = self
            .services
            .store
            .patch_config(
                &self.identity.user_id,
                &ConfigPatch::connection(ConnectionState::Connected),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to persist connection status");
        }

        let delay = chrono::Duration::from_std(self.settings.pairing_close_delay)
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.connection.schedule_pairing_close(self.now() + delay);
    }

    async fn mark_lost(&mut self) {
        if !self.connection.is_connected() {
            return;
        }
        if let Err(e) = self.connection.apply(ConnectionEvent::Lost) {
            tracing::warn!(error = %e, "Lost signal ignored");
            return;
        }
        tracing::info!(instance = %self.instance_name, "WhatsApp session lost");
        self.config.connection_status = ConnectionState::Disconnected;
        if let Err(e) = self
            .services
            .store
            .patch_config(
                &self.identity.user_id,
                &ConfigPatch::connection(ConnectionState::Disconnected),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to persist connection status");
        }
    }

    /// On-demand status check
    ///
    /// Returns what the gateway reported (Connected or Disconnected), which
    /// is also the tracker state afterwards. A gateway failure is returned as
    /// is and leaves the state untouched.
    pub async fn manual_check(&mut self) -> AppResult<ConnectionState> {
        self.ensure_ready()?;
        if self.connection.state() == ConnectionState::Connecting {
            return Err(AppError::new(ErrorCode::ConnectInProgress));
        }
        let response = self
            .services
            .gateway
            .call(GatewayAction::Status, &self.instance_name)
            .await?;

        if is_connected_response(&response) {
            self.confirm_connected().await;
            Ok(ConnectionState::Connected)
        } else {
            self.mark_lost().await;
            if self.connection.state() == ConnectionState::AwaitingScan
                && let Err(e) = self.connection.apply(ConnectionEvent::Lost)
            {
                tracing::warn!(error = %e, "Pending pairing not reset");
            }
            self.refresh_pairing_artifact(&response);
            Ok(self.connection.state())
        }
    }

    /// Log the gateway session out and pause the assistant
    pub async fn disconnect(&mut self) -> AppResult<()> {
        self.ensure_ready()?;
        if self.connection.state() == ConnectionState::Connecting {
            return Err(AppError::new(ErrorCode::ConnectInProgress));
        }
        self.services
            .gateway
            .call(GatewayAction::Logout, &self.instance_name)
            .await?;

        self.connection.apply(ConnectionEvent::LoggedOut)?;
        self.connection.close_pairing();
        self.config.ai_active = false;
        self.config.connection_status = ConnectionState::Disconnected;
        tracing::info!(instance = %self.instance_name, "WhatsApp disconnected");

        if let Err(e) = self
            .services
            .store
            .patch_config(&self.identity.user_id, &ConfigPatch::paused_and_disconnected())
            .await
        {
            tracing::warn!(error = %e, "Failed to persist disconnect");
        }
        Ok(())
    }

    /// Restart the gateway instance; the local state is left as is
    pub async fn restart(&mut self) -> AppResult<()> {
        self.ensure_ready()?;
        self.services
            .gateway
            .call(GatewayAction::Restart, &self.instance_name)
            .await?;
        tracing::info!(instance = %self.instance_name, "Gateway instance restarted");
        Ok(())
    }

    // ========================================================================
    // Assistant switches
    // ========================================================================

    /// Flip the WhatsApp assistant on or off; returns the new value
    pub async fn toggle_assistant(&mut self) -> AppResult<bool> {
        self.ensure_ready()?;
        if self.is_trial_expired() {
            return Err(AppError::new(ErrorCode::TrialExpired));
        }

        let enable = !self.config.ai_active;
        if enable {
            if !self.connection.is_connected() && !self.config.snapshot.official_api_connected {
                return Err(AppError::new(ErrorCode::NoChannelConnected));
            }
            if self.config.snapshot.opening_hours.trim().chars().count() < MIN_OPENING_HOURS_CHARS
            {
                return Err(AppError::new(ErrorCode::TrainingIncomplete)
                    .with_detail("field", "opening_hours"));
            }
        }

        self.config.ai_active = enable;
        if let Err(e) = self
            .services
            .store
            .patch_config(&self.identity.user_id, &ConfigPatch::ai_active(enable))
            .await
        {
            self.config.ai_active = !enable;
            return Err(e);
        }
        tracing::info!(tenant = %self.identity.user_id, active = enable, "Assistant toggled");
        Ok(enable)
    }

    /// Flip the Instagram assistant on or off; returns the new value
    pub async fn toggle_instagram_assistant(&mut self) -> AppResult<bool> {
        self.ensure_ready()?;
        let enable = !self.config.ai_active_instagram;
        if enable
            && !is_feature_unlocked(
                Feature::InstagramChannel,
                self.plan_tier(),
                self.config.extra_channels_count,
            )
        {
            return Err(AppError::new(ErrorCode::ExtraChannelRequired));
        }

        self.config.ai_active_instagram = enable;
        if let Err(e) = self
            .services
            .store
            .patch_config(&self.identity.user_id, &ConfigPatch::ai_active_instagram(enable))
            .await
        {
            self.config.ai_active_instagram = !enable;
            return Err(e);
        }
        tracing::info!(tenant = %self.identity.user_id, active = enable, "Instagram assistant toggled");
        Ok(enable)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Edit the snapshot locally
    ///
    /// The edit is rejected as a whole when it produces a disallowed
    /// combination or switches on a feature the plan does not unlock.
    /// Features that were already on are not re-checked. Nothing is
    /// persisted until [`Session::save_config`].
    pub fn edit_config<F>(&mut self, edit: F) -> AppResult<ConfigEdit>
    where
        F: FnOnce(&mut ConfigurationSnapshot),
    {
        self.ensure_ready()?;
        let mut candidate = self.config.snapshot.clone();
        edit(&mut candidate);
        validate_snapshot(&candidate)?;

        let current = &self.config.snapshot;
        let switched_on = ConfigurationSnapshot {
            mass_sender: candidate.mass_sender && !current.mass_sender,
            allow_calls: candidate.allow_calls && !current.allow_calls,
            reply_audio: candidate.reply_audio && !current.reply_audio,
            send_images: candidate.send_images && !current.send_images,
            ..ConfigurationSnapshot::default()
        };
        let extra_channels = self.config.extra_channels_count;
        let (tier, mass_tier) = self.entitlement_tiers(&candidate, extra_channels);
        check_entitlements(&switched_on, tier, mass_tier, extra_channels)?;

        self.config.snapshot = candidate;
        Ok(ConfigEdit {
            coupon_dropped: self.revalidate_coupon(),
            omnichannel_forced: false,
        })
    }

    pub fn set_official_api_only(&mut self, enabled: bool) -> AppResult<ConfigEdit> {
        let mut forced = false;
        let edit = self.edit_config(|snapshot| forced = set_official_api_only(snapshot, enabled))?;
        Ok(ConfigEdit {
            omnichannel_forced: forced,
            ..edit
        })
    }

    pub fn set_official_api_coexistence(&mut self, enabled: bool) -> AppResult<ConfigEdit> {
        self.edit_config(|snapshot| set_official_api_coexistence(snapshot, enabled))
    }

    /// Change the number of purchased extra channels (negative counts as zero)
    pub fn set_extra_channels(&mut self, count: i64) -> AppResult<ConfigEdit> {
        self.ensure_ready()?;
        self.config.extra_channels_count = count.max(0);
        Ok(ConfigEdit {
            coupon_dropped: self.revalidate_coupon(),
            omnichannel_forced: false,
        })
    }

    /// Persist the whole configuration and flag it for reprocessing
    pub async fn save_config(&mut self) -> AppResult<()> {
        self.ensure_ready()?;
        validate_snapshot(&self.config.snapshot)?;

        let mut row = self.config.clone();
        row.needs_reprocessing = true;
        self.services
            .store
            .upsert_config(&self.identity.user_id, &row)
            .await?;
        self.config.needs_reprocessing = true;
        tracing::info!(tenant = %self.identity.user_id, "Configuration saved");
        Ok(())
    }

    // ========================================================================
    // Pricing
    // ========================================================================

    fn pricing_inputs<'a>(
        &self,
        snapshot: &'a ConfigurationSnapshot,
        extra_channels: i64,
    ) -> PricingInputs<'a> {
        let coupon_discount = self
            .coupon
            .as_ref()
            .map(|c| c.amount)
            .unwrap_or(Decimal::ZERO);
        let onboarding_discount = if self.subscription.is_trial() {
            let progress =
                OnboardingProgress::derive(&self.config, self.connection.state(), PlanTier::Trial);
            onboarding_discount(&self.table, &progress)
        } else {
            Decimal::ZERO
        };
        PricingInputs {
            coupon_discount,
            onboarding_discount,
            ..PricingInputs::new(snapshot, extra_channels)
        }
    }

    fn breakdown(&self) -> PriceBreakdown {
        let inputs = self.pricing_inputs(&self.config.snapshot, self.config.extra_channels_count);
        quote(&self.table, &inputs)
    }

    /// (plan tier, tier used for the mass-sender gate)
    fn entitlement_tiers(
        &self,
        snapshot: &ConfigurationSnapshot,
        extra_channels: i64,
    ) -> (PlanTier, PlanTier) {
        let inputs = self.pricing_inputs(snapshot, extra_channels);
        let tier = if self.subscription.is_trial() {
            PlanTier::Trial
        } else {
            let total = self
                .subscription
                .override_total
                .unwrap_or_else(|| quote(&self.table, &inputs).total);
            classify_paid(&self.table, total)
        };
        (tier, mass_sender_tier(&self.table, &inputs, tier))
    }

    /// Monthly total; an operator override replaces the computed one
    pub fn total(&self) -> Decimal {
        self.subscription
            .override_total
            .unwrap_or_else(|| self.breakdown().total)
    }

    /// Trial while on the trial plan, otherwise classified from the total
    pub fn plan_tier(&self) -> PlanTier {
        if self.subscription.is_trial() {
            PlanTier::Trial
        } else {
            classify_paid(&self.table, self.total())
        }
    }

    pub fn onboarding(&self) -> OnboardingProgress {
        OnboardingProgress::derive(&self.config, self.connection.state(), self.plan_tier())
    }

    pub fn quote(&self) -> Quote {
        let breakdown = self.breakdown();
        let total = self.subscription.override_total.unwrap_or(breakdown.total);
        let (tier, mass_tier) =
            self.entitlement_tiers(&self.config.snapshot, self.config.extra_channels_count);
        Quote {
            tier,
            plan_label: tier.label(),
            total,
            upgrade_value: upgrade_value(
                &self.table,
                total,
                self.subscription.is_active_subscriber(),
            ),
            coupon: self.coupon.clone(),
            onboarding: self.onboarding(),
            mass_sender_unlocked: is_feature_unlocked(
                Feature::MassSender,
                mass_tier,
                self.config.extra_channels_count,
            ),
            breakdown,
        }
    }

    /// Apply a coupon against the live subtotal
    ///
    /// A rejected code also removes the coupon applied before it.
    pub fn apply_coupon(&mut self, code: &str) -> Result<Coupon, CouponError> {
        match validate_coupon(&self.table, code, self.breakdown().subtotal) {
            Ok(coupon) => {
                tracing::info!(code = %coupon.code, amount = %coupon.amount, "Coupon applied");
                self.coupon = Some(coupon.clone());
                Ok(coupon)
            }
            Err(e) => {
                self.coupon = None;
                Err(e)
            }
        }
    }

    pub fn clear_coupon(&mut self) {
        self.coupon = None;
    }

    fn revalidate_coupon(&mut self) -> Option<CouponError> {
        let code = self.coupon.as_ref()?.code.clone();
        match validate_coupon(&self.table, &code, self.breakdown().subtotal) {
            Ok(coupon) => {
                self.coupon = Some(coupon);
                None
            }
            Err(e) => {
                tracing::info!(code = %code, reason = %e, "Coupon removed");
                self.coupon = None;
                Some(e)
            }
        }
    }

    /// Route the current plan to sales contact, no charge or the checkout
    pub async fn checkout(&mut self) -> AppResult<CheckoutOutcome> {
        self.ensure_ready()?;
        let quote = self.quote();
        let active = self.subscription.is_active_subscriber();

        match route_checkout(&self.table, quote.total, active) {
            CheckoutRoute::HighTicket { value } => {
                tracing::info!(value = %value, "High-ticket plan routed to sales");
                Ok(CheckoutOutcome::HighTicket {
                    value,
                    contact_link: contact_link(
                        &self.settings.sales_contact_number,
                        &high_ticket_message(value),
                    ),
                })
            }
            CheckoutRoute::NoCharge => {
                self.save_config().await?;
                Ok(CheckoutOutcome::NoCharge)
            }
            CheckoutRoute::Charge { value, kind } => {
                let order = CheckoutOrder {
                    user_id: self.identity.user_id.clone(),
                    email: self.identity.email.clone(),
                    total: value,
                    coupon_code: self.coupon.as_ref().map(|c| c.code.clone()),
                    onboarding_discount: quote.breakdown.onboarding_discount,
                    kind,
                    details: OrderDetails::from_snapshot(
                        &self.config.snapshot,
                        self.config.extra_channels_count,
                    ),
                };
                match self.services.checkout.submit(&order).await {
                    Ok(markup) => Ok(CheckoutOutcome::Checkout {
                        value,
                        kind,
                        markup,
                    }),
                    Err(e) => {
                        tracing::warn!(error = %e, "Checkout failed, falling back to sales contact");
                        Ok(CheckoutOutcome::Fallback {
                            contact_link: contact_link(
                                &self.settings.sales_contact_number,
                                SUPPORT_MESSAGE,
                            ),
                            reason: e.message,
                        })
                    }
                }
            }
        }
    }

    // ========================================================================
    // Assistant chat
    // ========================================================================

    /// Send a message to the assistant workflow and return its reply
    ///
    /// The question is stored before it is sent and a storage failure
    /// aborts the exchange. Failing to store the reply only logs a warning.
    pub async fn ask_assistant(&mut self, message: &str) -> AppResult<String> {
        self.ensure_ready()?;
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::validation("Message is empty"));
        }
        if self.is_trial_expired() {
            return Err(AppError::new(ErrorCode::TrialExpired));
        }

        let question = ChatMessage::new(&self.conversation_id, ChatRole::User, message, self.now());
        self.services
            .store
            .append_chat_message(&self.identity.user_id, &question)
            .await?;
        self.chat_history.push(question);

        let request = ConversationRequest::user_message(
            &self.identity.user_id,
            &self.identity.email,
            message,
            &self.conversation_id,
            self.now(),
        );
        let reply = self.services.conversation.send(&request).await?;

        let answer = ChatMessage::new(&self.conversation_id, ChatRole::Assistant, &reply, self.now());
        if let Err(e) = self
            .services
            .store
            .append_chat_message(&self.identity.user_id, &answer)
            .await
        {
            tracing::warn!(conversation = %self.conversation_id, error = %e, "Failed to store assistant reply");
        }
        self.chat_history.push(answer);
        Ok(reply)
    }

    /// Delete the stored history and start a new conversation
    pub async fn clear_chat_history(&mut self) -> AppResult<()> {
        self.ensure_ready()?;
        self.services
            .store
            .clear_chat_messages(&self.identity.user_id)
            .await?;
        self.chat_history.clear();
        self.conversation_id = Uuid::new_v4().to_string();
        tracing::info!(tenant = %self.identity.user_id, "Chat history cleared");
        Ok(())
    }
}
