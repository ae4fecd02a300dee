//! Subscription model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plan type written for every new signup
pub const TRIAL_PLAN_TYPE: &str = "trial_7_days";

/// Commercial tier
///
/// Paid tiers are derived from the monthly total via fixed breakpoints;
/// `Trial` does not depend on price. Ordering follows the tier ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Trial,
    Base,
    Start,
    Premium,
    Enterprise,
}

impl PlanTier {
    /// Display name shown on the plan card
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Trial => "Trial Grátis",
            Self::Base => "Plano Base",
            Self::Start => "Plano Start",
            Self::Premium => "Plano Premium",
            Self::Enterprise => "Enterprise",
        }
    }

    pub const fn is_trial(&self) -> bool {
        matches!(self, Self::Trial)
    }
}

/// Subscription status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
    #[default]
    Unknown,
}

impl SubscriptionStatus {
    /// Parse a status string as written by the payment provider
    ///
    /// Several providers report a settled payment with different words; all
    /// of them mean the subscription is active.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" | "completed" | "approved" | "paid" | "succeeded" => Self::Active,
            "past_due" => Self::PastDue,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Unknown,
        }
    }

    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Operator-controlled extras stored in the `addons` JSON column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionAddons {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub override_total: Option<Decimal>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Row of the `subscriptions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    #[serde(default)]
    pub plan_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addons: Option<SubscriptionAddons>,
}

impl SubscriptionRecord {
    /// The record created for a tenant without a subscription
    pub fn new_trial() -> Self {
        Self {
            plan_type: Some(TRIAL_PLAN_TYPE.to_string()),
            status: Some("active".to_string()),
            addons: None,
        }
    }
}

/// Subscription as seen by the core
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionState {
    /// Raw plan type, kept for writes
    pub plan_type: String,
    pub status: SubscriptionStatus,
    /// Operator-set total replacing the computed one
    pub override_total: Option<Decimal>,
}

impl SubscriptionState {
    pub fn trial() -> Self {
        Self::from(SubscriptionRecord::new_trial())
    }

    /// Whether the tenant is still on the free trial plan
    pub fn is_trial(&self) -> bool {
        matches!(self.plan_type.as_str(), TRIAL_PLAN_TYPE | "trial")
    }

    /// An active tenant on a paid plan
    pub fn is_active_subscriber(&self) -> bool {
        self.status.is_active() && !self.is_trial()
    }
}

impl From<SubscriptionRecord> for SubscriptionState {
    fn from(record: SubscriptionRecord) -> Self {
        Self {
            plan_type: record
                .plan_type
                .unwrap_or_else(|| TRIAL_PLAN_TYPE.to_string()),
            status: record
                .status
                .as_deref()
                .map(SubscriptionStatus::parse)
                .unwrap_or_default(),
            override_total: record
                .addons
                .and_then(|a| a.override_total)
                .filter(|v| *v > Decimal::ZERO),
        }
    }
}
