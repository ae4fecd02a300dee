//! Onboarding checklist and its reward discount

use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{ConnectionState, PlanTier, TenantConfig};

use super::table::PricingTable;

/// Opening hours must be longer than this to count as trained
const TRAINED_MIN_HOURS_CHARS: usize = 5;

/// Checklist progress, derived from the tenant's state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OnboardingProgress {
    /// Opening hours and pricing filled in
    pub trained: bool,
    /// Gateway connected, or the Instagram assistant switched on
    pub connected: bool,
    pub activated: bool,
    /// No longer on the trial plan
    pub upgraded: bool,
}

impl OnboardingProgress {
    pub fn derive(config: &TenantConfig, connection: ConnectionState, tier: PlanTier) -> Self {
        let snapshot = &config.snapshot;
        Self {
            trained: !snapshot.pricing_info.trim().is_empty()
                && snapshot.opening_hours.chars().count() > TRAINED_MIN_HOURS_CHARS,
            connected: connection.is_connected() || config.ai_active_instagram,
            activated: config.ai_active,
            upgraded: !tier.is_trial(),
        }
    }

    /// Number of completed steps out of four
    pub fn completed_steps(&self) -> usize {
        [self.trained, self.connected, self.activated, self.upgraded]
            .iter()
            .filter(|done| **done)
            .count()
    }
}

/// Reward earned for the rewarded steps
pub fn onboarding_discount(table: &PricingTable, progress: &OnboardingProgress) -> Decimal {
    let mut discount = Decimal::ZERO;
    if progress.trained {
        discount += table.trained_reward;
    }
    if progress.connected {
        discount += table.connected_reward;
    }
    if progress.activated {
        discount += table.activated_reward;
    }
    discount
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trained_config() -> TenantConfig {
        let mut config = TenantConfig::default();
        config.snapshot.opening_hours = "Seg-Sex 6h-22h".into();
        config.snapshot.pricing_info = "Mensal R$ 99".into();
        config
    }

    #[test]
    fn test_rewards_add_up() {
        let table = PricingTable::default();
        let mut config = trained_config();
        config.ai_active = true;
        let progress = OnboardingProgress::derive(&config, ConnectionState::Connected, PlanTier::Trial);
        assert_eq!(progress.completed_steps(), 3);
        assert_eq!(onboarding_discount(&table, &progress), Decimal::from(100));
    }

    #[test]
    fn test_short_hours_not_trained() {
        let mut config = trained_config();
        config.snapshot.opening_hours = "6-22h".into();
        let progress =
            OnboardingProgress::derive(&config, ConnectionState::Disconnected, PlanTier::Trial);
        assert!(!progress.trained);
        assert_eq!(onboarding_discount(&PricingTable::default(), &progress), Decimal::ZERO);
    }

    #[test]
    fn test_instagram_counts_as_connected() {
        let mut config = TenantConfig::default();
        config.ai_active_instagram = true;
        let progress =
            OnboardingProgress::derive(&config, ConnectionState::AwaitingScan, PlanTier::Start);
        assert!(progress.connected);
        assert!(progress.upgraded);
        assert_eq!(onboarding_discount(&PricingTable::default(), &progress), Decimal::from(25));
    }
}
