//! Feature gating by plan tier
//!
//! Decides which features a tenant may switch on and keeps the official API
//! modes mutually exclusive.

use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{ConfigurationSnapshot, PlanTier};

use super::calculator::{PricingInputs, compute_total};
use super::plan::classify_plan_name;
use super::table::PricingTable;

/// Gated features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    MassSender,
    CallHandling,
    AudioReply,
    ImageSend,
    InstagramChannel,
    GroupReply,
    Omnichannel,
    Calendar,
    PaymentRecognition,
    MediaManager,
    OfficialApi,
}

/// Whether `feature` may be enabled at `tier`
///
/// - mass sender: Start or above, never on the trial
/// - call handling, audio reply, image send: any paid tier
/// - Instagram channel: at least one extra channel purchased
/// - everything else: always
pub fn is_feature_unlocked(feature: Feature, tier: PlanTier, extra_channels: i64) -> bool {
    match feature {
        Feature::MassSender => !tier.is_trial() && tier >= PlanTier::Start,
        Feature::CallHandling | Feature::AudioReply | Feature::ImageSend => !tier.is_trial(),
        Feature::InstagramChannel => extra_channels >= 1,
        _ => true,
    }
}

/// Tier used to gate the mass sender
///
/// Classified from the total without the mass sender add-on, so that ticking
/// the add-on cannot lift the tenant into the tier that unlocks it.
pub fn mass_sender_tier(
    table: &PricingTable,
    inputs: &PricingInputs<'_>,
    current: PlanTier,
) -> PlanTier {
    let without = ConfigurationSnapshot {
        mass_sender: false,
        ..inputs.snapshot.clone()
    };
    let total = compute_total(
        table,
        &PricingInputs {
            snapshot: &without,
            ..*inputs
        },
    );
    classify_plan_name(table, total, current)
}

/// Enable or disable official-API-only mode
///
/// Enabling it turns coexistence off and omnichannel on. Disabling it leaves
/// omnichannel as it is. Returns whether omnichannel was switched on.
pub fn set_official_api_only(snapshot: &mut ConfigurationSnapshot, enabled: bool) -> bool {
    snapshot.official_api_only = enabled;
    if !enabled {
        return false;
    }
    snapshot.official_api_coexistence = false;
    let forced = !snapshot.omnichannel;
    snapshot.omnichannel = true;
    forced
}

/// Enable or disable official API coexistence mode
///
/// Enabling it turns official-API-only off.
pub fn set_official_api_coexistence(snapshot: &mut ConfigurationSnapshot, enabled: bool) {
    snapshot.official_api_coexistence = enabled;
    if enabled {
        snapshot.official_api_only = false;
    }
}

/// Reject combinations the product does not allow
pub fn validate_snapshot(snapshot: &ConfigurationSnapshot) -> AppResult<()> {
    if snapshot.official_api_only && snapshot.official_api_coexistence {
        return Err(AppError::with_message(
            ErrorCode::FeatureConflict,
            "Official API coexistence and official-API-only cannot be enabled together",
        )
        .with_detail("features", "official_api_coexistence,official_api_only"));
    }
    Ok(())
}

/// Check that every enabled gated feature is unlocked
pub fn check_entitlements(
    snapshot: &ConfigurationSnapshot,
    tier: PlanTier,
    mass_sender_tier: PlanTier,
    extra_channels: i64,
) -> AppResult<()> {
    let enabled = [
        (snapshot.mass_sender, Feature::MassSender, mass_sender_tier),
        (snapshot.allow_calls, Feature::CallHandling, tier),
        (snapshot.reply_audio, Feature::AudioReply, tier),
        (snapshot.send_images, Feature::ImageSend, tier),
    ];
    for (on, feature, tier) in enabled {
        if on && !is_feature_unlocked(feature, tier, extra_channels) {
            return Err(AppError::new(ErrorCode::FeatureLocked)
                .with_detail("feature", serde_json::to_value(feature).unwrap_or_default()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_trial_locks_paid_behaviour() {
        for feature in [
            Feature::MassSender,
            Feature::CallHandling,
            Feature::AudioReply,
            Feature::ImageSend,
        ] {
            assert!(!is_feature_unlocked(feature, PlanTier::Trial, 5));
        }
        assert!(is_feature_unlocked(Feature::GroupReply, PlanTier::Trial, 0));
        assert!(is_feature_unlocked(Feature::Omnichannel, PlanTier::Trial, 0));
    }

    #[test]
    fn test_mass_sender_needs_start() {
        assert!(!is_feature_unlocked(Feature::MassSender, PlanTier::Base, 0));
        assert!(is_feature_unlocked(Feature::MassSender, PlanTier::Start, 0));
        assert!(is_feature_unlocked(Feature::MassSender, PlanTier::Enterprise, 0));
        assert!(is_feature_unlocked(Feature::CallHandling, PlanTier::Base, 0));
    }

    #[test]
    fn test_instagram_needs_extra_channel() {
        assert!(!is_feature_unlocked(Feature::InstagramChannel, PlanTier::Premium, 0));
        assert!(is_feature_unlocked(Feature::InstagramChannel, PlanTier::Trial, 1));
    }

    #[test]
    fn test_mass_sender_cannot_unlock_itself() {
        let table = PricingTable::default();
        // 250 base + 150 mass sender = 400 (Start), but 250 without it (Base)
        let snapshot = ConfigurationSnapshot {
            mass_sender: true,
            ..Default::default()
        };
        let inputs = PricingInputs::new(&snapshot, 0);
        assert_eq!(compute_total(&table, &inputs), Decimal::from(400));
        assert_eq!(mass_sender_tier(&table, &inputs, PlanTier::Base), PlanTier::Base);

        let snapshot = ConfigurationSnapshot {
            mass_sender: true,
            omnichannel: true,
            ..Default::default()
        };
        let inputs = PricingInputs::new(&snapshot, 0);
        assert_eq!(mass_sender_tier(&table, &inputs, PlanTier::Base), PlanTier::Start);
        assert_eq!(mass_sender_tier(&table, &inputs, PlanTier::Trial), PlanTier::Trial);
    }

    #[test]
    fn test_official_api_modes_are_exclusive() {
        let mut snapshot = ConfigurationSnapshot::default();
        set_official_api_coexistence(&mut snapshot, true);
        assert!(snapshot.official_api_coexistence);

        let forced = set_official_api_only(&mut snapshot, true);
        assert!(forced);
        assert!(snapshot.official_api_only);
        assert!(!snapshot.official_api_coexistence);
        assert!(snapshot.omnichannel);

        set_official_api_only(&mut snapshot, false);
        assert!(snapshot.omnichannel, "disabling only-API keeps omnichannel");

        set_official_api_only(&mut snapshot, true);
        set_official_api_coexistence(&mut snapshot, true);
        assert!(!snapshot.official_api_only);
        assert!(validate_snapshot(&snapshot).is_ok());
    }

    #[test]
    fn test_conflicting_modes_rejected() {
        let snapshot = ConfigurationSnapshot {
            official_api_only: true,
            official_api_coexistence: true,
            ..Default::default()
        };
        let err = validate_snapshot(&snapshot).unwrap_err();
        assert_eq!(err.code, ErrorCode::FeatureConflict);
    }

    #[test]
    fn test_check_entitlements() {
        let snapshot = ConfigurationSnapshot {
            reply_audio: true,
            ..Default::default()
        };
        let err = check_entitlements(&snapshot, PlanTier::Trial, PlanTier::Trial, 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::FeatureLocked);
        assert!(check_entitlements(&snapshot, PlanTier::Base, PlanTier::Base, 0).is_ok());
    }
}
