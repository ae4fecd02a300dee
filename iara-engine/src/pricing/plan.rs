//! Plan tier classification

use rust_decimal::Decimal;
use shared::models::PlanTier;

use super::table::PricingTable;

/// Tier for a monthly total
///
/// A tenant on the trial stays `Trial` whatever the price. Otherwise each
/// breakpoint belongs to the lower tier: `total <= base_tier_max` is Base,
/// `<= start_tier_max` is Start, `<= premium_tier_max` is Premium and
/// anything above is Enterprise.
pub fn classify_plan_name(table: &PricingTable, total: Decimal, current: PlanTier) -> PlanTier {
    if current.is_trial() {
        return PlanTier::Trial;
    }
    classify_paid(table, total)
}

/// Paid tier for a total, ignoring the trial
pub fn classify_paid(table: &PricingTable, total: Decimal) -> PlanTier {
    if total <= table.base_tier_max {
        PlanTier::Base
    } else if total <= table.start_tier_max {
        PlanTier::Start
    } else if total <= table.premium_tier_max {
        PlanTier::Premium
    } else {
        PlanTier::Enterprise
    }
}
