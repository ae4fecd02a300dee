//! Pricing Table
//!
//! Every fee, breakpoint and reward used by the pricing engine. Values are
//! whole currency units (BRL).

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Fees, tier breakpoints, onboarding rewards and the coupon registry
#[derive(Debug, Clone, PartialEq)]
pub struct PricingTable {
    pub base_fee: Decimal,
    pub branch_fee: Decimal,
    pub omnichannel_fee: Decimal,
    pub calendar_fee: Decimal,
    pub payment_recognition_fee: Decimal,
    pub mass_sender_fee: Decimal,
    pub official_api_coexistence_fee: Decimal,
    pub official_api_only_fee: Decimal,
    pub media_manager_fee: Decimal,
    pub extra_channel_fee: Decimal,
    pub extra_user_fee: Decimal,

    /// Inclusive upper bound of the Base tier
    pub base_tier_max: Decimal,
    /// Inclusive upper bound of the Start tier
    pub start_tier_max: Decimal,
    /// Inclusive upper bound of the Premium tier
    pub premium_tier_max: Decimal,

    pub trained_reward: Decimal,
    pub connected_reward: Decimal,
    pub activated_reward: Decimal,

    /// Coupon code (uppercase) -> discount amount
    pub coupons: BTreeMap<String, Decimal>,
}

impl Default for PricingTable {
    fn default() -> Self {
        let coupons = [("IARA50", 50), ("PROMO100", 100), ("PARCEIRO", 150), ("MONARCA200", 200)]
            .into_iter()
            .map(|(code, amount)| (code.to_string(), Decimal::from(amount)))
            .collect();

        Self {
            base_fee: Decimal::from(250),
            branch_fee: Decimal::from(150),
            omnichannel_fee: Decimal::from(150),
            calendar_fee: Decimal::from(50),
            payment_recognition_fee: Decimal::from(50),
            mass_sender_fee: Decimal::from(150),
            official_api_coexistence_fee: Decimal::from(50),
            official_api_only_fee: Decimal::from(150),
            media_manager_fee: Decimal::from(250),
            extra_channel_fee: Decimal::from(50),
            extra_user_fee: Decimal::from(50),

            base_tier_max: Decimal::from(250),
            start_tier_max: Decimal::from(700),
            premium_tier_max: Decimal::from(1250),

            trained_reward: Decimal::from(25),
            connected_reward: Decimal::from(25),
            activated_reward: Decimal::from(50),

            coupons,
        }
    }
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    std::env::var(key)
        .ok()
        .and_then(|v| Decimal::from_str(v.trim()).ok())
        .filter(|v| !v.is_sign_negative())
        .unwrap_or(default)
}

/// Parse `CODE=amount,CODE=amount`; malformed entries are skipped.
fn parse_coupons(raw: &str) -> BTreeMap<String, Decimal> {
    raw.split(',')
        .filter_map(|entry| {
            let (code, amount) = entry.split_once('=')?;
            let code = code.trim().to_uppercase();
            let amount = Decimal::from_str(amount.trim()).ok()?;
            (!code.is_empty() && amount > Decimal::ZERO).then_some((code, amount))
        })
        .collect()
}

impl PricingTable {
    /// Default table with environment overrides
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | PRICE_BASE_FEE | 250 |
    /// | PRICE_BRANCH_FEE | 150 |
    /// | PRICE_OMNICHANNEL_FEE | 150 |
    /// | PRICE_CALENDAR_FEE | 50 |
    /// | PRICE_PAYMENT_RECOGNITION_FEE | 50 |
    /// | PRICE_MASS_SENDER_FEE | 150 |
    /// | PRICE_OFFICIAL_API_COEXISTENCE_FEE | 50 |
    /// | PRICE_OFFICIAL_API_ONLY_FEE | 150 |
    /// | PRICE_MEDIA_MANAGER_FEE | 250 |
    /// | PRICE_EXTRA_CHANNEL_FEE | 50 |
    /// | PRICE_EXTRA_USER_FEE | 50 |
    /// | TIER_BASE_MAX / TIER_START_MAX / TIER_PREMIUM_MAX | 250 / 700 / 1250 |
    /// | REWARD_TRAINED / REWARD_CONNECTED / REWARD_ACTIVATED | 25 / 25 / 50 |
    /// | COUPONS | IARA50=50,PROMO100=100,PARCEIRO=150,MONARCA200=200 |
    pub fn from_env() -> Self {
        let d = Self::default();
        let coupons = std::env::var("COUPONS")
            .ok()
            .map(|raw| parse_coupons(&raw))
            .filter(|c| !c.is_empty())
            .unwrap_or(d.coupons);

        Self {
            base_fee: env_decimal("PRICE_BASE_FEE", d.base_fee),
            branch_fee: env_decimal("PRICE_BRANCH_FEE", d.branch_fee),
            omnichannel_fee: env_decimal("PRICE_OMNICHANNEL_FEE", d.omnichannel_fee),
            calendar_fee: env_decimal("PRICE_CALENDAR_FEE", d.calendar_fee),
            payment_recognition_fee: env_decimal(
                "PRICE_PAYMENT_RECOGNITION_FEE",
                d.payment_recognition_fee,
            ),
            mass_sender_fee: env_decimal("PRICE_MASS_SENDER_FEE", d.mass_sender_fee),
            official_api_coexistence_fee: env_decimal(
                "PRICE_OFFICIAL_API_COEXISTENCE_FEE",
                d.official_api_coexistence_fee,
            ),
            official_api_only_fee: env_decimal(
                "PRICE_OFFICIAL_API_ONLY_FEE",
                d.official_api_only_fee,
            ),
            media_manager_fee: env_decimal("PRICE_MEDIA_MANAGER_FEE", d.media_manager_fee),
            extra_channel_fee: env_decimal("PRICE_EXTRA_CHANNEL_FEE", d.extra_channel_fee),
            extra_user_fee: env_decimal("PRICE_EXTRA_USER_FEE", d.extra_user_fee),

            base_tier_max: env_decimal("TIER_BASE_MAX", d.base_tier_max),
            start_tier_max: env_decimal("TIER_START_MAX", d.start_tier_max),
            premium_tier_max: env_decimal("TIER_PREMIUM_MAX", d.premium_tier_max),

            trained_reward: env_decimal("REWARD_TRAINED", d.trained_reward),
            connected_reward: env_decimal("REWARD_CONNECTED", d.connected_reward),
            activated_reward: env_decimal("REWARD_ACTIVATED", d.activated_reward),

            coupons,
        }
    }

    /// Case-insensitive, trimmed coupon lookup
    pub fn coupon_amount(&self, code: &str) -> Option<Decimal> {
        self.coupons.get(&code.trim().to_uppercase()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let table = PricingTable::default();
        assert_eq!(table.coupon_amount("iara50"), Some(Decimal::from(50)));
        assert_eq!(table.coupon_amount("  Monarca200 "), Some(Decimal::from(200)));
        assert_eq!(table.coupon_amount("FREE"), None);
    }

    #[test]
    fn test_parse_coupons_skips_garbage() {
        let coupons = parse_coupons("vip=300, broken, ZERO=0, =10,black=99.5");
        assert_eq!(coupons.len(), 2);
        assert_eq!(coupons.get("VIP"), Some(&Decimal::from(300)));
        assert_eq!(coupons.get("BLACK"), Some(&Decimal::new(995, 1)));
    }
}
