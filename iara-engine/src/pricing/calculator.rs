//! Price Calculator
//!
//! Monthly price of a tenant configuration. All arithmetic is done in
//! `Decimal`; only the final total is rounded up to a whole currency unit.

use rust_decimal::prelude::*;
use serde::Serialize;
use shared::models::ConfigurationSnapshot;

use super::table::PricingTable;

/// Everything that determines the monthly total
#[derive(Debug, Clone, Copy)]
pub struct PricingInputs<'a> {
    pub snapshot: &'a ConfigurationSnapshot,
    pub extra_channels: i64,
    pub extra_users: i64,
    /// Applied only when the subtotal exceeds the base fee
    pub coupon_discount: Decimal,
    pub onboarding_discount: Decimal,
}

impl<'a> PricingInputs<'a> {
    /// Inputs without any discount
    pub fn new(snapshot: &'a ConfigurationSnapshot, extra_channels: i64) -> Self {
        Self {
            snapshot,
            extra_channels,
            extra_users: snapshot.extra_users_count,
            coupon_discount: Decimal::ZERO,
            onboarding_discount: Decimal::ZERO,
        }
    }
}

/// One line of the price breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceLine {
    pub item: PriceItem,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceItem {
    BasePlan,
    Branches,
    Omnichannel,
    Calendar,
    PaymentRecognition,
    MassSender,
    OfficialApiCoexistence,
    OfficialApiOnly,
    MediaManager,
    ExtraChannels,
    ExtraUsers,
}

/// Full quote shown on the plan card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub lines: Vec<PriceLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    /// Coupon discount actually granted (zero when ineligible)
    #[serde(with = "rust_decimal::serde::float")]
    pub coupon_discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub onboarding_discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

#[inline]
fn clamp_count(count: i64) -> i64 {
    count.max(0)
}

#[inline]
fn clamp_amount(amount: Decimal) -> Decimal {
    amount.max(Decimal::ZERO)
}

/// Non-zero breakdown lines; the base plan line is always present
pub fn price_lines(
    table: &PricingTable,
    snapshot: &ConfigurationSnapshot,
    extra_channels: i64,
    extra_users: i64,
) -> Vec<PriceLine> {
    let mut lines = vec![PriceLine {
        item: PriceItem::BasePlan,
        quantity: 1,
        amount: table.base_fee,
    }];

    let mut per_unit = |item: PriceItem, quantity: i64, fee: Decimal| {
        let quantity = clamp_count(quantity);
        if quantity > 0 {
            lines.push(PriceLine {
                item,
                quantity,
                amount: fee * Decimal::from(quantity),
            });
        }
    };

    per_unit(PriceItem::Branches, snapshot.branches.len() as i64, table.branch_fee);

    let add_ons = [
        (snapshot.omnichannel, PriceItem::Omnichannel, table.omnichannel_fee),
        (snapshot.calendar_integration, PriceItem::Calendar, table.calendar_fee),
        (
            snapshot.payment_recognition,
            PriceItem::PaymentRecognition,
            table.payment_recognition_fee,
        ),
        (snapshot.mass_sender, PriceItem::MassSender, table.mass_sender_fee),
        (
            snapshot.official_api_coexistence,
            PriceItem::OfficialApiCoexistence,
            table.official_api_coexistence_fee,
        ),
        (
            snapshot.official_api_only,
            PriceItem::OfficialApiOnly,
            table.official_api_only_fee,
        ),
        (snapshot.media_manager, PriceItem::MediaManager, table.media_manager_fee),
    ];
    for (enabled, item, fee) in add_ons {
        if enabled {
            per_unit(item, 1, fee);
        }
    }

    per_unit(PriceItem::ExtraChannels, extra_channels, table.extra_channel_fee);
    per_unit(PriceItem::ExtraUsers, extra_users, table.extra_user_fee);

    lines
}

/// Subtotal before any discount
///
/// Base fee, plus branch fee per branch, plus every active add-on, plus the
/// per-unit fees for extra channels and users. Negative counts count as zero.
/// The subtotal is exact; rounding happens on the total only.
pub fn compute_subtotal(
    table: &PricingTable,
    snapshot: &ConfigurationSnapshot,
    extra_channels: i64,
    extra_users: i64,
) -> Decimal {
    let sum: Decimal = price_lines(table, snapshot, extra_channels, extra_users)
        .iter()
        .map(|l| l.amount)
        .sum();
    clamp_amount(sum)
}

/// The coupon discount granted for a given subtotal
///
/// Coupons only apply when the subtotal is strictly above the base fee.
pub fn eligible_coupon_discount(table: &PricingTable, subtotal: Decimal, coupon: Decimal) -> Decimal {
    if subtotal > table.base_fee {
        clamp_amount(coupon)
    } else {
        Decimal::ZERO
    }
}

/// Final monthly total
///
/// `max(0, ceil(subtotal - eligible coupon - onboarding discount))`
pub fn compute_total(table: &PricingTable, inputs: &PricingInputs<'_>) -> Decimal {
    quote(table, inputs).total
}

/// Breakdown, discounts and total in one pass
pub fn quote(table: &PricingTable, inputs: &PricingInputs<'_>) -> PriceBreakdown {
    let lines = price_lines(table, inputs.snapshot, inputs.extra_channels, inputs.extra_users);
    let subtotal = clamp_amount(lines.iter().map(|l| l.amount).sum::<Decimal>());

    let coupon_discount = eligible_coupon_discount(table, subtotal, inputs.coupon_discount);
    let onboarding_discount = clamp_amount(inputs.onboarding_discount);
    let total = clamp_amount((subtotal - coupon_discount - onboarding_discount).ceil());

    PriceBreakdown {
        lines,
        subtotal,
        coupon_discount,
        onboarding_discount,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Branch;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn branches(n: usize) -> Vec<Branch> {
        (0..n)
            .map(|i| Branch {
                id: serde_json::Value::from(i as i64),
                address: format!("Rua {i}"),
            })
            .collect()
    }

    #[test]
    fn test_empty_snapshot_is_base_fee() {
        let table = PricingTable::default();
        let snapshot = ConfigurationSnapshot::default();
        assert_eq!(compute_subtotal(&table, &snapshot, 0, 0), d(250));
        assert_eq!(compute_total(&table, &PricingInputs::new(&snapshot, 0)), d(250));
    }

    #[test]
    fn test_single_add_on_delta() {
        let table = PricingTable::default();
        let base = ConfigurationSnapshot::default();
        let cases = [
            (ConfigurationSnapshot { omnichannel: true, ..base.clone() }, d(150)),
            (ConfigurationSnapshot { calendar_integration: true, ..base.clone() }, d(50)),
            (ConfigurationSnapshot { payment_recognition: true, ..base.clone() }, d(50)),
            (ConfigurationSnapshot { mass_sender: true, ..base.clone() }, d(150)),
            (ConfigurationSnapshot { official_api_coexistence: true, ..base.clone() }, d(50)),
            (ConfigurationSnapshot { official_api_only: true, ..base.clone() }, d(150)),
            (ConfigurationSnapshot { media_manager: true, ..base.clone() }, d(250)),
        ];
        for (snapshot, fee) in cases {
            assert_eq!(compute_subtotal(&table, &snapshot, 0, 0), table.base_fee + fee);
        }
    }

    #[test]
    fn test_per_unit_fees() {
        let table = PricingTable::default();
        let snapshot = ConfigurationSnapshot {
            branches: branches(3),
            ..Default::default()
        };
        assert_eq!(compute_subtotal(&table, &snapshot, 0, 0), d(250 + 450));
        assert_eq!(compute_subtotal(&table, &snapshot, 2, 1), d(250 + 450 + 100 + 50));
    }

    #[test]
    fn test_negative_counts_are_zero() {
        let table = PricingTable::default();
        let snapshot = ConfigurationSnapshot::default();
        assert_eq!(compute_subtotal(&table, &snapshot, -4, -1), d(250));
    }

    #[test]
    fn test_coupon_ignored_at_base_fee() {
        let table = PricingTable::default();
        let snapshot = ConfigurationSnapshot::default();
        let inputs = PricingInputs {
            coupon_discount: d(50),
            ..PricingInputs::new(&snapshot, 0)
        };
        let q = quote(&table, &inputs);
        assert_eq!(q.coupon_discount, Decimal::ZERO);
        assert_eq!(q.total, d(250));
    }

    #[test]
    fn test_total_never_negative() {
        let table = PricingTable::default();
        let snapshot = ConfigurationSnapshot {
            calendar_integration: true,
            ..Default::default()
        };
        let inputs = PricingInputs {
            coupon_discount: d(200),
            onboarding_discount: d(100),
            ..PricingInputs::new(&snapshot, 0)
        };
        assert_eq!(compute_total(&table, &inputs), Decimal::ZERO);
    }

    #[test]
    fn test_total_monotone_in_discounts() {
        let table = PricingTable::default();
        let snapshot = ConfigurationSnapshot {
            omnichannel: true,
            ..Default::default()
        };
        let mut last = compute_total(&table, &PricingInputs::new(&snapshot, 0));
        for step in 1..=20 {
            let inputs = PricingInputs {
                coupon_discount: d(step * 10),
                onboarding_discount: d(step * 5),
                ..PricingInputs::new(&snapshot, 0)
            };
            let total = compute_total(&table, &inputs);
            assert!(total <= last);
            assert!(total >= Decimal::ZERO);
            last = total;
        }
    }

    #[test]
    fn test_fractional_discount_rounds_up_once() {
        let table = PricingTable::default();
        let snapshot = ConfigurationSnapshot {
            omnichannel: true,
            ..Default::default()
        };
        let inputs = PricingInputs {
            coupon_discount: Decimal::new(105, 1),
            onboarding_discount: Decimal::new(205, 1),
            ..PricingInputs::new(&snapshot, 0)
        };
        // 400 - 10.5 - 20.5 = 369
        assert_eq!(compute_total(&table, &inputs), d(369));

        let inputs = PricingInputs {
            coupon_discount: Decimal::new(101, 1),
            ..PricingInputs::new(&snapshot, 0)
        };
        // 400 - 10.1 = 389.9 -> 390
        assert_eq!(compute_total(&table, &inputs), d(390));
    }

    #[test]
    fn test_fractional_fee_stays_exact_until_total() {
        let table = PricingTable {
            branch_fee: Decimal::new(1004, 1),
            ..PricingTable::default()
        };
        let snapshot = ConfigurationSnapshot {
            branches: branches(1),
            ..Default::default()
        };
        assert_eq!(compute_subtotal(&table, &snapshot, 0, 0), Decimal::new(3504, 1));

        let inputs = PricingInputs {
            onboarding_discount: Decimal::new(5, 1),
            ..PricingInputs::new(&snapshot, 0)
        };
        let q = quote(&table, &inputs);
        assert_eq!(q.subtotal, Decimal::new(3504, 1));
        // 350.4 - 0.5 = 349.9 -> 350
        assert_eq!(q.total, d(350));
    }

    #[test]
    fn test_coupon_eligibility_uses_exact_subtotal() {
        let table = PricingTable {
            base_fee: Decimal::new(2504, 1),
            ..PricingTable::default()
        };
        let snapshot = ConfigurationSnapshot::default();
        let inputs = PricingInputs {
            coupon_discount: d(50),
            ..PricingInputs::new(&snapshot, 0)
        };
        // subtotal 250.4 equals the base fee, so the coupon does not apply
        let q = quote(&table, &inputs);
        assert_eq!(q.coupon_discount, Decimal::ZERO);
        assert_eq!(q.total, d(251));
    }

    #[test]
    fn test_breakdown_lines() {
        let table = PricingTable::default();
        let snapshot = ConfigurationSnapshot {
            omnichannel: true,
            branches: branches(2),
            extra_users_count: 1,
            ..Default::default()
        };
        let q = quote(&table, &PricingInputs::new(&snapshot, 1));
        let items: Vec<PriceItem> = q.lines.iter().map(|l| l.item).collect();
        assert_eq!(
            items,
            vec![
                PriceItem::BasePlan,
                PriceItem::Branches,
                PriceItem::Omnichannel,
                PriceItem::ExtraChannels,
                PriceItem::ExtraUsers,
            ]
        );
        assert_eq!(q.subtotal, d(250 + 300 + 150 + 50 + 50));
    }
}
