//! Coupon validation

use rust_decimal::Decimal;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use super::table::PricingTable;

/// A validated coupon
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coupon {
    /// Normalized (trimmed, uppercase) code
    pub code: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("Invalid or expired coupon")]
    Invalid,
    #[error("Coupon only applies to plans above {base_fee}. Add an add-on to use it")]
    Ineligible { base_fee: Decimal },
}

impl From<CouponError> for AppError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::Invalid => AppError::new(ErrorCode::CouponInvalid),
            CouponError::Ineligible { base_fee } => {
                AppError::with_message(ErrorCode::CouponIneligible, err.to_string())
                    .with_detail("base_fee", base_fee.to_string())
            }
        }
    }
}

/// Look up `code` and check it against the live subtotal
///
/// Lookup is case-insensitive and ignores surrounding whitespace. A known
/// code is still rejected when `subtotal <= base_fee`.
pub fn validate_coupon(
    table: &PricingTable,
    code: &str,
    subtotal: Decimal,
) -> Result<Coupon, CouponError> {
    let normalized = code.trim().to_uppercase();
    let amount = table
        .coupons
        .get(&normalized)
        .copied()
        .ok_or(CouponError::Invalid)?;

    if subtotal <= table.base_fee {
        return Err(CouponError::Ineligible {
            base_fee: table.base_fee,
        });
    }

    Ok(Coupon {
        code: normalized,
        amount,
    })
}
