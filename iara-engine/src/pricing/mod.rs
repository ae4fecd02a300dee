//! Pricing & Entitlement Engine
//!
//! Pure computation over a configuration snapshot: subtotal, discounts and
//! total, plan tier classification, feature gating, onboarding rewards and
//! checkout routing. Nothing in this module performs I/O.

mod calculator;
pub mod checkout;
mod coupon;
mod entitlement;
mod onboarding;
mod plan;
mod table;

pub use calculator::*;
pub use checkout::{CheckoutKind, CheckoutOrder, CheckoutRoute, OrderDetails, route_checkout, upgrade_value};
pub use coupon::*;
pub use entitlement::*;
pub use onboarding::*;
pub use plan::*;
pub use table::PricingTable;
