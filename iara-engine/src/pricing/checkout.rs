//! Checkout routing
//!
//! Decides how a plan change is paid: human sales contact for high-ticket
//! plans, no charge when an active subscriber's plan does not go up, or an
//! order sent to the checkout provider.

use reqwest::Url;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::ConfigurationSnapshot;

use super::table::PricingTable;

const CONTACT_BASE: &str = "https://wa.me/";

/// Whether the order starts a subscription or upgrades an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutKind {
    New,
    Upgrade,
}

/// Outcome of checkout routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutRoute {
    /// Above the highest breakpoint; closed by a salesperson
    HighTicket { value: Decimal },
    /// Active subscriber whose total does not exceed the base fee
    NoCharge,
    /// Send an order to the checkout provider
    Charge { value: Decimal, kind: CheckoutKind },
}

/// Amount to charge: an active subscriber pays `max(0, total - base_fee)`
pub fn upgrade_value(table: &PricingTable, total: Decimal, active_subscriber: bool) -> Decimal {
    if active_subscriber {
        (total - table.base_fee).max(Decimal::ZERO)
    } else {
        total
    }
}

pub fn route_checkout(table: &PricingTable, total: Decimal, active_subscriber: bool) -> CheckoutRoute {
    let upgrade = upgrade_value(table, total, active_subscriber);
    let value = if active_subscriber && upgrade > Decimal::ZERO {
        upgrade
    } else {
        total
    };

    if value > table.premium_tier_max {
        return CheckoutRoute::HighTicket { value };
    }
    if active_subscriber && upgrade <= Decimal::ZERO {
        return CheckoutRoute::NoCharge;
    }
    CheckoutRoute::Charge {
        value,
        kind: if active_subscriber {
            CheckoutKind::Upgrade
        } else {
            CheckoutKind::New
        },
    }
}

/// WhatsApp deep link with a prefilled message
pub fn contact_link(number: &str, text: &str) -> String {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    match Url::parse(CONTACT_BASE).and_then(|base| base.join(&digits)) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("text", text);
            url.to_string()
        }
        Err(_) => format!("{CONTACT_BASE}{digits}"),
    }
}

pub fn high_ticket_message(total: Decimal) -> String {
    format!("Olá, gostaria de fechar meu plano Enterprise no valor de R${total}.")
}

pub const SUPPORT_MESSAGE: &str = "Olá, gostaria de assinar o plano IARA Gym.";

/// Snapshot summary sent along with an order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetails {
    #[serde(rename = "filiais")]
    pub branches: usize,
    pub omnichannel: bool,
    #[serde(rename = "canais_extras")]
    pub extra_channels: i64,
    #[serde(rename = "agenda")]
    pub calendar: bool,
    #[serde(rename = "pagamentos")]
    pub payment_recognition: bool,
    #[serde(rename = "disparador")]
    pub mass_sender: bool,
    #[serde(rename = "api_oficial")]
    pub official_api: bool,
    #[serde(rename = "usuarios_extras")]
    pub extra_users: i64,
}

/// Order posted to the checkout provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutOrder {
    pub user_id: String,
    pub email: String,
    #[serde(rename = "valor_total", with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(rename = "cupom_aplicado")]
    pub coupon_code: Option<String>,
    #[serde(rename = "desconto_onboarding", with = "rust_decimal::serde::float")]
    pub onboarding_discount: Decimal,
    #[serde(rename = "tipo_pagamento")]
    pub kind: CheckoutKind,
    #[serde(rename = "detalhes")]
    pub details: OrderDetails,
}

impl OrderDetails {
    pub fn from_snapshot(snapshot: &ConfigurationSnapshot, extra_channels: i64) -> Self {
        Self {
            branches: snapshot.branches.len(),
            omnichannel: snapshot.omnichannel,
            extra_channels: extra_channels.max(0),
            calendar: snapshot.calendar_integration,
            payment_recognition: snapshot.payment_recognition,
            mass_sender: snapshot.mass_sender,
            official_api: snapshot.official_api_connected,
            extra_users: snapshot.extra_users_count.max(0),
        }
    }
}
