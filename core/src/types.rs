//! Typed parameter shapes for the convenience entry points.
//!
//! # Design
//! Each struct serializes to exactly the parameter map the gateway expects
//! for one action; the typed helpers on `PaygateClient` serialize them and go
//! through `dispatch`, so there is one code path for every call. Optional
//! fields are omitted rather than sent as `null`.

use serde::{ser::Error as _, Deserialize, Serialize, Serializer};

/// Cardholder details attached to prime payments and card binding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cardholder {
    pub phone_number: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Card gateway (`tappayAction`)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayByPrime {
    pub prime: String,
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    pub cardholder: Cardholder,
    /// Ask the gateway to return a card key/token pair for later use.
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayByToken {
    pub card_key: String,
    pub card_token: String,
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BindCard {
    pub prime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub cardholder: Cardholder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoveCard {
    pub card_key: String,
    pub card_token: String,
}

/// Filters for the transaction record query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TradeQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rec_trade_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TradeHistory {
    pub rec_trade_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Refund {
    pub rec_trade_id: String,
    /// Partial refund amount; the full amount is refunded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

// ---------------------------------------------------------------------------
// ATM virtual accounts (`atmAction`)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtmPayByPrime {
    pub prime: String,
    pub amount: i64,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    /// Days until the virtual account expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardholder: Option<Cardholder>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reconciliation {
    /// Inclusive, `YYYY-MM-DD`.
    pub start_date: String,
    /// Inclusive, `YYYY-MM-DD`.
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulatePaid {
    pub rec_trade_id: String,
    pub amount: i64,
}

// ---------------------------------------------------------------------------
// Merchant onboarding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MerchantProfile {
    pub partner_account: String,
    pub name: String,
    pub tax_id: String,
    pub contact_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MerchantQuery {
    pub partner_account: String,
}

// ---------------------------------------------------------------------------
// Platform card and payment actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformBindCard {
    pub partner_account: String,
    pub prime: String,
    pub cardholder: Cardholder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformPayByPrime {
    pub partner_account: String,
    pub prime: String,
    pub amount: i64,
    pub details: String,
    pub cardholder: Cardholder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformPayByToken {
    pub partner_account: String,
    pub card_key: String,
    pub card_token: String,
    pub amount: i64,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
}

// ---------------------------------------------------------------------------
// Currency lookup
// ---------------------------------------------------------------------------

/// Rounding direction applied to the converted amount.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rounding {
    #[default]
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrencyExchange {
    pub from: String,
    pub to: String,
    #[serde(serialize_with = "serialize_amount")]
    pub from_amount: f64,
    #[serde(rename = "type", default)]
    pub rounding: Rounding,
    /// Decimal places in the converted amount.
    #[serde(default = "default_point")]
    pub point: u8,
}

fn default_point() -> u8 {
    3
}

/// Largest integer an `f64` holds exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Whole amounts go out as integers (`1000`, not `1000.0`). NaN and
/// infinities are refused.
fn serialize_amount<S: Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if !amount.is_finite() {
        return Err(S::Error::custom(format!("amount must be a finite number, got {amount}")));
    }
    if amount.fract() == 0.0 && amount.abs() <= MAX_EXACT_INTEGER {
        serializer.serialize_i64(*amount as i64)
    } else {
        serializer.serialize_f64(*amount)
    }
}

impl CurrencyExchange {
    /// Conversion rounded up to three decimal places.
    pub fn new(from: &str, to: &str, from_amount: f64) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            from_amount,
            rounding: Rounding::default(),
            point: default_point(),
        }
    }
}

// ---------------------------------------------------------------------------
// Orders and third-party redirect payment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateOrder {
    pub partner_account: String,
    pub amount: i64,
    pub currency: String,
    pub items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedirectPayment {
    pub order_number: String,
    pub amount: i64,
    pub item_name: String,
    pub return_url: String,
    pub notify_url: String,
}
