//! Types that map directly onto rows in the storefront database.
//!
//! Status enums are stored as snake_case text, and serialise to JSON the same way.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sf_common::Cents;
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {kind}: {value}")]
pub struct ConversionError {
    pub kind: &'static str,
    pub value: String,
}

impl ConversionError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

/// Implements `Display` and `FromStr` for a unit-variant enum using its snake_case wire names.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $text),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ConversionError::new(stringify!($name), s)),
                }
            }
        }
    };
}

//--------------------------------------     OrderNumber       ---------------------------------------------------------
/// The human-readable order number shown to customers, e.g. `PP-240612-K3Q9ZB`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(String);

const ORDER_NUMBER_PREFIX: &str = "PP";
const ORDER_NUMBER_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ORDER_NUMBER_SUFFIX_LEN: usize = 6;

impl OrderNumber {
    pub fn new_random() -> Self {
        Self::new_random_at(Utc::now())
    }

    pub fn new_random_at(at: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ORDER_NUMBER_SUFFIX_LEN)
            .map(|_| ORDER_NUMBER_CHARS[rng.gen_range(0..ORDER_NUMBER_CHARS.len())] as char)
            .collect();
        Self(format!("{ORDER_NUMBER_PREFIX}-{}-{suffix}", at.format("%y%m%d")))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// True if the number has the `PP-YYMMDD-XXXXXX` shape that [`OrderNumber::new_random`] produces.
    pub fn is_well_formed(&self) -> bool {
        let mut parts = self.0.split('-');
        let prefix = parts.next();
        let date = parts.next();
        let suffix = parts.next();
        prefix == Some(ORDER_NUMBER_PREFIX) &&
            date.map(|d| d.len() == 6 && d.chars().all(|c| c.is_ascii_digit())).unwrap_or(false) &&
            suffix
                .map(|s| {
                    s.len() == ORDER_NUMBER_SUFFIX_LEN && s.bytes().all(|c| ORDER_NUMBER_CHARS.contains(&c))
                })
                .unwrap_or(false) &&
            parts.next().is_none()
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for OrderNumber {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Solana,
    #[sqlx(rename = "etransfer")]
    #[serde(rename = "etransfer", alias = "e_transfer")]
    ETransfer,
}

text_enum!(PaymentMethod { Card => "card", Solana => "solana", ETransfer => "etransfer" });

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// The order exists, but no payment has been started.
    Pending,
    /// A payment has been started on one of the rails and is awaiting an outcome.
    Processing,
    Completed,
    Cancelled,
    Failed,
}

text_enum!(PaymentStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Cancelled => "cancelled",
    Failed => "failed",
});

impl PaymentStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

//--------------------------------------    ShippingStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShippingStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
}

text_enum!(ShippingStatus {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
});

impl ShippingStatus {
    /// Position in the fulfilment sequence. Shipping status never moves to a lower rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Shipped => 2,
            Self::Delivered => 3,
        }
    }

    pub fn can_move_to(&self, next: ShippingStatus) -> bool {
        next.rank() >= self.rank()
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    /// The hosted auth provider's user id. `None` for guest checkouts.
    pub user_id: Option<String>,
    /// Contact email. For guest orders, this is the only link to the customer.
    pub email: String,
    pub subtotal: Cents,
    pub shipping_cost: Cents,
    pub total: Cents,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub shipping_status: ShippingStatus,
    /// Transaction id on the chosen rail: a Stripe payment intent, a Solana signature or an e-transfer reference.
    pub payment_reference: Option<String>,
    pub stripe_session_id: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: Cents,
    pub quantity: i64,
}

impl OrderItem {
    pub fn line_total(&self) -> Cents {
        self.unit_price * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: Cents,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub id: i64,
    pub order_id: i64,
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewShippingAddress {
    /// Returns the names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("full_name", &self.full_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("region", &self.region),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }
}

/// A fully priced order, ready to be written to the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub user_id: Option<String>,
    pub email: String,
    pub subtotal: Cents,
    pub shipping_cost: Cents,
    pub total: Cents,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: NewShippingAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
}

//--------------------------------------       Catalog         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub price: Cents,
    pub stock: i64,
    pub active: bool,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Cents,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Cents>,
    pub stock: Option<i64>,
    pub active: Option<bool>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() &&
            self.description.is_none() &&
            self.price.is_none() &&
            self.stock.is_none() &&
            self.active.is_none() &&
            self.category.is_none() &&
            self.image_url.is_none()
    }
}

//--------------------------------------    Subscriptions      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: i64,
    pub name: String,
    pub interval_days: i64,
    pub discount_percent: i64,
    pub product_count: i64,
    pub trial_days: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubscriptionPlan {
    pub name: String,
    pub interval_days: i64,
    #[serde(default)]
    pub discount_percent: i64,
    pub product_count: i64,
    #[serde(default)]
    pub trial_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Paused,
    Cancelled,
    Expired,
}

text_enum!(SubscriptionStatus {
    Trial => "trial",
    Active => "active",
    Paused => "paused",
    Cancelled => "cancelled",
    Expired => "expired",
});

impl SubscriptionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired)
    }

    /// The subscription lifecycle: Trial/Active may pause, Paused may resume, any live subscription may be cancelled.
    pub fn can_move_to(&self, next: SubscriptionStatus) -> bool {
        use SubscriptionStatus::*;
        matches!((self, next), (Trial | Active, Paused) | (Paused, Active) | (Trial | Active | Paused, Cancelled))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: String,
    pub plan_id: i64,
    pub status: SubscriptionStatus,
    pub product_ids: Json<Vec<i64>>,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub user_id: String,
    pub plan_id: i64,
    pub status: SubscriptionStatus,
    pub product_ids: Vec<i64>,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Scheduled,
    Shipped,
    Delivered,
    Skipped,
}

text_enum!(DeliveryStatus {
    Scheduled => "scheduled",
    Shipped => "shipped",
    Delivered => "delivered",
    Skipped => "skipped",
});

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SubscriptionDelivery {
    pub id: i64,
    pub subscription_id: i64,
    pub scheduled_for: DateTime<Utc>,
    pub status: DeliveryStatus,
    pub amount: Cents,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscriptionDelivery {
    pub subscription_id: i64,
    pub scheduled_for: DateTime<Utc>,
    pub amount: Cents,
}

//--------------------------------------   Payment records     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SolanaPaymentStatus {
    Pending,
    Confirmed,
    Failed,
}

text_enum!(SolanaPaymentStatus { Pending => "pending", Confirmed => "confirmed", Failed => "failed" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SolanaPayment {
    pub id: i64,
    pub order_number: OrderNumber,
    /// Base58 reference key that the payer's transaction must include.
    pub reference: String,
    pub recipient: String,
    /// Mint address. `None` for native SOL.
    pub spl_token: Option<String>,
    pub amount_base_units: i64,
    pub decimals: i64,
    pub status: SolanaPaymentStatus,
    pub signature: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The amount and destination of a Solana Pay transfer for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolanaQuote {
    pub reference: String,
    pub recipient: String,
    pub spl_token: Option<String>,
    pub amount_base_units: i64,
    pub decimals: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ETransferPayment {
    pub id: i64,
    pub order_number: OrderNumber,
    pub sender_name: String,
    pub reference: String,
    pub amount: Cents,
    pub notes: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewETransferPayment {
    pub order_number: OrderNumber,
    pub sender_name: String,
    pub reference: String,
    pub amount: Cents,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub recorded_by: String,
}

//--------------------------------------    Exchange rates     ---------------------------------------------------------
/// The USD price of one whole unit of `base_currency`, in cents.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub base_currency: String,
    pub rate: Cents,
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn new(base_currency: impl Into<String>, rate: Cents) -> Self {
        Self { base_currency: base_currency.into().to_ascii_uppercase(), rate, updated_at: Utc::now() }
    }
}

//--------------------------------------         Role          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

text_enum!(Role { Customer => "customer", Admin => "admin" });
