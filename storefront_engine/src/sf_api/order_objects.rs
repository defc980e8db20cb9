use serde::{Deserialize, Serialize};
use sf_common::Cents;

use crate::db_types::{NewShippingAddress, OrderNumber, PaymentMethod, PaymentStatus};

pub const MAX_LINE_QUANTITY: i64 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: i64,
    pub quantity: i64,
}

impl CartItem {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self { product_id, quantity }
    }
}

/// A cart line priced from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotedLine {
    pub product_id: i64,
    pub slug: String,
    pub name: String,
    pub unit_price: Cents,
    pub quantity: i64,
    pub line_total: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartQuote {
    pub lines: Vec<QuotedLine>,
    pub subtotal: Cents,
    pub shipping_cost: Cents,
    pub total: Cents,
}

/// Flat-rate shipping, waived when the subtotal reaches `free_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRates {
    pub flat_rate: Cents,
    pub free_threshold: Option<Cents>,
}

impl Default for ShippingRates {
    fn default() -> Self {
        Self { flat_rate: Cents::from(1500), free_threshold: Some(Cents::from_dollars(200)) }
    }
}

impl ShippingRates {
    pub fn cost_for(&self, subtotal: Cents) -> Cents {
        match self.free_threshold {
            Some(threshold) if subtotal >= threshold => Cents::default(),
            _ => self.flat_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Set by the server from the bearer token. Never taken from the request body.
    #[serde(skip)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub items: Vec<CartItem>,
    pub shipping_address: NewShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

/// The verified result of a Stripe checkout session, as far as the order is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardOutcome {
    pub session_id: String,
    pub order_number: Option<OrderNumber>,
    pub payment_intent: Option<String>,
    pub status: PaymentStatus,
}

/// The asset a Solana Pay request is denominated in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolanaAsset {
    /// Native SOL, priced through the latest `SOL` exchange rate.
    Sol,
    /// An SPL token pegged 1:1 to the US dollar (e.g. USDC).
    UsdToken { mint: String, decimals: u8 },
}

pub const SOL_DECIMALS: u8 = 9;

impl SolanaAsset {
    pub fn decimals(&self) -> u8 {
        match self {
            Self::Sol => SOL_DECIMALS,
            Self::UsdToken { decimals, .. } => *decimals,
        }
    }

    pub fn mint(&self) -> Option<&str> {
        match self {
            Self::Sol => None,
            Self::UsdToken { mint, .. } => Some(mint.as_str()),
        }
    }
}
