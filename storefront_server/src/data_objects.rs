//! Request and response bodies that only exist at the HTTP boundary. Everything else is (de)serialized straight from
//! the engine's types.
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_engine::{
    db_types::{
        DeliveryStatus,
        NewETransferPayment,
        OrderNumber,
        PaymentMethod,
        PaymentStatus,
        ShippingStatus,
        SolanaPaymentStatus,
    },
    order_objects::CartItem,
    OrderQueryFilter,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartQuoteRequest {
    pub items: Vec<CartItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCheckoutResponse {
    pub order_number: OrderNumber,
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolanaCheckoutResponse {
    pub order_number: OrderNumber,
    pub reference: String,
    pub recipient: String,
    pub spl_token: Option<String>,
    /// Whole tokens, as written in the transfer request URL
    pub amount: String,
    pub url: String,
    pub qr_svg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolanaStatusResponse {
    pub order_number: OrderNumber,
    pub reference: String,
    pub status: SolanaPaymentStatus,
    pub payment_status: PaymentStatus,
    pub signature: Option<String>,
    /// Why a transaction carrying the reference was not accepted, if one was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ETransferInstructions {
    pub order_number: OrderNumber,
    pub amount: String,
    pub recipient_email: Option<String>,
    /// Customers put this in the transfer message so the payment can be matched to the order.
    pub message: String,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionAction {
    Pause,
    Resume,
    Cancel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusUpdate {
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingStatusUpdate {
    pub status: ShippingStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ETransferRecordRequest {
    #[serde(flatten)]
    pub payment: NewETransferPayment,
    #[serde(default)]
    pub mark_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeliveryRequest {
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatusUpdate {
    pub status: DeliveryStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateUpdate {
    pub currency: String,
    /// USD price of one whole unit, e.g. `"142.57"`
    pub rate: String,
}

/// Query string of the admin order search. Statuses are comma separated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSearchParams {
    pub order_number: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<String>,
    pub shipping_status: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderSearchParams {
    pub fn into_filter(self) -> Result<OrderQueryFilter, String> {
        fn statuses<T: std::str::FromStr>(s: Option<String>) -> Result<Vec<T>, String>
        where T::Err: Display {
            s.map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| s.parse::<T>().map_err(|e| e.to_string()))
                    .collect()
            })
            .unwrap_or_else(|| Ok(vec![]))
        }
        Ok(OrderQueryFilter {
            order_number: self.order_number.filter(|s| !s.is_empty()).map(OrderNumber::from),
            user_id: self.user_id.filter(|s| !s.is_empty()),
            email: self.email.filter(|s| !s.is_empty()),
            payment_method: self.payment_method,
            payment_status: statuses(self.payment_status)?,
            shipping_status: statuses(self.shipping_status)?,
            since: self.since,
            until: self.until,
        })
    }
}
