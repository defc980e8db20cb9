use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderDetail, OrderNumber, PaymentMethod, PaymentStatus, ShippingStatus},
    traits::{ExchangeRateError, OrderQueryFilter},
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("No order is linked to the Stripe checkout session {0}")]
    StripeSessionNotFound(String),
    #[error("No Solana payment request exists for {0}")]
    SolanaPaymentNotFound(String),
    #[error("Order {order} was placed for {expected} payment, not {requested}")]
    PaymentMethodMismatch { order: OrderNumber, expected: PaymentMethod, requested: PaymentMethod },
    #[error("Order {0} has already been paid")]
    AlreadyPaid(OrderNumber),
    #[error("Shipping status cannot move from {from} back to {to}")]
    InvalidShippingTransition { from: ShippingStatus, to: ShippingStatus },
    #[error("A tracking number is required before an order can be marked as shipped")]
    TrackingNumberRequired,
    #[error("Could not price the order. {0}")]
    PricingError(String),
    #[error("{0}")]
    ExchangeRate(#[from] ExchangeRateError),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Storage of orders, their item snapshots and shipping addresses.
///
/// Orders are never deleted. Status fields are plain columns: the last write wins.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Inserts the order, its items and its shipping address atomically. Either all three are stored, or none are.
    async fn insert_order(&self, order: NewOrder) -> Result<OrderDetail, OrderFlowError>;

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderFlowError>;

    /// The order together with its items and shipping address.
    async fn fetch_order_detail(&self, number: &OrderNumber) -> Result<Option<OrderDetail>, OrderFlowError>;

    /// All orders placed while signed in as `user_id`, newest first.
    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderFlowError>;

    /// Guest orders (those without a user id) placed with the given email, newest first.
    async fn fetch_orders_for_email(&self, email: &str) -> Result<Vec<Order>, OrderFlowError>;

    /// Orders matching the filter, oldest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;

    async fn set_payment_status(&self, number: &OrderNumber, status: PaymentStatus) -> Result<Order, OrderFlowError>;

    /// Records the rail's transaction id on the order and sets the payment status in the same write.
    async fn attach_payment_reference(
        &self,
        number: &OrderNumber,
        reference: &str,
        status: PaymentStatus,
    ) -> Result<Order, OrderFlowError>;

    /// Links a Stripe checkout session to the order and marks the payment as `Processing`.
    async fn attach_stripe_session(&self, number: &OrderNumber, session_id: &str) -> Result<Order, OrderFlowError>;

    async fn fetch_order_by_stripe_session(&self, session_id: &str) -> Result<Option<Order>, OrderFlowError>;

    /// Writes the shipping status. A `Some` tracking number replaces the stored one; `None` leaves it untouched.
    async fn set_shipping_status(
        &self,
        number: &OrderNumber,
        status: ShippingStatus,
        tracking_number: Option<String>,
    ) -> Result<Order, OrderFlowError>;
}
