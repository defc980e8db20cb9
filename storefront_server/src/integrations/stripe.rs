use log::*;
use storefront_engine::{
    db_types::{OrderDetail, OrderNumber, PaymentStatus},
    order_objects::CardOutcome,
};
use stripe_tools::{
    CheckoutLineItem,
    CheckoutSession,
    NewCheckoutSession,
    StripeApi,
    StripeApiError,
    StripeEvent,
    StripeEventKind,
    WebhookError,
};

use crate::{config::ServerOptions, errors::ServerError};

/// Creates hosted card checkout pages. Implemented by [`StripeApi`], and mocked in the endpoint tests.
#[allow(async_fn_in_trait)]
pub trait CardProcessor {
    async fn create_session(&self, session: &NewCheckoutSession) -> Result<CheckoutSession, StripeApiError>;
    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, StripeApiError>;
    async fn expire_session(&self, session_id: &str) -> Result<CheckoutSession, StripeApiError>;
}

impl CardProcessor for StripeApi {
    async fn create_session(&self, session: &NewCheckoutSession) -> Result<CheckoutSession, StripeApiError> {
        self.create_checkout_session(session).await
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, StripeApiError> {
        self.retrieve_checkout_session(session_id).await
    }

    async fn expire_session(&self, session_id: &str) -> Result<CheckoutSession, StripeApiError> {
        self.expire_checkout_session(session_id).await
    }
}

/// Closes the order's previous checkout session before a new one is opened, so only one session can take payment.
///
/// An open session is expired. A completed session means the customer has already paid, or a delayed payment is
/// settling, so no new session may be opened.
pub async fn close_previous_session<C: CardProcessor>(
    stripe: &C,
    number: &OrderNumber,
    session_id: &str,
) -> Result<(), ServerError> {
    let session = stripe.retrieve_session(session_id).await?;
    match session.status.as_deref() {
        Some("open") => {
            stripe.expire_session(session_id).await?;
            info!("💳️ Expired checkout session {session_id} of order {number} before opening a new one");
            Ok(())
        },
        Some("complete") => Err(ServerError::Conflict(format!(
            "Checkout session {session_id} for order {number} has already completed. Its payment is being processed"
        ))),
        _ => {
            debug!("💳️ Previous checkout session {session_id} of order {number} is already closed");
            Ok(())
        },
    }
}

/// The checkout session for an order, priced from the stored item snapshots rather than the live catalog.
pub fn checkout_session_for(detail: &OrderDetail, options: &ServerOptions) -> NewCheckoutSession {
    let number = detail.order.order_number.as_str();
    let line_items = detail
        .items
        .iter()
        .map(|i| CheckoutLineItem { name: i.product_name.clone(), unit_amount: i.unit_price, quantity: i.quantity })
        .collect();
    NewCheckoutSession {
        order_number: number.to_string(),
        customer_email: Some(detail.order.email.clone()).filter(|e| !e.is_empty()),
        line_items,
        shipping: detail.order.shipping_cost,
        success_url: options.success_url(number),
        cancel_url: options.cancel_url(number),
    }
}

/// Translates a verified Stripe event into the outcome the engine applies. Events that say nothing about a checkout
/// session's payment give `None`.
pub fn card_outcome(event: &StripeEvent) -> Result<Option<CardOutcome>, WebhookError> {
    let kind = event.kind();
    if kind == StripeEventKind::Other {
        debug!("💳️ Ignoring Stripe event {} ({})", event.id, event.event_type);
        return Ok(None);
    }
    let session = event.checkout_session()?;
    let status = match kind {
        StripeEventKind::CheckoutCompleted if session.is_paid() => PaymentStatus::Completed,
        // Delayed payment methods complete the session before the money arrives
        StripeEventKind::CheckoutCompleted => PaymentStatus::Processing,
        StripeEventKind::CheckoutAsyncSucceeded => PaymentStatus::Completed,
        StripeEventKind::CheckoutAsyncFailed => PaymentStatus::Failed,
        StripeEventKind::CheckoutExpired => PaymentStatus::Cancelled,
        StripeEventKind::Other => return Ok(None),
    };
    trace!("💳️ Stripe event {} maps session {} to {status}", event.id, session.id);
    Ok(Some(CardOutcome {
        order_number: session.order_number().map(OrderNumber::from),
        session_id: session.id,
        payment_intent: session.payment_intent,
        status,
    }))
}
