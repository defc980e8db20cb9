//! `PaymentFlowApi` moves orders through payment and fulfilment in response to Stripe webhooks, Solana lookups and
//! admin actions.
//!
//! Payment and shipping status are plain fields, and every path writes them directly. There is no optimistic
//! concurrency check: if a webhook and an admin write the same order at once, the last write wins.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{
        ETransferPayment,
        NewETransferPayment,
        Order,
        OrderDetail,
        OrderNumber,
        PaymentMethod,
        PaymentStatus,
        ShippingStatus,
        SolanaPayment,
        SolanaPaymentStatus,
        SolanaQuote,
    },
    events::{EventProducers, PaymentStatusChangedEvent, ShippingStatusChangedEvent},
    sf_api::order_objects::{CardOutcome, SolanaAsset},
    traits::{ExchangeRates, OrderFlowError, OrderManagement, OrderQueryFilter, PaymentRecords},
};

const LAMPORTS_PER_SOL: i128 = 1_000_000_000;

pub struct PaymentFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> PaymentFlowApi<B>
where B: OrderManagement + PaymentRecords + ExchangeRates
{
    pub async fn fetch_order(&self, number: &OrderNumber) -> Result<Order, OrderFlowError> {
        self.db.fetch_order_by_number(number).await?.ok_or_else(|| OrderFlowError::OrderNotFound(number.clone()))
    }

    pub async fn order_detail(&self, number: &OrderNumber) -> Result<OrderDetail, OrderFlowError> {
        self.db.fetch_order_detail(number).await?.ok_or_else(|| OrderFlowError::OrderNotFound(number.clone()))
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        trace!("Searching orders. {query}");
        self.db.search_orders(query).await
    }

    fn check_method(order: &Order, requested: PaymentMethod) -> Result<(), OrderFlowError> {
        if order.payment_method != requested {
            return Err(OrderFlowError::PaymentMethodMismatch {
                order: order.order_number.clone(),
                expected: order.payment_method,
                requested,
            });
        }
        if order.payment_status == PaymentStatus::Completed {
            return Err(OrderFlowError::AlreadyPaid(order.order_number.clone()));
        }
        Ok(())
    }

    async fn notify_payment(&self, order: &Order, old_status: PaymentStatus) {
        let event = PaymentStatusChangedEvent::new(order.clone(), old_status);
        self.producers.publish_payment_status_changed(event).await;
    }

    //-----------------------------------------------   Card   ---------------------------------------------------------

    /// The order detail to build a Stripe checkout session from. Fails if the order is not a card order, or has
    /// already been paid.
    pub async fn prepare_card_payment(&self, number: &OrderNumber) -> Result<OrderDetail, OrderFlowError> {
        let detail = self.order_detail(number).await?;
        Self::check_method(&detail.order, PaymentMethod::Card)?;
        Ok(detail)
    }

    /// Links a freshly created Stripe checkout session to the order and marks the payment as `Processing`.
    pub async fn begin_card_payment(&self, number: &OrderNumber, session_id: &str) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(number).await?;
        Self::check_method(&order, PaymentMethod::Card)?;
        let updated = self.db.attach_stripe_session(number, session_id).await?;
        info!("💳️ Order {number} is awaiting Stripe checkout session {session_id}");
        self.notify_payment(&updated, order.payment_status).await;
        Ok(updated)
    }

    /// Applies a verified Stripe outcome to the order linked to the session (or, failing that, to the order number in
    /// the session metadata).
    ///
    /// Re-applying the status the order already has is a no-op, so webhook retries are harmless. A completed order is
    /// never downgraded by a later card outcome. Only a completing outcome may come from a session other than the one
    /// currently linked to the order. Expiries and failures of a replaced session are ignored.
    pub async fn apply_card_outcome(&self, outcome: CardOutcome) -> Result<Order, OrderFlowError> {
        let CardOutcome { session_id, order_number, payment_intent, status } = outcome;
        let order = match self.db.fetch_order_by_stripe_session(&session_id).await? {
            Some(order) => order,
            None => match &order_number {
                Some(number) => self.fetch_order(number).await?,
                None => return Err(OrderFlowError::StripeSessionNotFound(session_id)),
            },
        };
        let number = order.order_number.clone();
        if order.payment_status == status {
            info!("💳️ Order {number} is already {status}. Nothing to do for session {session_id}");
            return Ok(order);
        }
        if order.payment_status == PaymentStatus::Completed {
            warn!("💳️ Ignoring '{status}' outcome from session {session_id}: order {number} has already been paid");
            return Ok(order);
        }
        if let Some(current) = order.stripe_session_id.as_deref() {
            if current != session_id && status != PaymentStatus::Completed {
                info!("💳️ Ignoring '{status}' from replaced session {session_id}. Order {number} now uses {current}");
                return Ok(order);
            }
        }
        let updated = match payment_intent {
            Some(intent) => self.db.attach_payment_reference(&number, &intent, status).await?,
            None => self.db.set_payment_status(&number, status).await?,
        };
        info!("💳️ Order {number} payment moved from {} to {status} by Stripe", order.payment_status);
        self.notify_payment(&updated, order.payment_status).await;
        Ok(updated)
    }

    //-----------------------------------------------   Solana   -------------------------------------------------------

    /// Computes the base-unit amount of `asset` that pays for the order in full.
    ///
    /// USD-pegged tokens map one cent to `10^(decimals - 2)` base units. SOL is converted at the latest `SOL` rate
    /// and rounded up to a whole lamport, so the merchant is never short-changed.
    pub async fn solana_amount_for(&self, order: &Order, asset: &SolanaAsset) -> Result<i64, OrderFlowError> {
        let cents = i128::from(order.total.value());
        if cents <= 0 {
            return Err(OrderFlowError::PricingError(format!("Order {} has no balance to pay", order.order_number)));
        }
        let amount = match asset {
            SolanaAsset::UsdToken { decimals, .. } => {
                let exp = decimals.checked_sub(2).ok_or_else(|| {
                    OrderFlowError::PricingError(format!("A token with {decimals} decimals cannot represent cents"))
                })?;
                10i128.checked_pow(u32::from(exp)).and_then(|scale| cents.checked_mul(scale))
            },
            SolanaAsset::Sol => {
                let rate = self.db.fetch_last_rate("SOL").await?;
                let rate = i128::from(rate.rate.value());
                if rate <= 0 {
                    return Err(OrderFlowError::PricingError("The SOL exchange rate is not positive".into()));
                }
                cents.checked_mul(LAMPORTS_PER_SOL).map(|n| (n + rate - 1) / rate)
            },
        };
        amount
            .and_then(|a| i64::try_from(a).ok())
            .ok_or_else(|| OrderFlowError::PricingError(format!("Order {} is too large to price", order.order_number)))
    }

    /// Builds the Solana Pay quote for the order with a caller-supplied reference key.
    pub async fn solana_quote_for(
        &self,
        order: &Order,
        asset: &SolanaAsset,
        recipient: &str,
        reference: String,
    ) -> Result<SolanaQuote, OrderFlowError> {
        let amount_base_units = self.solana_amount_for(order, asset).await?;
        Ok(SolanaQuote {
            reference,
            recipient: recipient.to_string(),
            spl_token: asset.mint().map(String::from),
            amount_base_units,
            decimals: i64::from(asset.decimals()),
        })
    }

    /// Records a Solana Pay request for the order and marks the payment as `Processing`.
    ///
    /// If the order already has a pending request, that request is returned unchanged and `quote` is discarded, so a
    /// customer refreshing the checkout page keeps the same reference and amount.
    pub async fn begin_solana_payment(
        &self,
        number: &OrderNumber,
        quote: SolanaQuote,
    ) -> Result<SolanaPayment, OrderFlowError> {
        let order = self.fetch_order(number).await?;
        Self::check_method(&order, PaymentMethod::Solana)?;
        if let Some(existing) = self.db.fetch_solana_payment_by_order(number).await? {
            if existing.status == SolanaPaymentStatus::Pending {
                debug!("◎ Order {number} already has pending Solana reference {}", existing.reference);
                return Ok(existing);
            }
        }
        let payment = self.db.insert_solana_payment(number, quote).await?;
        info!(
            "◎ Order {number} awaits {} base units ({} decimals) with reference {}",
            payment.amount_base_units, payment.decimals, payment.reference
        );
        if order.payment_status != PaymentStatus::Processing {
            let updated = self.db.set_payment_status(number, PaymentStatus::Processing).await?;
            self.notify_payment(&updated, order.payment_status).await;
        }
        Ok(payment)
    }

    /// The most recent Solana Pay request for the order.
    pub async fn solana_payment_for(&self, number: &OrderNumber) -> Result<Option<SolanaPayment>, OrderFlowError> {
        self.db.fetch_solana_payment_by_order(number).await
    }

    /// Marks the request with this reference as confirmed and its order as completed, using the transaction
    /// signature as the payment reference. Confirming an already-confirmed request returns the order unchanged.
    pub async fn confirm_solana_payment(&self, reference: &str, signature: &str) -> Result<Order, OrderFlowError> {
        let payment = self
            .db
            .fetch_solana_payment_by_reference(reference)
            .await?
            .ok_or_else(|| OrderFlowError::SolanaPaymentNotFound(reference.to_string()))?;
        let order = self.fetch_order(&payment.order_number).await?;
        if payment.status == SolanaPaymentStatus::Confirmed {
            debug!("◎ Reference {reference} was already confirmed by {:?}", payment.signature);
            return Ok(order);
        }
        self.db.confirm_solana_payment(reference, signature).await?;
        let updated = self.fetch_order(&payment.order_number).await?;
        info!("◎ Order {} paid on-chain. Signature {signature}", updated.order_number);
        self.notify_payment(&updated, order.payment_status).await;
        Ok(updated)
    }

    //-----------------------------------------------   E-transfer   ---------------------------------------------------

    /// Appends an e-transfer observation to the order. When `mark_completed` is set, the order is completed with the
    /// transfer reference as its payment reference.
    pub async fn record_etransfer(
        &self,
        payment: NewETransferPayment,
        mark_completed: bool,
    ) -> Result<(ETransferPayment, Order), OrderFlowError> {
        let order = self.fetch_order(&payment.order_number).await?;
        if order.payment_method != PaymentMethod::ETransfer {
            warn!(
                "🏦️ Recording an e-transfer against order {}, which was placed for {} payment",
                order.order_number, order.payment_method
            );
        }
        if payment.amount != order.total {
            warn!("🏦️ E-transfer of {} does not match the order total of {}", payment.amount, order.total);
        }
        let record = self.db.insert_etransfer_payment(payment).await?;
        info!("🏦️ E-transfer {} of {} recorded for order {}", record.reference, record.amount, record.order_number);
        if !mark_completed || order.payment_status == PaymentStatus::Completed {
            return Ok((record, order));
        }
        let updated =
            self.db.attach_payment_reference(&order.order_number, &record.reference, PaymentStatus::Completed).await?;
        self.notify_payment(&updated, order.payment_status).await;
        Ok((record, updated))
    }

    pub async fn etransfers_for(&self, number: &OrderNumber) -> Result<Vec<ETransferPayment>, OrderFlowError> {
        self.fetch_order(number).await?;
        self.db.fetch_etransfer_payments_for_order(number).await
    }

    //-----------------------------------------------   Admin   --------------------------------------------------------

    /// Sets the payment status directly. Writing the current status again is a logged no-op.
    pub async fn set_payment_status(&self, number: &OrderNumber, status: PaymentStatus) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(number).await?;
        if order.payment_status == status {
            info!("🏦️ Order {number} is already {status}");
            return Ok(order);
        }
        let updated = self.db.set_payment_status(number, status).await?;
        info!("🏦️ Order {number} payment status set from {} to {status}", order.payment_status);
        self.notify_payment(&updated, order.payment_status).await;
        Ok(updated)
    }

    /// Moves the shipping status forward. Steps may be skipped, but never undone. An order can only be marked as
    /// shipped once it has a tracking number, supplied here or stored earlier.
    pub async fn set_shipping_status(
        &self,
        number: &OrderNumber,
        status: ShippingStatus,
        tracking_number: Option<String>,
    ) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(number).await?;
        if !order.shipping_status.can_move_to(status) {
            return Err(OrderFlowError::InvalidShippingTransition { from: order.shipping_status, to: status });
        }
        let tracking_number = tracking_number.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        if status == ShippingStatus::Shipped && tracking_number.is_none() && order.tracking_number.is_none() {
            return Err(OrderFlowError::TrackingNumberRequired);
        }
        let updated = self.db.set_shipping_status(number, status, tracking_number).await?;
        info!("📦️ Order {number} shipping moved from {} to {status}", order.shipping_status);
        let event = ShippingStatusChangedEvent::new(updated.clone(), order.shipping_status);
        self.producers.publish_shipping_status_changed(event).await;
        Ok(updated)
    }
}
