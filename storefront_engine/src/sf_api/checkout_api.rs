//! Cart pricing and order placement.
//!
//! Prices always come from the catalog. The amounts a client shows in its cart are never trusted.
use std::fmt::Debug;

use log::*;
use regex::Regex;
use sf_common::Cents;

use crate::{
    db_types::{NewOrder, NewOrderItem, OrderDetail, OrderNumber, Product},
    events::{EventProducers, OrderCreatedEvent},
    sf_api::{
        errors::CheckoutError,
        order_objects::{CartItem, CartQuote, CheckoutRequest, QuotedLine, ShippingRates, MAX_LINE_QUANTITY},
    },
    traits::{CatalogManagement, OrderManagement},
};

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

pub fn is_valid_email(email: &str) -> bool {
    Regex::new(EMAIL_PATTERN).map(|re| re.is_match(email)).unwrap_or(false)
}

fn check_line_quantity(product: &Product, quantity: i64) -> Result<(), CheckoutError> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(CheckoutError::InvalidQuantity { product: product.name.clone(), quantity, max: MAX_LINE_QUANTITY })
    }
}

pub struct CheckoutApi<B> {
    db: B,
    shipping: ShippingRates,
    producers: EventProducers,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({:?})", self.shipping)
    }
}

impl<B> CheckoutApi<B> {
    pub fn new(db: B, shipping: ShippingRates, producers: EventProducers) -> Self {
        Self { db, shipping, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn shipping_rates(&self) -> ShippingRates {
        self.shipping
    }
}

impl<B> CheckoutApi<B>
where B: OrderManagement + CatalogManagement
{
    /// Prices the cart from the current catalog.
    ///
    /// Every product must exist and be active. Each submitted line must order `1..=MAX_LINE_QUANTITY` units. Repeated
    /// lines for the same product are then merged, and the merged quantity must also stay within the cap and the
    /// stock on hand.
    pub async fn quote_cart(&self, items: &[CartItem]) -> Result<CartQuote, CheckoutError> {
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            if !ids.contains(&item.product_id) {
                ids.push(item.product_id);
            }
        }
        let products = self.db.fetch_products_by_ids(&ids).await?;
        let mut merged: Vec<(&Product, i64)> = Vec::with_capacity(ids.len());
        for item in items {
            let product = products
                .iter()
                .find(|p| p.id == item.product_id)
                .ok_or(CheckoutError::UnknownProduct(item.product_id))?;
            if !product.active {
                return Err(CheckoutError::ProductUnavailable(product.name.clone()));
            }
            check_line_quantity(product, item.quantity)?;
            match merged.iter_mut().find(|(p, _)| p.id == product.id) {
                Some((_, quantity)) => {
                    *quantity = quantity.checked_add(item.quantity).ok_or_else(|| CheckoutError::InvalidQuantity {
                        product: product.name.clone(),
                        quantity: i64::MAX,
                        max: MAX_LINE_QUANTITY,
                    })?;
                },
                None => merged.push((product, item.quantity)),
            }
        }
        let mut lines = Vec::with_capacity(merged.len());
        for (product, quantity) in merged {
            check_line_quantity(product, quantity)?;
            if product.stock < quantity {
                return Err(CheckoutError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.stock,
                    requested: quantity,
                });
            }
            lines.push(QuotedLine {
                product_id: product.id,
                slug: product.slug.clone(),
                name: product.name.clone(),
                unit_price: product.price,
                quantity,
                line_total: product.price * quantity,
            });
        }
        let subtotal: Cents = lines.iter().map(|l| l.line_total).sum();
        let shipping_cost = self.shipping.cost_for(subtotal);
        let total = subtotal + shipping_cost;
        trace!("🛒️ Quoted {} lines: {subtotal} + {shipping_cost} shipping = {total}", lines.len());
        Ok(CartQuote { lines, subtotal, shipping_cost, total })
    }

    /// Validates the checkout form, prices the cart, and stores the order with its items and shipping address.
    ///
    /// Either a signed-in user id or a valid guest email is required. The new order starts with `Pending` payment and
    /// shipping statuses.
    pub async fn place_order(&self, request: CheckoutRequest) -> Result<OrderDetail, CheckoutError> {
        let CheckoutRequest { user_id, email, items, shipping_address, payment_method, notes } = request;
        let user_id = user_id.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        let email = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
        let email = match (&user_id, email) {
            (None, None) => {
                return Err(CheckoutError::Validation("A guest checkout requires an email address".into()));
            },
            (_, Some(email)) if !is_valid_email(&email) => {
                return Err(CheckoutError::Validation(format!("'{email}' is not a valid email address")));
            },
            (_, Some(email)) => email,
            (Some(_), None) => String::default(),
        };
        let missing = shipping_address.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::Validation(format!(
                "The shipping address is missing required fields: {}",
                missing.join(", ")
            )));
        }
        let quote = self.quote_cart(&items).await?;
        let order = NewOrder {
            order_number: OrderNumber::new_random(),
            user_id,
            email,
            subtotal: quote.subtotal,
            shipping_cost: quote.shipping_cost,
            total: quote.total,
            payment_method,
            notes: notes.filter(|n| !n.trim().is_empty()),
            items: quote
                .lines
                .into_iter()
                .map(|l| NewOrderItem {
                    product_id: l.product_id,
                    product_name: l.name,
                    unit_price: l.unit_price,
                    quantity: l.quantity,
                })
                .collect(),
            shipping_address,
        };
        let detail = self.db.insert_order(order).await?;
        info!(
            "🛒️ Order {} placed for {} ({} payment, {} items)",
            detail.order.order_number,
            detail.order.total,
            detail.order.payment_method,
            detail.items.len()
        );
        self.producers.publish_order_created(OrderCreatedEvent::new(detail.clone())).await;
        Ok(detail)
    }
}
