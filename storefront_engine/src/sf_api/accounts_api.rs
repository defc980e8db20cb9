//! The customer account area: a signed-in customer's orders and subscriptions.

use std::fmt::Debug;

use log::trace;

use crate::{
    db_types::{Order, OrderDetail, OrderNumber, Subscription},
    traits::{OrderFlowError, OrderManagement, SubscriptionError, SubscriptionManagement},
};

pub struct AccountApi<B> {
    db: B,
}

impl<B> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi")
    }
}

/// An order belongs to a customer if it carries their user id, or if it was a guest order placed with their email.
pub fn is_owned_by(order: &Order, user_id: &str, email: Option<&str>) -> bool {
    match (&order.user_id, email) {
        (Some(owner), _) => owner == user_id,
        (None, Some(email)) => !email.trim().is_empty() && order.email.trim().eq_ignore_ascii_case(email.trim()),
        (None, None) => false,
    }
}

impl<B> AccountApi<B>
where B: OrderManagement + SubscriptionManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// The customer's own orders together with any guest orders placed with the same email, newest first.
    pub async fn orders_for_customer(&self, user_id: &str, email: Option<&str>) -> Result<Vec<Order>, OrderFlowError> {
        let mut orders = self.db.fetch_orders_for_user(user_id).await?;
        if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
            let guest_orders = self.db.fetch_orders_for_email(email).await?;
            trace!("Found {} guest orders for {user_id}", guest_orders.len());
            for order in guest_orders {
                if !orders.iter().any(|o| o.id == order.id) {
                    orders.push(order);
                }
            }
        }
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    /// The order with its items and address, but only if it belongs to the customer. Orders belonging to someone
    /// else are reported as absent.
    pub async fn order_for_customer(
        &self,
        number: &OrderNumber,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<Option<OrderDetail>, OrderFlowError> {
        let detail = self.db.fetch_order_detail(number).await?;
        Ok(detail.filter(|d| is_owned_by(&d.order, user_id, email)))
    }

    pub async fn subscriptions_for_user(&self, user_id: &str) -> Result<Vec<Subscription>, SubscriptionError> {
        self.db.fetch_subscriptions_for_user(user_id).await
    }
}
