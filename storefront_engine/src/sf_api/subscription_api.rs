//! Subscriptions: plans, the customer-driven lifecycle, and admin-created deliveries.
//!
//! Nothing here runs on a timer. A delivery exists only once an admin creates it, and a subscription's billing period
//! only moves when a delivery is created or a paused subscription resumes after its period has lapsed.

use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use sf_common::Cents;

use crate::{
    db_types::{
        DeliveryStatus,
        NewSubscription,
        NewSubscriptionDelivery,
        NewSubscriptionPlan,
        Subscription,
        SubscriptionDelivery,
        SubscriptionPlan,
        SubscriptionStatus,
    },
    traits::{CatalogManagement, SubscriptionError, SubscriptionManagement},
};

/// Who is asking for a lifecycle change. Customers may only act on their own subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester<'a> {
    Customer(&'a str),
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubscriptionRequest {
    pub plan_id: i64,
    pub product_ids: Vec<i64>,
}

pub struct SubscriptionApi<B> {
    db: B,
}

impl<B> Debug for SubscriptionApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SubscriptionApi")
    }
}

fn validate_plan(plan: &NewSubscriptionPlan) -> Result<(), SubscriptionError> {
    let err = |msg: &str| Err(SubscriptionError::Validation(msg.to_string()));
    if plan.name.trim().is_empty() {
        return err("A plan name is required");
    }
    if plan.interval_days < 1 {
        return err("The delivery interval must be at least one day");
    }
    if !(0..=100).contains(&plan.discount_percent) {
        return err("The discount must be between 0 and 100 percent");
    }
    if plan.product_count < 1 {
        return err("A plan must include at least one product");
    }
    if plan.trial_days < 0 {
        return err("Trial days cannot be negative");
    }
    Ok(())
}

impl<B> SubscriptionApi<B>
where B: SubscriptionManagement + CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn plans(&self) -> Result<Vec<SubscriptionPlan>, SubscriptionError> {
        self.db.fetch_plans().await
    }

    pub async fn create_plan(&self, plan: NewSubscriptionPlan) -> Result<SubscriptionPlan, SubscriptionError> {
        validate_plan(&plan)?;
        let plan = self.db.insert_plan(plan).await?;
        info!(
            "🔁️ Plan '{}' created: every {} days, {}% off, {} products",
            plan.name, plan.interval_days, plan.discount_percent, plan.product_count
        );
        Ok(plan)
    }

    async fn fetch_plan(&self, id: i64) -> Result<SubscriptionPlan, SubscriptionError> {
        self.db.fetch_plan(id).await?.ok_or(SubscriptionError::PlanNotFound(id))
    }

    async fn fetch_subscription(&self, id: i64, requester: Requester<'_>) -> Result<Subscription, SubscriptionError> {
        let subscription = self.db.fetch_subscription(id).await?.ok_or(SubscriptionError::SubscriptionNotFound(id))?;
        match requester {
            Requester::Customer(user_id) if subscription.user_id != user_id => Err(SubscriptionError::NotOwner(id)),
            _ => Ok(subscription),
        }
    }

    /// Subscribes the customer to a plan with their chosen products.
    ///
    /// The number of products must equal the plan's product count, and every product must be on sale. The
    /// subscription starts in `Trial` if the plan offers trial days. The first billing period is
    /// `[now, now + interval)` either way.
    pub async fn subscribe(
        &self,
        user_id: &str,
        request: NewSubscriptionRequest,
    ) -> Result<Subscription, SubscriptionError> {
        if user_id.trim().is_empty() {
            return Err(SubscriptionError::Validation("Subscriptions require a signed-in customer".into()));
        }
        let plan = self.fetch_plan(request.plan_id).await?;
        if !plan.active {
            return Err(SubscriptionError::PlanInactive(plan.id));
        }
        if request.product_ids.len() as i64 != plan.product_count {
            return Err(SubscriptionError::ProductCountMismatch {
                expected: plan.product_count,
                actual: request.product_ids.len(),
            });
        }
        let products = self.db.fetch_products_by_ids(&request.product_ids).await?;
        for id in &request.product_ids {
            match products.iter().find(|p| p.id == *id) {
                Some(p) if p.active => {},
                Some(p) => return Err(SubscriptionError::Validation(format!("{} is not available", p.name))),
                None => return Err(SubscriptionError::Validation(format!("Product {id} does not exist"))),
            }
        }
        let status = if plan.trial_days > 0 { SubscriptionStatus::Trial } else { SubscriptionStatus::Active };
        let now = Utc::now();
        let subscription = NewSubscription {
            user_id: user_id.to_string(),
            plan_id: plan.id,
            status,
            product_ids: request.product_ids,
            current_period_start: now,
            current_period_end: now + Duration::days(plan.interval_days),
        };
        let subscription = self.db.insert_subscription(subscription).await?;
        info!("🔁️ {user_id} subscribed to '{}' (subscription #{}, {status})", plan.name, subscription.id);
        Ok(subscription)
    }

    async fn transition(
        &self,
        id: i64,
        requester: Requester<'_>,
        next: SubscriptionStatus,
    ) -> Result<Subscription, SubscriptionError> {
        let subscription = self.fetch_subscription(id, requester).await?;
        if !subscription.status.can_move_to(next) {
            return Err(SubscriptionError::InvalidTransition { from: subscription.status, to: next });
        }
        Ok(subscription)
    }

    pub async fn pause(&self, id: i64, requester: Requester<'_>) -> Result<Subscription, SubscriptionError> {
        self.transition(id, requester, SubscriptionStatus::Paused).await?;
        let subscription = self.db.set_subscription_status(id, SubscriptionStatus::Paused).await?;
        info!("🔁️ Subscription #{id} paused");
        Ok(subscription)
    }

    /// Reactivates a paused subscription. If the billing period lapsed while paused, a fresh period starts now.
    pub async fn resume(&self, id: i64, requester: Requester<'_>) -> Result<Subscription, SubscriptionError> {
        let current = self.transition(id, requester, SubscriptionStatus::Active).await?;
        let now = Utc::now();
        let subscription = if current.current_period_end <= now {
            let plan = self.fetch_plan(current.plan_id).await?;
            let end = now + Duration::days(plan.interval_days);
            debug!("🔁️ Subscription #{id} lapsed while paused. New period ends {end}");
            self.db.advance_billing_period(id, now, end, SubscriptionStatus::Active).await?
        } else {
            self.db.set_subscription_status(id, SubscriptionStatus::Active).await?
        };
        info!("🔁️ Subscription #{id} resumed");
        Ok(subscription)
    }

    pub async fn cancel(&self, id: i64, requester: Requester<'_>) -> Result<Subscription, SubscriptionError> {
        self.transition(id, requester, SubscriptionStatus::Cancelled).await?;
        let subscription = self.db.set_subscription_status(id, SubscriptionStatus::Cancelled).await?;
        info!("🔁️ Subscription #{id} cancelled");
        Ok(subscription)
    }

    pub async fn all_subscriptions(&self) -> Result<Vec<Subscription>, SubscriptionError> {
        self.db.fetch_all_subscriptions().await
    }

    /// Creates the next delivery for a trial or active subscription, priced at the plan discount, and advances the
    /// billing period by one interval. A trial subscription becomes active on its first delivery.
    pub async fn create_delivery(
        &self,
        subscription_id: i64,
        scheduled_for: DateTime<Utc>,
    ) -> Result<(SubscriptionDelivery, Subscription), SubscriptionError> {
        let subscription = self.fetch_subscription(subscription_id, Requester::Admin).await?;
        if !matches!(subscription.status, SubscriptionStatus::Trial | SubscriptionStatus::Active) {
            return Err(SubscriptionError::NotDeliverable(subscription.status));
        }
        let plan = self.fetch_plan(subscription.plan_id).await?;
        let products = self.db.fetch_products_by_ids(&subscription.product_ids.0).await?;
        let mut full_price = Cents::default();
        for id in &subscription.product_ids.0 {
            let product = products
                .iter()
                .find(|p| p.id == *id)
                .ok_or_else(|| SubscriptionError::Validation(format!("Product {id} no longer exists")))?;
            full_price += product.price;
        }
        let amount = full_price.apply_discount_percent(plan.discount_percent);
        let delivery = NewSubscriptionDelivery { subscription_id, scheduled_for, amount };
        let period_end = subscription.current_period_end + Duration::days(plan.interval_days);
        let (delivery, subscription) =
            self.db.insert_delivery(delivery, period_end, SubscriptionStatus::Active).await?;
        info!(
            "🔁️ Delivery #{} for subscription #{subscription_id} due {scheduled_for}. {amount} (list price {full_price})",
            delivery.id
        );
        Ok((delivery, subscription))
    }

    pub async fn deliveries(&self, subscription_id: i64) -> Result<Vec<SubscriptionDelivery>, SubscriptionError> {
        self.fetch_subscription(subscription_id, Requester::Admin).await?;
        self.db.fetch_deliveries(subscription_id).await
    }

    pub async fn set_delivery_status(
        &self,
        id: i64,
        status: DeliveryStatus,
        tracking_number: Option<String>,
    ) -> Result<SubscriptionDelivery, SubscriptionError> {
        let tracking_number = tracking_number.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        if status == DeliveryStatus::Shipped && tracking_number.is_none() {
            return Err(SubscriptionError::Validation("A tracking number is required to ship a delivery".into()));
        }
        let delivery = self.db.set_delivery_status(id, status, tracking_number).await?;
        info!("📦️ Delivery #{id} is now {status}");
        Ok(delivery)
    }
}
