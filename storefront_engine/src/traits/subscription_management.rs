use chrono::{DateTime, Utc};
use thiserror::Error;

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
    traits::CatalogError,
};

#[derive(Debug, Clone, Error)]
pub enum SubscriptionError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Subscription plan {0} does not exist")]
    PlanNotFound(i64),
    #[error("Subscription plan {0} is no longer offered")]
    PlanInactive(i64),
    #[error("Subscription {0} does not exist")]
    SubscriptionNotFound(i64),
    #[error("Delivery {0} does not exist")]
    DeliveryNotFound(i64),
    #[error("Subscription cannot move from {from} to {to}")]
    InvalidTransition { from: SubscriptionStatus, to: SubscriptionStatus },
    #[error("The plan requires {expected} products, but {actual} were chosen")]
    ProductCountMismatch { expected: i64, actual: usize },
    #[error("Deliveries can only be created for trial or active subscriptions. This one is {0}")]
    NotDeliverable(SubscriptionStatus),
    #[error("Subscription {0} belongs to another customer")]
    NotOwner(i64),
    #[error("Invalid subscription request. {0}")]
    Validation(String),
    #[error("{0}")]
    Catalog(#[from] CatalogError),
}

impl From<sqlx::Error> for SubscriptionError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait SubscriptionManagement {
    /// Active plans, ordered by interval.
    async fn fetch_plans(&self) -> Result<Vec<SubscriptionPlan>, SubscriptionError>;
    async fn fetch_plan(&self, id: i64) -> Result<Option<SubscriptionPlan>, SubscriptionError>;
    async fn insert_plan(&self, plan: NewSubscriptionPlan) -> Result<SubscriptionPlan, SubscriptionError>;

    async fn insert_subscription(&self, subscription: NewSubscription) -> Result<Subscription, SubscriptionError>;
    async fn fetch_subscription(&self, id: i64) -> Result<Option<Subscription>, SubscriptionError>;
    async fn fetch_subscriptions_for_user(&self, user_id: &str) -> Result<Vec<Subscription>, SubscriptionError>;
    async fn fetch_all_subscriptions(&self) -> Result<Vec<Subscription>, SubscriptionError>;
    async fn set_subscription_status(
        &self,
        id: i64,
        status: SubscriptionStatus,
    ) -> Result<Subscription, SubscriptionError>;
    /// Moves the billing period to `[start, end)` and sets the status.
    async fn advance_billing_period(
        &self,
        id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: SubscriptionStatus,
    ) -> Result<Subscription, SubscriptionError>;

    /// Stores the delivery and advances the subscription's billing period in a single transaction.
    async fn insert_delivery(
        &self,
        delivery: NewSubscriptionDelivery,
        period_end: DateTime<Utc>,
        status: SubscriptionStatus,
    ) -> Result<(SubscriptionDelivery, Subscription), SubscriptionError>;
    async fn fetch_deliveries(&self, subscription_id: i64) -> Result<Vec<SubscriptionDelivery>, SubscriptionError>;
    async fn set_delivery_status(
        &self,
        id: i64,
        status: DeliveryStatus,
        tracking_number: Option<String>,
    ) -> Result<SubscriptionDelivery, SubscriptionError>;
}
