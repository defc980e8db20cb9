use chrono::{DateTime, Utc};
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{
    DeliveryStatus,
    NewSubscription,
    NewSubscriptionDelivery,
    NewSubscriptionPlan,
    Subscription,
    SubscriptionDelivery,
    SubscriptionPlan,
    SubscriptionStatus,
};

pub async fn fetch_active_plans(conn: &mut SqliteConnection) -> Result<Vec<SubscriptionPlan>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM subscription_plans WHERE active = TRUE ORDER BY interval_days ASC, id ASC")
        .fetch_all(conn)
        .await
}

pub async fn fetch_plan(id: i64, conn: &mut SqliteConnection) -> Result<Option<SubscriptionPlan>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM subscription_plans WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn insert_plan(
    plan: NewSubscriptionPlan,
    conn: &mut SqliteConnection,
) -> Result<SubscriptionPlan, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO subscription_plans (name, interval_days, discount_percent, product_count, trial_days)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(plan.name)
    .bind(plan.interval_days)
    .bind(plan.discount_percent)
    .bind(plan.product_count)
    .bind(plan.trial_days)
    .fetch_one(conn)
    .await
}

pub async fn insert_subscription(
    sub: NewSubscription,
    conn: &mut SqliteConnection,
) -> Result<Subscription, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO subscriptions (user_id, plan_id, status, product_ids, current_period_start, current_period_end)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(sub.user_id)
    .bind(sub.plan_id)
    .bind(sub.status)
    .bind(Json(sub.product_ids))
    .bind(sub.current_period_start)
    .bind(sub.current_period_end)
    .fetch_one(conn)
    .await
}

pub async fn fetch_subscription(id: i64, conn: &mut SqliteConnection) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM subscriptions WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_subscriptions_for_user(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Subscription>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM subscriptions WHERE user_id = $1 ORDER BY id DESC").bind(user_id).fetch_all(conn).await
}

pub async fn fetch_all_subscriptions(conn: &mut SqliteConnection) -> Result<Vec<Subscription>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM subscriptions ORDER BY id DESC").fetch_all(conn).await
}

pub async fn update_status(
    id: i64,
    status: SubscriptionStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as("UPDATE subscriptions SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
        .bind(status)
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn update_billing_period(
    id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    status: SubscriptionStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE subscriptions SET
                current_period_start = $1,
                current_period_end = $2,
                status = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING *;
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(status)
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn insert_delivery(
    delivery: NewSubscriptionDelivery,
    conn: &mut SqliteConnection,
) -> Result<SubscriptionDelivery, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO subscription_deliveries (subscription_id, scheduled_for, amount)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(delivery.subscription_id)
    .bind(delivery.scheduled_for)
    .bind(delivery.amount)
    .fetch_one(conn)
    .await
}

pub async fn fetch_deliveries(
    subscription_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<SubscriptionDelivery>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM subscription_deliveries WHERE subscription_id = $1 ORDER BY scheduled_for ASC, id ASC")
        .bind(subscription_id)
        .fetch_all(conn)
        .await
}

pub async fn update_delivery_status(
    id: i64,
    status: DeliveryStatus,
    tracking_number: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Option<SubscriptionDelivery>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE subscription_deliveries SET
                status = $1,
                tracking_number = COALESCE($2, tracking_number),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(tracking_number)
    .bind(id)
    .fetch_optional(conn)
    .await
}
