//! `SqliteDatabase` is the concrete storefront backend.
//!
//! It implements every trait in [`crate::traits`] on top of the functions in [`super::db`].
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{catalog, db_url, exchange_rates, new_pool, orders, payments, subscriptions};
use crate::{
    db_types::{
        DeliveryStatus,
        ETransferPayment,
        ExchangeRate,
        NewETransferPayment,
        NewOrder,
        NewProduct,
        NewSubscription,
        NewSubscriptionDelivery,
        NewSubscriptionPlan,
        Order,
        OrderDetail,
        OrderNumber,
        PaymentStatus,
        Product,
        ProductUpdate,
        ShippingStatus,
        SolanaPayment,
        SolanaPaymentStatus,
        SolanaQuote,
        Subscription,
        SubscriptionDelivery,
        SubscriptionPlan,
        SubscriptionStatus,
    },
    traits::{
        CatalogError,
        CatalogManagement,
        ExchangeRateError,
        ExchangeRates,
        OrderFlowError,
        OrderManagement,
        OrderQueryFilter,
        PaymentRecords,
        ProductQuery,
        SubscriptionError,
        SubscriptionManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<OrderDetail, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let number = order.order_number.clone();
        // Dropping `tx` on error rolls back the order row along with any items already written
        let detail = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{number}] committed");
        Ok(detail)
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(number, &mut conn).await?)
    }

    async fn fetch_order_detail(&self, number: &OrderNumber) -> Result<Option<OrderDetail>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_detail(number, &mut conn).await?)
    }

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_orders_for_user(user_id, &mut conn).await?)
    }

    async fn fetch_orders_for_email(&self, email: &str) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_guest_orders_for_email(email, &mut conn).await?)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }

    async fn set_payment_status(&self, number: &OrderNumber, status: PaymentStatus) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_payment_status(number, status, &mut conn)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(number.clone()))
    }

    async fn attach_payment_reference(
        &self,
        number: &OrderNumber,
        reference: &str,
        status: PaymentStatus,
    ) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_payment_reference(number, reference, status, &mut conn)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(number.clone()))
    }

    async fn attach_stripe_session(&self, number: &OrderNumber, session_id: &str) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_stripe_session(number, session_id, &mut conn)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(number.clone()))
    }

    async fn fetch_order_by_stripe_session(&self, session_id: &str) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_stripe_session(session_id, &mut conn).await?)
    }

    async fn set_shipping_status(
        &self,
        number: &OrderNumber,
        status: ShippingStatus,
        tracking_number: Option<String>,
    ) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_shipping_status(number, status, tracking_number, &mut conn)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(number.clone()))
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_products(&self, query: ProductQuery) -> Result<Vec<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_products(query, &mut conn).await?)
    }

    async fn fetch_product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_product_by_slug(slug, &mut conn).await?)
    }

    async fn fetch_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_products_by_ids(ids, &mut conn).await?)
    }

    async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::upsert_product(product, &mut conn).await?;
        debug!("🗃️ Product '{}' saved with id {}", product.slug, product.id);
        Ok(product)
    }

    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Product, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::update_product(id, update, &mut conn).await
    }
}

impl SubscriptionManagement for SqliteDatabase {
    async fn fetch_plans(&self) -> Result<Vec<SubscriptionPlan>, SubscriptionError> {
        let mut conn = self.pool.acquire().await?;
        Ok(subscriptions::fetch_active_plans(&mut conn).await?)
    }

    async fn fetch_plan(&self, id: i64) -> Result<Option<SubscriptionPlan>, SubscriptionError> {
        let mut conn = self.pool.acquire().await?;
        Ok(subscriptions::fetch_plan(id, &mut conn).await?)
    }

    async fn insert_plan(&self, plan: NewSubscriptionPlan) -> Result<SubscriptionPlan, SubscriptionError> {
        let mut conn = self.pool.acquire().await?;
        Ok(subscriptions::insert_plan(plan, &mut conn).await?)
    }

    async fn insert_subscription(&self, subscription: NewSubscription) -> Result<Subscription, SubscriptionError> {
        let mut conn = self.pool.acquire().await?;
        Ok(subscriptions::insert_subscription(subscription, &mut conn).await?)
    }

    async fn fetch_subscription(&self, id: i64) -> Result<Option<Subscription>, SubscriptionError> {
        let mut conn = self.pool.acquire().await?;
        Ok(subscriptions::fetch_subscription(id, &mut conn).await?)
    }

    async fn fetch_subscriptions_for_user(&self, user_id: &str) -> Result<Vec<Subscription>, SubscriptionError> {
        let mut conn = self.pool.acquire().await?;
        Ok(subscriptions::fetch_subscriptions_for_user(user_id, &mut conn).await?)
    }

    async fn fetch_all_subscriptions(&self) -> Result<Vec<Subscription>, SubscriptionError> {
        let mut conn = self.pool.acquire().await?;
        Ok(subscriptions::fetch_all_subscriptions(&mut conn).await?)
    }

    async fn set_subscription_status(
        &self,
        id: i64,
        status: SubscriptionStatus,
    ) -> Result<Subscription, SubscriptionError> {
        let mut conn = self.pool.acquire().await?;
        subscriptions::update_status(id, status, &mut conn).await?.ok_or(SubscriptionError::SubscriptionNotFound(id))
    }

    async fn advance_billing_period(
        &self,
        id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: SubscriptionStatus,
    ) -> Result<Subscription, SubscriptionError> {
        let mut conn = self.pool.acquire().await?;
        subscriptions::update_billing_period(id, start, end, status, &mut conn)
            .await?
            .ok_or(SubscriptionError::SubscriptionNotFound(id))
    }

    async fn insert_delivery(
        &self,
        delivery: NewSubscriptionDelivery,
        period_end: DateTime<Utc>,
        status: SubscriptionStatus,
    ) -> Result<(SubscriptionDelivery, Subscription), SubscriptionError> {
        let mut tx = self.pool.begin().await?;
        let id = delivery.subscription_id;
        let existing =
            subscriptions::fetch_subscription(id, &mut tx).await?.ok_or(SubscriptionError::SubscriptionNotFound(id))?;
        let delivery = subscriptions::insert_delivery(delivery, &mut tx).await?;
        let subscription =
            subscriptions::update_billing_period(id, existing.current_period_end, period_end, status, &mut tx)
                .await?
                .ok_or(SubscriptionError::SubscriptionNotFound(id))?;
        tx.commit().await?;
        trace!("🗃️ Delivery #{} stored. Subscription #{id} now runs until {period_end}", delivery.id);
        Ok((delivery, subscription))
    }

    async fn fetch_deliveries(&self, subscription_id: i64) -> Result<Vec<SubscriptionDelivery>, SubscriptionError> {
        let mut conn = self.pool.acquire().await?;
        Ok(subscriptions::fetch_deliveries(subscription_id, &mut conn).await?)
    }

    async fn set_delivery_status(
        &self,
        id: i64,
        status: DeliveryStatus,
        tracking_number: Option<String>,
    ) -> Result<SubscriptionDelivery, SubscriptionError> {
        let mut conn = self.pool.acquire().await?;
        subscriptions::update_delivery_status(id, status, tracking_number, &mut conn)
            .await?
            .ok_or(SubscriptionError::DeliveryNotFound(id))
    }
}

impl PaymentRecords for SqliteDatabase {
    async fn insert_solana_payment(
        &self,
        order_number: &OrderNumber,
        quote: SolanaQuote,
    ) -> Result<SolanaPayment, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::insert_solana_payment(order_number, quote, &mut conn).await?)
    }

    async fn fetch_solana_payment_by_order(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<SolanaPayment>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_solana_payment_by_order(order_number, &mut conn).await?)
    }

    async fn fetch_solana_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<SolanaPayment>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_solana_payment_by_reference(reference, &mut conn).await?)
    }

    async fn confirm_solana_payment(&self, reference: &str, signature: &str) -> Result<SolanaPayment, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let payment =
            payments::update_solana_payment(reference, SolanaPaymentStatus::Confirmed, Some(signature), &mut tx)
                .await?
                .ok_or_else(|| OrderFlowError::SolanaPaymentNotFound(reference.to_string()))?;
        orders::update_payment_reference(&payment.order_number, signature, PaymentStatus::Completed, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(payment.order_number.clone()))?;
        tx.commit().await?;
        debug!("🗃️ Solana payment {reference} for order {} confirmed by {signature}", payment.order_number);
        Ok(payment)
    }

    async fn insert_etransfer_payment(&self, payment: NewETransferPayment) -> Result<ETransferPayment, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::insert_etransfer_payment(payment, &mut conn).await?)
    }

    async fn fetch_etransfer_payments_for_order(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Vec<ETransferPayment>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_etransfer_payments(order_number, &mut conn).await?)
    }
}

impl ExchangeRates for SqliteDatabase {
    async fn fetch_last_rate(&self, currency: &str) -> Result<ExchangeRate, ExchangeRateError> {
        let mut conn = self.pool.acquire().await?;
        exchange_rates::fetch_last_rate(currency, &mut conn).await
    }

    async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError> {
        let mut conn = self.pool.acquire().await?;
        exchange_rates::set_exchange_rate(rate, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `SF_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Migrations that have already run are skipped.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}
