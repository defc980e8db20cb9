use chrono::{DateTime, Utc};
use mockall::mock;
use solana_tools::{
    rpc::{ConfirmedTransaction, SignatureInfo},
    Pubkey,
    SolanaError,
};
use storefront_engine::{
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
use stripe_tools::{CheckoutSession, NewCheckoutSession, StripeApiError};

use crate::integrations::{solana::ChainLookup, stripe::CardProcessor};

mock! {
    pub Store {}
    impl OrderManagement for Store {
        async fn insert_order(&self, order: NewOrder) -> Result<OrderDetail, OrderFlowError>;
        async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderFlowError>;
        async fn fetch_order_detail(&self, number: &OrderNumber) -> Result<Option<OrderDetail>, OrderFlowError>;
        async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderFlowError>;
        async fn fetch_orders_for_email(&self, email: &str) -> Result<Vec<Order>, OrderFlowError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;
        async fn set_payment_status(&self, number: &OrderNumber, status: PaymentStatus) -> Result<Order, OrderFlowError>;
        async fn attach_payment_reference(&self, number: &OrderNumber, reference: &str, status: PaymentStatus) -> Result<Order, OrderFlowError>;
        async fn attach_stripe_session(&self, number: &OrderNumber, session_id: &str) -> Result<Order, OrderFlowError>;
        async fn fetch_order_by_stripe_session(&self, session_id: &str) -> Result<Option<Order>, OrderFlowError>;
        async fn set_shipping_status(&self, number: &OrderNumber, status: ShippingStatus, tracking_number: Option<String>) -> Result<Order, OrderFlowError>;
    }
    impl PaymentRecords for Store {
        async fn insert_solana_payment(&self, order_number: &OrderNumber, quote: SolanaQuote) -> Result<SolanaPayment, OrderFlowError>;
        async fn fetch_solana_payment_by_order(&self, order_number: &OrderNumber) -> Result<Option<SolanaPayment>, OrderFlowError>;
        async fn fetch_solana_payment_by_reference(&self, reference: &str) -> Result<Option<SolanaPayment>, OrderFlowError>;
        async fn confirm_solana_payment(&self, reference: &str, signature: &str) -> Result<SolanaPayment, OrderFlowError>;
        async fn insert_etransfer_payment(&self, payment: NewETransferPayment) -> Result<ETransferPayment, OrderFlowError>;
        async fn fetch_etransfer_payments_for_order(&self, order_number: &OrderNumber) -> Result<Vec<ETransferPayment>, OrderFlowError>;
    }
    impl ExchangeRates for Store {
        async fn fetch_last_rate(&self, currency: &str) -> Result<ExchangeRate, ExchangeRateError>;
        async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError>;
    }
    impl CatalogManagement for Store {
        async fn fetch_products(&self, query: ProductQuery) -> Result<Vec<Product>, CatalogError>;
        async fn fetch_product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogError>;
        async fn fetch_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>, CatalogError>;
        async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;
        async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Product, CatalogError>;
    }
    impl SubscriptionManagement for Store {
        async fn fetch_plans(&self) -> Result<Vec<SubscriptionPlan>, SubscriptionError>;
        async fn fetch_plan(&self, id: i64) -> Result<Option<SubscriptionPlan>, SubscriptionError>;
        async fn insert_plan(&self, plan: NewSubscriptionPlan) -> Result<SubscriptionPlan, SubscriptionError>;
        async fn insert_subscription(&self, subscription: NewSubscription) -> Result<Subscription, SubscriptionError>;
        async fn fetch_subscription(&self, id: i64) -> Result<Option<Subscription>, SubscriptionError>;
        async fn fetch_subscriptions_for_user(&self, user_id: &str) -> Result<Vec<Subscription>, SubscriptionError>;
        async fn fetch_all_subscriptions(&self) -> Result<Vec<Subscription>, SubscriptionError>;
        async fn set_subscription_status(&self, id: i64, status: SubscriptionStatus) -> Result<Subscription, SubscriptionError>;
        async fn advance_billing_period(&self, id: i64, start: DateTime<Utc>, end: DateTime<Utc>, status: SubscriptionStatus) -> Result<Subscription, SubscriptionError>;
        async fn insert_delivery(&self, delivery: NewSubscriptionDelivery, period_end: DateTime<Utc>, status: SubscriptionStatus) -> Result<(SubscriptionDelivery, Subscription), SubscriptionError>;
        async fn fetch_deliveries(&self, subscription_id: i64) -> Result<Vec<SubscriptionDelivery>, SubscriptionError>;
        async fn set_delivery_status(&self, id: i64, status: DeliveryStatus, tracking_number: Option<String>) -> Result<SubscriptionDelivery, SubscriptionError>;
    }
}

mock! {
    pub Stripe {}
    impl CardProcessor for Stripe {
        async fn create_session(&self, session: &NewCheckoutSession) -> Result<CheckoutSession, StripeApiError>;
        async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, StripeApiError>;
        async fn expire_session(&self, session_id: &str) -> Result<CheckoutSession, StripeApiError>;
    }
}

mock! {
    pub Chain {}
    impl ChainLookup for Chain {
        async fn reference_signatures(&self, reference: &Pubkey) -> Result<Vec<SignatureInfo>, SolanaError>;
        async fn transaction(&self, signature: &str) -> Result<Option<ConfirmedTransaction>, SolanaError>;
    }
}
