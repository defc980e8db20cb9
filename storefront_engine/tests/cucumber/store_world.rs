use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cucumber::World;
use log::*;
use storefront_engine::{
    db_types::{OrderNumber, Subscription, SubscriptionDelivery},
    events::EventProducers,
    order_objects::ShippingRates,
    AccountApi,
    CatalogApi,
    CheckoutApi,
    ExchangeRateApi,
    PaymentFlowApi,
    SqliteDatabase,
    SubscriptionApi,
};

use crate::support::prepare_env::{create_database, random_db_path, run_migrations};

#[derive(Default, Debug, World)]
pub struct StoreWorld {
    pub system: Option<StoreSystem>,
    /// Order numbers are random, so scenarios refer to orders by an alias.
    pub orders: HashMap<String, OrderNumber>,
    pub subscription: Option<Subscription>,
    pub delivery: Option<SubscriptionDelivery>,
    pub previous_period_end: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct StoreSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub catalog: CatalogApi<SqliteDatabase>,
    pub checkout: CheckoutApi<SqliteDatabase>,
    pub payments: PaymentFlowApi<SqliteDatabase>,
    pub accounts: AccountApi<SqliteDatabase>,
    pub subscriptions: SubscriptionApi<SqliteDatabase>,
    pub rates: ExchangeRateApi<SqliteDatabase>,
}

impl StoreWorld {
    pub fn system(&self) -> &StoreSystem {
        self.system.as_ref().expect("Storefront not initialised")
    }

    pub fn order_number(&self, alias: &str) -> OrderNumber {
        self.orders.get(alias).cloned().unwrap_or_else(|| panic!("No order was placed as '{alias}'"))
    }

    pub fn subscription_id(&self) -> i64 {
        self.subscription.as_ref().expect("No subscription has been created").id
    }

    pub fn record_error<T, E: std::fmt::Display>(&mut self, result: Result<T, E>) {
        match result {
            Ok(_) => self.last_error = None,
            Err(e) => {
                debug!("🚀️ Expected failure: {e}");
                self.last_error = Some(e.to_string());
            },
        }
    }
}

impl StoreSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let producers = EventProducers::default();
        Self {
            db_path: url,
            catalog: CatalogApi::new(db.clone()),
            checkout: CheckoutApi::new(db.clone(), ShippingRates::default(), producers.clone()),
            payments: PaymentFlowApi::new(db.clone(), producers),
            accounts: AccountApi::new(db.clone()),
            subscriptions: SubscriptionApi::new(db.clone()),
            rates: ExchangeRateApi::new(db.clone()),
            db,
        }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
