//! # Backend contracts
//!
//! The storefront engine does not talk to a database directly. Instead, each concern is described by a trait that a
//! backend implements. [`crate::SqliteDatabase`] implements all of them; the server's endpoint tests mock them.
//!
//! * [`OrderManagement`] stores orders together with their items and shipping address, and writes order status.
//! * [`CatalogManagement`] manages the product catalog.
//! * [`SubscriptionManagement`] manages subscription plans, customer subscriptions and their deliveries.
//! * [`PaymentRecords`] keeps the append-only Solana and e-transfer payment observations.
//! * [`ExchangeRates`] stores the USD price of the crypto assets accepted at checkout.
mod catalog_management;
mod data_objects;
mod exchange_rates;
mod order_management;
mod payment_records;
mod subscription_management;

pub use catalog_management::{CatalogError, CatalogManagement};
pub use data_objects::{OrderQueryFilter, ProductQuery};
pub use exchange_rates::{ExchangeRateError, ExchangeRates};
pub use order_management::{OrderFlowError, OrderManagement};
pub use payment_records::PaymentRecords;
pub use subscription_management::{SubscriptionError, SubscriptionManagement};
