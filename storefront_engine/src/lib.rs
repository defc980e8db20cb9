//! Storefront Engine
//!
//! The engine holds the order, payment, catalog and subscription logic of the peptide storefront. It knows nothing
//! about HTTP, Stripe's REST API or the Solana network; the server crate feeds it verified outcomes from those systems.
//!
//! The library is divided into three main sections:
//! 1. Backend contracts ([`mod@traits`]) and their SQLite implementation ([`SqliteDatabase`]). You should never need to
//!    call the database directly. The exception is the data types stored in it, which live in [`mod@db_types`].
//! 2. The public API ([`mod@sf_api`]). Each API is generic over a backend that implements the traits it needs, which
//!    keeps the server testable against mocks.
//! 3. Event hooks ([`mod@events`]). Orders emit events when they are created and whenever their payment or shipping
//!    status is written. Hooks subscribe to these with async closures.
pub mod db_types;
pub mod events;
pub mod sf_api;
mod sqlite;
pub mod traits;

pub use sf_api::{
    accounts_api::AccountApi,
    catalog_api::CatalogApi,
    checkout_api::CheckoutApi,
    errors::CheckoutError,
    exchange_rate_api::ExchangeRateApi,
    order_objects,
    payment_flow_api::PaymentFlowApi,
    subscription_api::{NewSubscriptionRequest, Requester, SubscriptionApi},
};
pub use sqlite::{db::db_url, SqliteDatabase};
pub use traits::{
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
};
