//! The public storefront API.
//!
//! Each API is a thin struct over a backend `B` that implements the traits it needs. The server holds one instance of
//! each API per worker and calls into them from route handlers.
pub mod accounts_api;
pub mod catalog_api;
pub mod checkout_api;
pub mod errors;
pub mod exchange_rate_api;
pub mod order_objects;
pub mod payment_flow_api;
pub mod subscription_api;
