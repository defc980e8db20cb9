//! A small Stripe client for the storefront.
//!
//! Only the pieces of Stripe the storefront uses are covered: hosted Checkout Sessions (create, retrieve, expire) and
//! verification of the signed webhooks Stripe sends when a session changes state.
mod api;
mod config;
mod data_objects;
mod error;
pub mod webhook;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{CheckoutLineItem, CheckoutSession, NewCheckoutSession};
pub use error::{StripeApiError, WebhookError};
pub use webhook::{StripeEvent, StripeEventKind};
