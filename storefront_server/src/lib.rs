//! # Storefront server
//! The HTTP face of the storefront. It is responsible for:
//! * Serving the catalog and pricing carts.
//! * Taking orders from guests and signed-in customers.
//! * Starting card, Solana Pay and e-transfer checkouts, and confirming them from Stripe webhooks, on-chain lookups
//!   and admin actions.
//! * The customer account area and the admin back-office.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! Public routes live at the root. Everything under `/api` needs a bearer token; routes under `/api/admin` also need
//! the `admin` role. See [routes](routes/index.html) for the full list.
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;

pub mod data_objects;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
