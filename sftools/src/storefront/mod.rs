mod client;
pub mod formatting;

pub use client::StorefrontClient;
