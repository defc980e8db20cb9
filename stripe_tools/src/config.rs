use log::*;
use sf_common::Secret;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    /// Scheme and host of the Stripe API. Overridden in tests to point at a local stub.
    pub api_base: String,
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let secret_key = Secret::new(std::env::var("SF_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🪛️ SF_STRIPE_SECRET_KEY not set, using a (probably useless) default");
            "sk_test_00000000000000".to_string()
        }));
        let webhook_secret = Secret::new(std::env::var("SF_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ SF_STRIPE_WEBHOOK_SECRET not set. Webhook signatures will not verify");
            String::default()
        }));
        let api_base = std::env::var("SF_STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string());
        Self { secret_key, webhook_secret, api_base: api_base.trim_end_matches('/').to_string() }
    }
}
