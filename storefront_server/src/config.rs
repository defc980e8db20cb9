use std::env;

use chrono::Duration;
use log::*;
use rand::RngCore;
use sf_common::{
    helpers::{env_parse, parse_boolean_flag},
    Cents,
    Secret,
};
use solana_tools::{rpc::DEFAULT_RPC_URL, Pubkey};
use storefront_engine::order_objects::{ShippingRates, SolanaAsset};
use stripe_tools::{webhook::DEFAULT_TOLERANCE, StripeConfig};

const DEFAULT_SF_HOST: &str = "127.0.0.1";
const DEFAULT_SF_PORT: u16 = 8360;
const DEFAULT_STOREFRONT_URL: &str = "http://localhost:3000";
const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 12;
const DEFAULT_SOLANA_LABEL: &str = "Peptide Storefront";
const DEFAULT_USD_TOKEN_DECIMALS: u8 = 6;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// Base URL of the storefront UI. Stripe redirects the customer back here after checkout.
    pub storefront_url: String,
    pub stripe: StripeConfig,
    /// Maximum age, in seconds, of a Stripe webhook signature.
    pub webhook_tolerance: i64,
    pub solana: SolanaConfig,
    pub etransfer: ETransferConfig,
    pub shipping: ShippingRates,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SF_HOST.to_string(),
            port: DEFAULT_SF_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            storefront_url: DEFAULT_STOREFRONT_URL.to_string(),
            stripe: StripeConfig::default(),
            webhook_tolerance: DEFAULT_TOLERANCE,
            solana: SolanaConfig::default(),
            etransfer: ETransferConfig::default(),
            shipping: ShippingRates::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SF_HOST").ok().unwrap_or_else(|| DEFAULT_SF_HOST.into());
        let port = env::var("SF_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for SF_PORT. {e} Using the default, {DEFAULT_SF_PORT}, instead.");
                    DEFAULT_SF_PORT
                })
            })
            .unwrap_or(DEFAULT_SF_PORT);
        let database_url = env::var("SF_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SF_DATABASE_URL is not set. Please set it to the URL for the storefront database.");
            String::default()
        });
        let storefront_url = env::var("SF_STOREFRONT_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                warn!("🪛️ SF_STOREFRONT_URL is not set. Stripe will redirect customers to {DEFAULT_STOREFRONT_URL}");
                DEFAULT_STOREFRONT_URL.to_string()
            });
        let use_x_forwarded_for = parse_boolean_flag(env::var("SF_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SF_USE_FORWARDED").ok(), false);
        let webhook_tolerance = env_parse::<i64>("SF_STRIPE_WEBHOOK_TOLERANCE").filter(|t| *t > 0).unwrap_or_else(|| {
            info!("🪛️ Using the default Stripe webhook tolerance of {DEFAULT_TOLERANCE} seconds");
            DEFAULT_TOLERANCE
        });
        let stripe = StripeConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            auth: AuthConfig::from_env_or_default(),
            use_x_forwarded_for,
            use_forwarded,
            storefront_url,
            stripe,
            webhook_tolerance,
            solana: SolanaConfig::from_env_or_default(),
            etransfer: ETransferConfig::from_env_or_default(),
            shipping: shipping_rates_from_env(),
        }
    }
}

fn shipping_rates_from_env() -> ShippingRates {
    let defaults = ShippingRates::default();
    let flat_rate = match env::var("SF_SHIPPING_FLAT_RATE") {
        Ok(s) => Cents::parse_decimal(&s).unwrap_or_else(|e| {
            warn!("🪛️ Invalid SF_SHIPPING_FLAT_RATE ({s}). {e}. Using {} instead.", defaults.flat_rate);
            defaults.flat_rate
        }),
        Err(_) => defaults.flat_rate,
    };
    let free_threshold = match env::var("SF_FREE_SHIPPING_THRESHOLD") {
        Ok(s) if ["none", "off", "0"].contains(&s.trim().to_lowercase().as_str()) => None,
        Ok(s) => match Cents::parse_decimal(&s) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("🪛️ Invalid SF_FREE_SHIPPING_THRESHOLD ({s}). {e}. Using the default.");
                defaults.free_threshold
            },
        },
        Err(_) => defaults.free_threshold,
    };
    let rates = ShippingRates { flat_rate, free_threshold };
    match rates.free_threshold {
        Some(t) => info!("🪛️ Shipping costs {} and is free from {t}", rates.flat_rate),
        None => info!("🪛️ Shipping costs {} on every order", rates.flat_rate),
    }
    rates
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret shared with the hosted auth provider. Customer tokens are signed with it, and so are the
    /// admin tokens this server issues.
    pub jwt_secret: Secret<String>,
    pub admin_username: String,
    pub admin_password: Secret<String>,
    pub token_lifetime: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. Customer tokens from \
             the auth provider will be rejected, and admin tokens will not survive a restart. 🚨️🚨️🚨️"
        );
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self {
            jwt_secret: Secret::new(base64::encode(key)),
            admin_username: String::default(),
            admin_password: Secret::default(),
            token_lifetime: Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS),
        }
    }
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        let mut config = match env::var("SF_JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => Self {
                jwt_secret: Secret::new(s.trim().to_string()),
                admin_username: String::default(),
                admin_password: Secret::default(),
                token_lifetime: Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS),
            },
            _ => Self::default(),
        };
        config.admin_username = env::var("SF_ADMIN_USERNAME").unwrap_or_default().trim().to_string();
        config.admin_password = Secret::new(env::var("SF_ADMIN_PASSWORD").unwrap_or_default());
        if config.admin_username.is_empty() || config.admin_password.is_empty() {
            warn!("🪛️ SF_ADMIN_USERNAME or SF_ADMIN_PASSWORD is not set. Admin login is disabled.");
        }
        if let Some(hours) = env_parse::<i64>("SF_TOKEN_LIFETIME_HOURS").filter(|h| *h > 0) {
            config.token_lifetime = Duration::hours(hours);
        }
        config
    }
}

//-------------------------------------------------  SolanaConfig  -----------------------------------------------------
#[derive(Clone, Debug)]
pub struct SolanaConfig {
    pub rpc_url: String,
    /// The merchant wallet. Solana checkout is disabled without it.
    pub recipient: Option<Pubkey>,
    /// Mint of the USD stablecoin to request. When unset, customers pay in native SOL.
    pub spl_token: Option<Pubkey>,
    pub token_decimals: u8,
    pub label: String,
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            recipient: None,
            spl_token: None,
            token_decimals: DEFAULT_USD_TOKEN_DECIMALS,
            label: DEFAULT_SOLANA_LABEL.to_string(),
        }
    }
}

impl SolanaConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let rpc_url = env::var("SF_SOLANA_RPC_URL").unwrap_or_else(|_| {
            info!("🪛️ SF_SOLANA_RPC_URL is not set. Using {DEFAULT_RPC_URL}");
            defaults.rpc_url.clone()
        });
        let recipient = match env::var("SF_SOLANA_RECIPIENT") {
            Ok(s) => s.parse::<Pubkey>().map_err(|e| error!("🪛️ SF_SOLANA_RECIPIENT is invalid. {e}")).ok(),
            Err(_) => {
                warn!("🪛️ SF_SOLANA_RECIPIENT is not set. Solana checkout is disabled.");
                None
            },
        };
        let spl_token = env::var("SF_SOLANA_SPL_TOKEN")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| s.parse::<Pubkey>().map_err(|e| error!("🪛️ SF_SOLANA_SPL_TOKEN is invalid. {e}")).ok());
        let token_decimals = env_parse::<u8>("SF_SOLANA_TOKEN_DECIMALS").unwrap_or(defaults.token_decimals);
        let label = env::var("SF_SOLANA_LABEL").unwrap_or(defaults.label);
        let config = Self { rpc_url, recipient, spl_token, token_decimals, label };
        match config.asset() {
            SolanaAsset::Sol => info!("🪛️ Solana checkout requests native SOL"),
            SolanaAsset::UsdToken { mint, decimals } => {
                info!("🪛️ Solana checkout requests token {mint} ({decimals} decimals)")
            },
        }
        config
    }

    pub fn asset(&self) -> SolanaAsset {
        match &self.spl_token {
            Some(mint) => SolanaAsset::UsdToken { mint: mint.to_string(), decimals: self.token_decimals },
            None => SolanaAsset::Sol,
        }
    }
}

//-------------------------------------------------  ETransferConfig  --------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct ETransferConfig {
    /// The address customers send interbank transfers to.
    pub recipient_email: Option<String>,
}

impl ETransferConfig {
    pub fn from_env_or_default() -> Self {
        let recipient_email = env::var("SF_ETRANSFER_EMAIL").ok().filter(|s| !s.trim().is_empty());
        if recipient_email.is_none() {
            warn!("🪛️ SF_ETRANSFER_EMAIL is not set. E-transfer instructions will not include a recipient.");
        }
        Self { recipient_email }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that route handlers need. Secrets are deliberately left out.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub storefront_url: String,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            storefront_url: config.storefront_url.clone(),
        }
    }

    pub fn success_url(&self, order_number: &str) -> String {
        format!("{}/checkout/success?order={order_number}&session_id={{CHECKOUT_SESSION_ID}}", self.storefront_url)
    }

    pub fn cancel_url(&self, order_number: &str) -> String {
        format!("{}/checkout/cancelled?order={order_number}", self.storefront_url)
    }
}

/// What the Stripe webhook route needs to verify signatures.
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub secret: Secret<String>,
    pub tolerance: i64,
}

impl WebhookConfig {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { secret: config.stripe.webhook_secret.clone(), tolerance: config.webhook_tolerance }
    }
}
