use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use log::debug;
use storefront_engine::db_types::{OrderNumber, PaymentMethod, ShippingStatus};
use storefront_server::data_objects::OrderSearchParams;

mod profile_manager;
mod solana_pay;
mod storefront;
mod webhook;

use crate::{
    profile_manager::{read_config, write_config, Profile},
    solana_pay::{print_new_reference, print_solana_link},
    storefront::{
        formatting::{format_order_summary, format_orders},
        StorefrontClient,
    },
    webhook::print_webhook_signature,
};

#[derive(Parser, Debug)]
#[command(version, about = "Operator tools for the peptide storefront")]
pub struct Arguments {
    /// The storefront server to talk to
    #[arg(short, long, env = "SF_SERVER_URL", default_value = "http://localhost:8360", global = true)]
    server: String,
    /// The saved profile holding the admin token
    #[arg(short, long, default_value = "default", global = true)]
    profile: String,
    /// An admin access token. Overrides the one saved in the profile.
    #[arg(long, env = "SF_ADMIN_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "health", about = "Check that the server is up")]
    Health,
    #[clap(name = "reference", about = "Generate a random Solana Pay reference key")]
    NewReference,
    #[clap(name = "solana-link", about = "Build a Solana Pay transfer request URL and QR code")]
    SolanaLink(SolanaLinkParams),
    #[clap(name = "sign-webhook", about = "Compute a Stripe-Signature header for a webhook payload file")]
    SignWebhook(SignWebhookParams),
    #[clap(name = "admin-token", about = "Log in as the admin and print the access token")]
    AdminToken(AdminTokenParams),
    #[clap(name = "orders", about = "Search orders")]
    Orders(OrderSearchArgs),
    #[clap(name = "ship", about = "Set the shipping status of an order")]
    Ship(ShipParams),
}

#[derive(Debug, Args)]
pub struct SolanaLinkParams {
    /// The wallet that receives the payment
    #[arg(short, long)]
    recipient: String,
    /// The amount, in whole tokens (e.g. 105.25)
    #[arg(short, long)]
    amount: String,
    /// The SPL token mint. Omit for native SOL.
    #[arg(short = 't', long = "spl-token")]
    spl_token: Option<String>,
    /// Decimals of the SPL token (6 for USDC)
    #[arg(short, long)]
    decimals: Option<u8>,
    /// The reference key. A fresh one is generated if omitted.
    #[arg(long)]
    reference: Option<String>,
    #[arg(short, long)]
    label: Option<String>,
    /// The order number, used for the message and memo
    #[arg(short, long)]
    order: Option<String>,
    /// Print the URL only
    #[arg(long)]
    no_qr: bool,
}

#[derive(Debug, Args)]
pub struct SignWebhookParams {
    /// A JSON file holding the event body
    payload: PathBuf,
    /// The webhook signing secret (whsec_...)
    #[arg(short = 'k', long, env = "SF_STRIPE_WEBHOOK_SECRET", hide_env_values = true)]
    secret: String,
    /// Unix timestamp to sign with. Defaults to now.
    #[arg(short, long)]
    timestamp: Option<i64>,
    /// Also print a curl command that posts the payload to this server
    #[arg(long = "curl")]
    server: Option<String>,
}

#[derive(Debug, Args)]
pub struct AdminTokenParams {
    #[arg(short, long, env = "SF_ADMIN_USERNAME", default_value = "admin")]
    username: String,
    /// Prompted for if not given
    #[arg(long, env = "SF_ADMIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Save the token in the profile for later `orders` and `ship` calls
    #[arg(long)]
    save: bool,
}

#[derive(Debug, Args)]
pub struct OrderSearchArgs {
    #[arg(short, long)]
    order: Option<String>,
    /// Partial match on the contact email
    #[arg(short, long)]
    email: Option<String>,
    #[arg(short = 'm', long)]
    method: Option<String>,
    /// Comma-separated payment statuses
    #[arg(long)]
    payment: Option<String>,
    /// Comma-separated shipping statuses
    #[arg(long)]
    shipping: Option<String>,
    /// Only orders placed in the last N days
    #[arg(long)]
    days: Option<i64>,
}

#[derive(Debug, Args)]
pub struct ShipParams {
    order: String,
    /// pending, processing, shipped or delivered
    status: String,
    #[arg(short, long)]
    tracking: Option<String>,
}

impl OrderSearchArgs {
    fn into_params(self) -> Result<OrderSearchParams> {
        let payment_method = self
            .method
            .map(|m| m.parse::<PaymentMethod>().map_err(|e| anyhow!("{e}")))
            .transpose()?;
        Ok(OrderSearchParams {
            order_number: self.order,
            email: self.email,
            payment_method,
            payment_status: self.payment,
            shipping_status: self.shipping,
            since: self.days.map(|d| Utc::now() - Duration::days(d)),
            ..Default::default()
        })
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Arguments) -> Result<()> {
    let Arguments { server, profile, token, command } = cli;
    match command {
        Command::Health => {
            let client = StorefrontClient::new(&server)?;
            println!("{}", client.health().await?);
        },
        Command::NewReference => print_new_reference(),
        Command::SolanaLink(params) => print_solana_link(params)?,
        Command::SignWebhook(params) => print_webhook_signature(params)?,
        Command::AdminToken(params) => admin_token(&server, &profile, params).await?,
        Command::Orders(args) => {
            let client = admin_client(&server, &profile, token)?;
            let orders = client.search_orders(&args.into_params()?).await?;
            println!("{}", format_orders(&orders));
        },
        Command::Ship(params) => {
            let status = params.status.parse::<ShippingStatus>().map_err(|e| anyhow!("{e}"))?;
            let client = admin_client(&server, &profile, token)?;
            let order = client.update_shipping(&OrderNumber::from(params.order), status, params.tracking).await?;
            println!("{}", format_order_summary(&order));
        },
    }
    Ok(())
}

async fn admin_token(server: &str, profile: &str, params: AdminTokenParams) -> Result<()> {
    let password = match params.password {
        Some(p) => p,
        None => dialoguer::Password::new().with_prompt(format!("Password for {}", params.username)).interact()?,
    };
    let mut client = StorefrontClient::new(server)?;
    let token = client.admin_login(&params.username, &password).await?;
    println!("{}", token.access_token);
    if params.save {
        let mut config = read_config()?;
        config.upsert(Profile {
            name: profile.to_string(),
            server: client.server().to_string(),
            username: params.username,
            access_token: Some(token.access_token),
            expires_at: Some(Utc::now() + Duration::seconds(token.expires_in)),
        });
        write_config(&config)?;
        eprintln!("Token saved to profile '{profile}'");
    }
    Ok(())
}

/// A client carrying the admin token from the command line, or else the one saved in the profile.
fn admin_client(server: &str, profile: &str, token: Option<String>) -> Result<StorefrontClient> {
    if let Some(token) = token {
        return Ok(StorefrontClient::new(server)?.with_token(token));
    }
    let config = read_config()?;
    let saved = config
        .profile(profile)
        .ok_or_else(|| anyhow!("No profile named '{profile}'. Run `sftools admin-token --save` first"))?;
    let token =
        saved.valid_token().ok_or_else(|| anyhow!("The token in profile '{profile}' has expired. Log in again"))?;
    debug!("Using the saved token for profile '{profile}' against {}", saved.server);
    Ok(StorefrontClient::new(&saved.server)?.with_token(token))
}
