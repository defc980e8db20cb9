use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use solana_tools::SolanaRpcClient;
use storefront_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    AccountApi,
    CatalogApi,
    CheckoutApi,
    ExchangeRateApi,
    PaymentFlowApi,
    SqliteDatabase,
    SubscriptionApi,
};
use stripe_tools::StripeApi;

use crate::{
    auth::{AdminCredentials, TokenIssuer},
    config::{ServerConfig, ServerOptions, WebhookConfig},
    errors::ServerError,
    middleware::JwtMiddlewareFactory,
    routes::*,
};

const EVENT_BUFFER_SIZE: usize = 25;

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    if config.database_url.is_empty() {
        return Err(ServerError::ConfigurationError("SF_DATABASE_URL must be set".into()));
    }
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, create_event_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Hooks that write an audit trail of every order and status transition to the log.
pub fn create_event_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_created(|ev| {
            let order = &ev.order.order;
            info!(
                "📬️ New order {} for {} by {} ({} payment)",
                order.order_number,
                order.total,
                order.user_id.as_deref().unwrap_or(order.email.as_str()),
                order.payment_method
            );
            Box::pin(async {}) as HookFuture
        })
        .on_payment_status_changed(|ev| {
            info!(
                "📬️ Order {} payment moved from {} to {}",
                ev.order.order_number,
                ev.old_status,
                ev.new_status()
            );
            Box::pin(async {}) as HookFuture
        })
        .on_shipping_status_changed(|ev| {
            info!(
                "📬️ Order {} shipping moved from {} to {} (tracking: {})",
                ev.order.order_number,
                ev.old_status,
                ev.new_status(),
                ev.order.tracking_number.as_deref().unwrap_or("none")
            );
            Box::pin(async {}) as HookFuture
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let stripe = web::Data::new(StripeApi::new(config.stripe.clone())?);
    let chain = web::Data::new(SolanaRpcClient::new(config.solana.rpc_url.clone())?);
    let issuer = Arc::new(TokenIssuer::new(&config.auth));
    let issuer_data = web::Data::from(Arc::clone(&issuer));
    let credentials = web::Data::new(AdminCredentials::new(&config.auth));
    let options = web::Data::new(ServerOptions::from_config(&config));
    let webhook = web::Data::new(WebhookConfig::from_config(&config));
    let solana = web::Data::new(config.solana.clone());
    let etransfer = web::Data::new(config.etransfer.clone());
    let shipping = config.shipping;
    let srv = HttpServer::new(move || {
        let catalog_api = CatalogApi::new(db.clone());
        let checkout_api = CheckoutApi::new(db.clone(), shipping, producers.clone());
        let payments_api = PaymentFlowApi::new(db.clone(), producers.clone());
        let accounts_api = AccountApi::new(db.clone());
        let subscription_api = SubscriptionApi::new(db.clone());
        let exchange_rate_api = ExchangeRateApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sf::access_log"))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(subscription_api))
            .app_data(web::Data::new(exchange_rate_api))
            .app_data(stripe.clone())
            .app_data(chain.clone())
            .app_data(issuer_data.clone())
            .app_data(credentials.clone())
            .app_data(options.clone())
            .app_data(webhook.clone())
            .app_data(solana.clone())
            .app_data(etransfer.clone());
        // Routes that require a bearer token. Admin routes check the role on top of that.
        let auth_scope = web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(Arc::clone(&issuer)))
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(MyOrderRoute::<SqliteDatabase>::new())
            .service(MySubscriptionsRoute::<SqliteDatabase>::new())
            .service(SubscribeRoute::<SqliteDatabase>::new())
            .service(ChangeSubscriptionRoute::<SqliteDatabase>::new())
            .service(SearchOrdersRoute::<SqliteDatabase>::new())
            .service(OrderDetailRoute::<SqliteDatabase>::new())
            .service(UpdatePaymentStatusRoute::<SqliteDatabase>::new())
            .service(UpdateShippingRoute::<SqliteDatabase>::new())
            .service(VerifySolanaRoute::<SqliteDatabase, SolanaRpcClient>::new())
            .service(RecordEtransferRoute::<SqliteDatabase>::new())
            .service(OrderEtransfersRoute::<SqliteDatabase>::new())
            .service(UpsertProductRoute::<SqliteDatabase>::new())
            .service(UpdateProductRoute::<SqliteDatabase>::new())
            .service(SetExchangeRateRoute::<SqliteDatabase>::new())
            .service(CreatePlanRoute::<SqliteDatabase>::new())
            .service(AllSubscriptionsRoute::<SqliteDatabase>::new())
            .service(CreateDeliveryRoute::<SqliteDatabase>::new())
            .service(DeliveriesRoute::<SqliteDatabase>::new())
            .service(UpdateDeliveryRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(admin_login)
            .service(ProductsRoute::<SqliteDatabase>::new())
            .service(ProductRoute::<SqliteDatabase>::new())
            .service(SubscriptionPlansRoute::<SqliteDatabase>::new())
            .service(CartQuoteRoute::<SqliteDatabase>::new())
            .service(PlaceOrderRoute::<SqliteDatabase>::new())
            .service(CardCheckoutRoute::<SqliteDatabase, StripeApi>::new())
            .service(SolanaCheckoutRoute::<SqliteDatabase>::new())
            .service(SolanaStatusRoute::<SqliteDatabase, SolanaRpcClient>::new())
            .service(EtransferInstructionsRoute::<SqliteDatabase>::new())
            .service(StripeWebhookRoute::<SqliteDatabase>::new())
            .service(auth_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
