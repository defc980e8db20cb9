//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that need more than a few lines of glue call into
//! [`crate::integrations`] or the engine APIs, so this module stays a flat list of routes.
//!
//! A note about performance:
//! Each worker thread processes its requests sequentially, so a handler that blocks the current thread stops that
//! worker from serving anything else:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! The worker hangs.
//!     }
//! ```
//! Database queries, Stripe calls and Solana RPC lookups are all async, and must stay that way.
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use log::*;
use serde_json::json;
use sf_common::Cents;
use storefront_engine::{
    db_types::{
        ExchangeRate,
        NewProduct,
        NewSubscriptionPlan,
        OrderNumber,
        PaymentMethod,
        ProductUpdate,
        Role,
        SolanaPaymentStatus,
    },
    order_objects::CheckoutRequest,
    traits::{CatalogManagement, ExchangeRates, OrderManagement, PaymentRecords, SubscriptionManagement},
    AccountApi,
    CatalogApi,
    CheckoutApi,
    ExchangeRateApi,
    NewSubscriptionRequest,
    OrderFlowError,
    PaymentFlowApi,
    ProductQuery,
    Requester,
    SubscriptionApi,
};
use stripe_tools::webhook::{construct_event, SIGNATURE_HEADER};

use crate::{
    auth::{optional_claims, AdminCredentials, JwtClaims, TokenIssuer},
    config::{ETransferConfig, ServerOptions, SolanaConfig, WebhookConfig},
    data_objects::{
        AccessTokenResponse,
        AdminLoginRequest,
        CardCheckoutResponse,
        CartQuoteRequest,
        DeliveryStatusUpdate,
        ETransferInstructions,
        ETransferRecordRequest,
        ExchangeRateUpdate,
        JsonResponse,
        NewDeliveryRequest,
        OrderSearchParams,
        PaymentStatusUpdate,
        ShippingStatusUpdate,
        SolanaCheckoutResponse,
        SubscriptionAction,
    },
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::{
        solana::{transfer_request_for, verify_solana_payment, ChainLookup},
        stripe::{card_outcome, checkout_session_for, close_previous_session, CardProcessor},
    },
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
//
// The backend is a single generic type `A` that must satisfy every listed bound. Handlers that talk to an external
// rail name its client trait after `with`, which adds a second generic. `where requires [..]` wraps the route in the
// ACL middleware.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ $(where requires [$($roles:expr),+])?) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>); }
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                $(let res = res.wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));)?
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ ; with $client:path $(where requires [$($roles:expr),+])?) => {
        paste::paste! { pub struct [<$name:camel Route>]<A, C>(core::marker::PhantomData<fn() -> (A, C)>); }
        paste::paste! { impl<A, C> [<$name:camel Route>]<A, C> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> (A, C)>)
            }
        }}
        paste::paste! { impl<A, C> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A, C>
        where
            A: $($bounds +)+ 'static,
            C: $client + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A, C>);
                $(let res = res.wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));)?
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------
/// Route handler for the admin login endpoint
///
/// Exchanges the admin username and password for a short-lived bearer token carrying the `admin` role. Customers
/// never log in here; their tokens come from the hosted auth provider.
#[post("/auth/admin")]
pub async fn admin_login(
    req: HttpRequest,
    body: web::Json<AdminLoginRequest>,
    credentials: web::Data<AdminCredentials>,
    issuer: web::Data<TokenIssuer>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let ip = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    let AdminLoginRequest { username, password } = body.into_inner();
    debug!("💻️ Admin login attempt for '{username}' from {ip:?}");
    credentials.check(&username, &password)?;
    let access_token = issuer.issue_token(JwtClaims::admin(username.as_str()))?;
    info!("💻️ Admin '{username}' logged in from {ip:?}");
    Ok(HttpResponse::Ok().json(AccessTokenResponse {
        access_token,
        token_type: "Bearer".into(),
        expires_in: issuer.lifetime().num_seconds(),
    }))
}

//----------------------------------------------   Catalog  ----------------------------------------------------
route!(products => Get "/products" impl CatalogManagement);
/// Lists active products, optionally filtered by `category` and a `search` term.
pub async fn products<B: CatalogManagement>(
    query: web::Query<ProductQuery>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let mut query = query.into_inner();
    query.include_inactive = false;
    trace!("💻️ GET products {query:?}");
    let products = api.products(query).await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(product => Get "/products/{slug}" impl CatalogManagement);
pub async fn product<B: CatalogManagement>(
    path: web::Path<String>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let slug = path.into_inner();
    trace!("💻️ GET product {slug}");
    let product = api.product(&slug).await?;
    if !product.active {
        return Err(ServerError::NoRecordFound(format!("Product {slug} is not available")));
    }
    Ok(HttpResponse::Ok().json(product))
}

route!(subscription_plans => Get "/subscription_plans" impl SubscriptionManagement, CatalogManagement);
pub async fn subscription_plans<B>(api: web::Data<SubscriptionApi<B>>) -> Result<HttpResponse, ServerError>
where B: SubscriptionManagement + CatalogManagement {
    trace!("💻️ GET subscription plans");
    let plans = api.plans().await?.into_iter().filter(|p| p.active).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(plans))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(cart_quote => Post "/cart/quote" impl OrderManagement, CatalogManagement);
/// Prices a cart from the catalog, including shipping. Nothing is stored.
pub async fn cart_quote<B>(
    body: web::Json<CartQuoteRequest>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CatalogManagement,
{
    let quote = api.quote_cart(&body.items).await?;
    trace!("💻️ Cart quoted at {}", quote.total);
    Ok(HttpResponse::Ok().json(quote))
}

route!(place_order => Post "/orders" impl OrderManagement, CatalogManagement);
/// Route handler for order placement
///
/// Guests must supply an email address. When a bearer token accompanies the request, the order is linked to the
/// signed-in user, and the token's email is used if the form left it blank. The user id is never read from the body.
pub async fn place_order<B>(
    req: HttpRequest,
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CatalogManagement,
{
    let claims = optional_claims(&req)?;
    let mut request = body.into_inner();
    if let Some(claims) = claims {
        debug!("💻️ Order placed by signed-in user {}", claims.sub);
        request.user_id = Some(claims.sub);
        if request.email.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            request.email = claims.email;
        }
    }
    let detail = api.place_order(request).await?;
    Ok(HttpResponse::Created().json(detail))
}

route!(card_checkout => Post "/orders/{order_number}/checkout/card" impl OrderManagement, PaymentRecords, ExchangeRates; with CardProcessor);
/// Opens a hosted Stripe checkout page for a card order and returns its URL.
///
/// The order is checked before Stripe is called, so no session is created for an order that cannot be paid by card.
/// A session opened by an earlier call is expired first.
pub async fn card_checkout<B, C>(
    path: web::Path<OrderNumber>,
    api: web::Data<PaymentFlowApi<B>>,
    stripe: web::Data<C>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentRecords + ExchangeRates,
    C: CardProcessor,
{
    let number = path.into_inner();
    debug!("💻️ Card checkout requested for {number}");
    let detail = api.prepare_card_payment(&number).await?;
    if let Some(previous) = detail.order.stripe_session_id.as_deref() {
        close_previous_session(stripe.get_ref(), &number, previous).await?;
    }
    let session = stripe.create_session(&checkout_session_for(&detail, &options)).await?;
    let url = session
        .url
        .clone()
        .ok_or_else(|| ServerError::PaymentProviderError(format!("Session {} has no checkout URL", session.id)))?;
    api.begin_card_payment(&number, &session.id).await?;
    Ok(HttpResponse::Ok().json(CardCheckoutResponse { order_number: number, session_id: session.id, url }))
}

route!(solana_checkout => Post "/orders/{order_number}/checkout/solana" impl OrderManagement, PaymentRecords, ExchangeRates);
/// Returns the Solana Pay request for an order, creating it on the first call.
///
/// The amount and the reference key are chosen here, never by the client. Repeated calls return the same pending
/// request.
pub async fn solana_checkout<B>(
    path: web::Path<OrderNumber>,
    api: web::Data<PaymentFlowApi<B>>,
    config: web::Data<SolanaConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentRecords + ExchangeRates,
{
    let number = path.into_inner();
    let recipient =
        config.recipient.ok_or_else(|| ServerError::Unavailable("Solana payments are not enabled".into()))?;
    let order = api.fetch_order(&number).await?;
    if order.payment_method != PaymentMethod::Solana {
        return Err(OrderFlowError::PaymentMethodMismatch {
            order: number,
            expected: order.payment_method,
            requested: PaymentMethod::Solana,
        }
        .into());
    }
    let payment = match api.solana_payment_for(&number).await? {
        Some(existing) if existing.status == SolanaPaymentStatus::Pending => existing,
        _ => {
            let reference = solana_tools::Pubkey::new_reference().to_string();
            let quote = api.solana_quote_for(&order, &config.asset(), &recipient.to_string(), reference).await?;
            api.begin_solana_payment(&number, quote).await?
        },
    };
    let request = transfer_request_for(&payment, &config.label)?;
    let response = SolanaCheckoutResponse {
        order_number: number,
        reference: payment.reference.clone(),
        recipient: payment.recipient.clone(),
        spl_token: payment.spl_token.clone(),
        amount: request.amount.map(|a| a.to_string()).unwrap_or_default(),
        url: request.to_url(),
        qr_svg: request.to_qr_svg()?,
    };
    Ok(HttpResponse::Ok().json(response))
}

route!(solana_status => Get "/orders/{order_number}/checkout/solana/status" impl OrderManagement, PaymentRecords, ExchangeRates; with ChainLookup);
/// Polled by the checkout page. Looks the reference up on-chain and confirms the payment once a matching transfer
/// lands.
pub async fn solana_status<B, C>(
    path: web::Path<OrderNumber>,
    api: web::Data<PaymentFlowApi<B>>,
    chain: web::Data<C>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentRecords + ExchangeRates,
    C: ChainLookup,
{
    let number = path.into_inner();
    trace!("💻️ Solana status poll for {number}");
    let status = verify_solana_payment(api.get_ref(), chain.get_ref(), &number).await?;
    Ok(HttpResponse::Ok().json(status))
}

route!(etransfer_instructions => Get "/orders/{order_number}/checkout/etransfer" impl OrderManagement, PaymentRecords, ExchangeRates);
pub async fn etransfer_instructions<B>(
    path: web::Path<OrderNumber>,
    api: web::Data<PaymentFlowApi<B>>,
    config: web::Data<ETransferConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentRecords + ExchangeRates,
{
    let number = path.into_inner();
    let order = api.fetch_order(&number).await?;
    if order.payment_method != PaymentMethod::ETransfer {
        return Err(OrderFlowError::PaymentMethodMismatch {
            order: number,
            expected: order.payment_method,
            requested: PaymentMethod::ETransfer,
        }
        .into());
    }
    Ok(HttpResponse::Ok().json(ETransferInstructions {
        message: order.order_number.to_string(),
        order_number: order.order_number,
        amount: order.total.to_string(),
        recipient_email: config.recipient_email.clone(),
        payment_status: order.payment_status,
    }))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(stripe_webhook => Post "/stripe/webhook" impl OrderManagement, PaymentRecords, ExchangeRates);
/// Route handler for Stripe webhooks
///
/// The signature is checked against the raw body before anything is parsed. A bad or missing signature gets a 400.
/// Every well-signed event gets a 200, even when it could not be applied, since a retry would fail the same way. The
/// body says what happened.
pub async fn stripe_webhook<B>(
    req: HttpRequest,
    body: web::Bytes,
    config: web::Data<WebhookConfig>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentRecords + ExchangeRates,
{
    let header = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ServerError::InvalidWebhook(format!("Missing {SIGNATURE_HEADER} header")))?;
    let event = construct_event(&body, header, config.secret.reveal(), config.tolerance, Utc::now()).map_err(|e| {
        warn!("💳️ Rejected Stripe webhook. {e}");
        ServerError::from(e)
    })?;
    info!("💳️ Received Stripe event {} ({})", event.id, event.event_type);
    let response = match card_outcome(&event) {
        Ok(Some(outcome)) => match api.apply_card_outcome(outcome).await {
            Ok(order) => {
                JsonResponse::success(format!("Order {} payment is {}", order.order_number, order.payment_status))
            },
            Err(e) => {
                warn!("💳️ Could not apply Stripe event {}. {e}", event.id);
                JsonResponse::failure(e)
            },
        },
        Ok(None) => JsonResponse::success(format!("Event {} ignored", event.event_type)),
        Err(e) => {
            warn!("💳️ Stripe event {} has an unexpected payload. {e}", event.id);
            JsonResponse::failure(e)
        },
    };
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Customer  ----------------------------------------------------
route!(my_orders => Get "/account/orders" impl OrderManagement, SubscriptionManagement);
/// The caller's orders, including guest orders placed with the email on their token.
pub async fn my_orders<B>(claims: JwtClaims, api: web::Data<AccountApi<B>>) -> Result<HttpResponse, ServerError>
where B: OrderManagement + SubscriptionManagement {
    debug!("💻️ GET my_orders for {}", claims.sub);
    let orders = api.orders_for_customer(&claims.sub, claims.email.as_deref()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(my_order => Get "/account/orders/{order_number}" impl OrderManagement, SubscriptionManagement);
/// One of the caller's orders. Orders belonging to anyone else look exactly like orders that do not exist.
pub async fn my_order<B>(
    claims: JwtClaims,
    path: web::Path<OrderNumber>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + SubscriptionManagement,
{
    let number = path.into_inner();
    debug!("💻️ GET order {number} for {}", claims.sub);
    let detail = api
        .order_for_customer(&number, &claims.sub, claims.email.as_deref())
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {number} does not exist")))?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(my_subscriptions => Get "/account/subscriptions" impl OrderManagement, SubscriptionManagement);
pub async fn my_subscriptions<B>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + SubscriptionManagement,
{
    debug!("💻️ GET my_subscriptions for {}", claims.sub);
    let subscriptions = api.subscriptions_for_user(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(subscriptions))
}

route!(subscribe => Post "/account/subscriptions" impl SubscriptionManagement, CatalogManagement);
pub async fn subscribe<B>(
    claims: JwtClaims,
    body: web::Json<NewSubscriptionRequest>,
    api: web::Data<SubscriptionApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SubscriptionManagement + CatalogManagement,
{
    debug!("💻️ New subscription to plan {} for {}", body.plan_id, claims.sub);
    let subscription = api.subscribe(&claims.sub, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(subscription))
}

route!(change_subscription => Post "/account/subscriptions/{id}/{action}" impl SubscriptionManagement, CatalogManagement);
/// Pauses, resumes or cancels one of the caller's subscriptions.
pub async fn change_subscription<B>(
    claims: JwtClaims,
    path: web::Path<(i64, SubscriptionAction)>,
    api: web::Data<SubscriptionApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SubscriptionManagement + CatalogManagement,
{
    let (id, action) = path.into_inner();
    debug!("💻️ {action:?} subscription #{id} for {}", claims.sub);
    let requester = Requester::Customer(&claims.sub);
    let subscription = match action {
        SubscriptionAction::Pause => api.pause(id, requester).await?,
        SubscriptionAction::Resume => api.resume(id, requester).await?,
        SubscriptionAction::Cancel => api.cancel(id, requester).await?,
    };
    Ok(HttpResponse::Ok().json(subscription))
}

//----------------------------------------------   Admin: orders  ----------------------------------------------------
route!(search_orders => Get "/admin/orders" impl OrderManagement, PaymentRecords, ExchangeRates where requires [Role::Admin]);
/// Order search. Every query parameter is optional; statuses take a comma-separated list.
pub async fn search_orders<B>(
    query: web::Query<OrderSearchParams>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentRecords + ExchangeRates,
{
    let filter = query.into_inner().into_filter().map_err(ServerError::ValidationError)?;
    debug!("💻️ GET search_orders. {filter}");
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_detail => Get "/admin/orders/{order_number}" impl OrderManagement, PaymentRecords, ExchangeRates where requires [Role::Admin]);
pub async fn order_detail<B>(
    path: web::Path<OrderNumber>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentRecords + ExchangeRates,
{
    let detail = api.order_detail(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(update_payment_status => Patch "/admin/orders/{order_number}/payment_status" impl OrderManagement, PaymentRecords, ExchangeRates where requires [Role::Admin]);
pub async fn update_payment_status<B>(
    claims: JwtClaims,
    path: web::Path<OrderNumber>,
    body: web::Json<PaymentStatusUpdate>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentRecords + ExchangeRates,
{
    let number = path.into_inner();
    info!("💻️ {} sets the payment status of {number} to {}", claims.sub, body.status);
    let order = api.set_payment_status(&number, body.status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_shipping => Patch "/admin/orders/{order_number}/shipping" impl OrderManagement, PaymentRecords, ExchangeRates where requires [Role::Admin]);
pub async fn update_shipping<B>(
    claims: JwtClaims,
    path: web::Path<OrderNumber>,
    body: web::Json<ShippingStatusUpdate>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentRecords + ExchangeRates,
{
    let number = path.into_inner();
    let ShippingStatusUpdate { status, tracking_number } = body.into_inner();
    info!("💻️ {} sets the shipping status of {number} to {status}", claims.sub);
    let order = api.set_shipping_status(&number, status, tracking_number).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(verify_solana => Post "/admin/orders/{order_number}/solana/verify" impl OrderManagement, PaymentRecords, ExchangeRates; with ChainLookup where requires [Role::Admin]);
/// Runs the same on-chain check as the customer's status poll.
pub async fn verify_solana<B, C>(
    path: web::Path<OrderNumber>,
    api: web::Data<PaymentFlowApi<B>>,
    chain: web::Data<C>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentRecords + ExchangeRates,
    C: ChainLookup,
{
    let number = path.into_inner();
    info!("💻️ Admin verification of the Solana payment for {number}");
    let status = verify_solana_payment(api.get_ref(), chain.get_ref(), &number).await?;
    Ok(HttpResponse::Ok().json(status))
}

route!(record_etransfer => Post "/admin/etransfers" impl OrderManagement, PaymentRecords, ExchangeRates where requires [Role::Admin]);
/// Records an e-transfer the admin has seen arrive. With `mark_completed`, the order is also marked as paid.
pub async fn record_etransfer<B>(
    claims: JwtClaims,
    body: web::Json<ETransferRecordRequest>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentRecords + ExchangeRates,
{
    let ETransferRecordRequest { mut payment, mark_completed } = body.into_inner();
    if payment.reference.trim().is_empty() || payment.sender_name.trim().is_empty() {
        return Err(ServerError::ValidationError("An e-transfer needs a sender name and a reference".into()));
    }
    if !payment.amount.is_positive() {
        return Err(ServerError::ValidationError(format!("{} is not a valid transfer amount", payment.amount)));
    }
    payment.recorded_by = claims.sub;
    let (payment, order) = api.record_etransfer(payment, mark_completed).await?;
    Ok(HttpResponse::Created().json(json!({ "payment": payment, "order": order })))
}

route!(order_etransfers => Get "/admin/orders/{order_number}/etransfers" impl OrderManagement, PaymentRecords, ExchangeRates where requires [Role::Admin]);
pub async fn order_etransfers<B>(
    path: web::Path<OrderNumber>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentRecords + ExchangeRates,
{
    let payments = api.etransfers_for(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(payments))
}

//----------------------------------------------   Admin: catalog  ----------------------------------------------------
route!(upsert_product => Post "/admin/products" impl CatalogManagement where requires [Role::Admin]);
/// Creates a product, or replaces the product with the same slug.
pub async fn upsert_product<B: CatalogManagement>(
    body: web::Json<NewProduct>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.upsert_product(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(update_product => Patch "/admin/products/{id}" impl CatalogManagement where requires [Role::Admin]);
pub async fn update_product<B: CatalogManagement>(
    path: web::Path<i64>,
    body: web::Json<ProductUpdate>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.update_product(path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(set_exchange_rate => Post "/admin/exchange_rate" impl ExchangeRates where requires [Role::Admin]);
/// Sets the USD price of a crypto asset, used to price Solana payments in native SOL.
pub async fn set_exchange_rate<B: ExchangeRates>(
    body: web::Json<ExchangeRateUpdate>,
    api: web::Data<ExchangeRateApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ExchangeRateUpdate { currency, rate } = body.into_inner();
    let rate = Cents::parse_decimal(&rate).map_err(|e| ServerError::ValidationError(e.to_string()))?;
    let rate = ExchangeRate::new(currency.trim().to_ascii_uppercase(), rate);
    api.set_exchange_rate(&rate).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("1 {} = {}", rate.base_currency, rate.rate))))
}

//----------------------------------------------   Admin: subscriptions  ------------------------------------------------
route!(create_plan => Post "/admin/subscription_plans" impl SubscriptionManagement, CatalogManagement where requires [Role::Admin]);
pub async fn create_plan<B>(
    body: web::Json<NewSubscriptionPlan>,
    api: web::Data<SubscriptionApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SubscriptionManagement + CatalogManagement,
{
    let plan = api.create_plan(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(plan))
}

route!(all_subscriptions => Get "/admin/subscriptions" impl SubscriptionManagement, CatalogManagement where requires [Role::Admin]);
pub async fn all_subscriptions<B>(api: web::Data<SubscriptionApi<B>>) -> Result<HttpResponse, ServerError>
where B: SubscriptionManagement + CatalogManagement {
    let subscriptions = api.all_subscriptions().await?;
    Ok(HttpResponse::Ok().json(subscriptions))
}

route!(create_delivery => Post "/admin/subscriptions/{id}/deliveries" impl SubscriptionManagement, CatalogManagement where requires [Role::Admin]);
/// Creates the next delivery of a subscription and advances its billing period. Deliveries are never created on a
/// timer, only here.
pub async fn create_delivery<B>(
    path: web::Path<i64>,
    body: Option<web::Json<NewDeliveryRequest>>,
    api: web::Data<SubscriptionApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SubscriptionManagement + CatalogManagement,
{
    let id = path.into_inner();
    let scheduled_for = body.and_then(|b| b.into_inner().scheduled_for).unwrap_or_else(Utc::now);
    let (delivery, subscription) = api.create_delivery(id, scheduled_for).await?;
    Ok(HttpResponse::Created().json(json!({ "delivery": delivery, "subscription": subscription })))
}

route!(deliveries => Get "/admin/subscriptions/{id}/deliveries" impl SubscriptionManagement, CatalogManagement where requires [Role::Admin]);
pub async fn deliveries<B>(path: web::Path<i64>, api: web::Data<SubscriptionApi<B>>) -> Result<HttpResponse, ServerError>
where B: SubscriptionManagement + CatalogManagement {
    let deliveries = api.deliveries(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(deliveries))
}

route!(update_delivery => Patch "/admin/deliveries/{id}" impl SubscriptionManagement, CatalogManagement where requires [Role::Admin]);
pub async fn update_delivery<B>(
    path: web::Path<i64>,
    body: web::Json<DeliveryStatusUpdate>,
    api: web::Data<SubscriptionApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SubscriptionManagement + CatalogManagement,
{
    let DeliveryStatusUpdate { status, tracking_number } = body.into_inner();
    let delivery = api.set_delivery_status(path.into_inner(), status, tracking_number).await?;
    Ok(HttpResponse::Ok().json(delivery))
}

