use chrono::Utc;
use cucumber::{given, then, when};
use sf_common::Cents;
use storefront_engine::{
    db_types::{NewETransferPayment, NewShippingAddress, PaymentMethod, PaymentStatus, ShippingStatus, SolanaQuote},
    order_objects::{CardOutcome, CartItem, CheckoutRequest, SolanaAsset},
    CatalogManagement,
    NewSubscriptionRequest,
    OrderManagement,
    Requester,
    SubscriptionManagement,
};

use crate::cucumber::StoreWorld;

const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
const MERCHANT: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

fn address() -> NewShippingAddress {
    NewShippingAddress {
        full_name: "Ada Lovelace".into(),
        line1: "12 Analytical Row".into(),
        city: "Toronto".into(),
        region: "ON".into(),
        postal_code: "M5V 2T6".into(),
        country: "CA".into(),
        ..Default::default()
    }
}

/// Parses carts written as "2 bpc-157, 1 tb-500".
async fn cart(world: &StoreWorld, spec: &str) -> Vec<CartItem> {
    let mut items = Vec::new();
    for line in spec.split(',').map(str::trim).filter(|l| !l.is_empty()) {
        let (quantity, slug) = line.split_once(' ').expect("Cart lines look like '2 bpc-157'");
        let product = world
            .system()
            .db
            .fetch_product_by_slug(slug.trim())
            .await
            .expect("Error fetching product")
            .unwrap_or_else(|| panic!("Unknown product {slug}"));
        items.push(CartItem::new(product.id, quantity.parse().expect("Invalid quantity")));
    }
    items
}

async fn product_ids(world: &StoreWorld, slugs: &str) -> Vec<i64> {
    let mut ids = Vec::new();
    for slug in slugs.split(',').map(str::trim) {
        let product = world.system().db.fetch_product_by_slug(slug).await.expect("Error fetching product");
        ids.push(product.map(|p| p.id).unwrap_or(-1));
    }
    ids
}

fn cents(amount: &str) -> Cents {
    Cents::parse_decimal(amount).unwrap_or_else(|e| panic!("{amount} is not an amount: {e}"))
}

async fn checkout(
    world: &mut StoreWorld,
    user_id: Option<String>,
    email: Option<String>,
    items: &str,
    method: &str,
    alias: Option<String>,
) {
    let request = CheckoutRequest {
        user_id,
        email,
        items: cart(world, items).await,
        shipping_address: address(),
        payment_method: method.parse::<PaymentMethod>().expect("Invalid payment method"),
        notes: None,
    };
    let result = world.system().checkout.place_order(request).await;
    match (result, alias) {
        (Ok(detail), Some(alias)) => {
            world.orders.insert(alias, detail.order.order_number);
            world.last_error = None;
        },
        (result, _) => world.record_error(result),
    }
}

//--------------------------------------------------   Checkout   ----------------------------------------------------

#[given(expr = "guest {string} checks out {string} paying by {word} as order {string}")]
#[when(expr = "guest {string} checks out {string} paying by {word} as order {string}")]
async fn guest_checkout(world: &mut StoreWorld, email: String, items: String, method: String, alias: String) {
    checkout(world, None, Some(email), &items, &method, Some(alias.clone())).await;
    assert!(world.orders.contains_key(&alias), "Checkout failed: {:?}", world.last_error);
}

#[when(expr = "customer {string} with email {string} checks out {string} paying by {word} as order {string}")]
async fn customer_checkout(
    world: &mut StoreWorld,
    user_id: String,
    email: String,
    items: String,
    method: String,
    alias: String,
) {
    checkout(world, Some(user_id), Some(email), &items, &method, Some(alias.clone())).await;
    assert!(world.orders.contains_key(&alias), "Checkout failed: {:?}", world.last_error);
}

#[when(expr = "guest {string} tries to check out {string}")]
async fn guest_checkout_attempt(world: &mut StoreWorld, email: String, items: String) {
    checkout(world, None, Some(email), &items, "card", None).await;
}

#[then(expr = "the last operation failed with {string}")]
async fn last_operation_failed(world: &mut StoreWorld, message: String) {
    let err = world.last_error.as_ref().expect("The last operation succeeded");
    assert!(err.contains(&message), "Expected an error containing '{message}', got '{err}'");
}

#[then("the last operation succeeded")]
async fn last_operation_succeeded(world: &mut StoreWorld) {
    assert!(world.last_error.is_none(), "Unexpected error: {:?}", world.last_error);
}

#[then(expr = "order {string} has a subtotal of {word}, shipping of {word} and a total of {word}")]
async fn order_totals(world: &mut StoreWorld, alias: String, subtotal: String, shipping: String, total: String) {
    let number = world.order_number(&alias);
    let order = world.system().db.fetch_order_by_number(&number).await.unwrap().expect("Order not found");
    assert_eq!(order.subtotal, cents(&subtotal));
    assert_eq!(order.shipping_cost, cents(&shipping));
    assert_eq!(order.total, cents(&total));
}

#[then(expr = "order {string} has {int} item(s)")]
async fn order_items(world: &mut StoreWorld, alias: String, count: usize) {
    let number = world.order_number(&alias);
    let detail = world.system().db.fetch_order_detail(&number).await.unwrap().expect("Order not found");
    assert_eq!(detail.items.len(), count);
    assert_eq!(detail.shipping_address.full_name, "Ada Lovelace");
    let sum: Cents = detail.items.iter().map(|i| i.line_total()).sum();
    assert_eq!(sum, detail.order.subtotal);
}

#[then(expr = "order {string} has payment status {string}")]
async fn payment_status(world: &mut StoreWorld, alias: String, status: String) {
    let number = world.order_number(&alias);
    let order = world.system().db.fetch_order_by_number(&number).await.unwrap().expect("Order not found");
    assert_eq!(order.payment_status, status.parse::<PaymentStatus>().unwrap());
}

#[then(expr = "order {string} has shipping status {string}")]
async fn shipping_status(world: &mut StoreWorld, alias: String, status: String) {
    let number = world.order_number(&alias);
    let order = world.system().db.fetch_order_by_number(&number).await.unwrap().expect("Order not found");
    assert_eq!(order.shipping_status, status.parse::<ShippingStatus>().unwrap());
}

#[then(expr = "order {string} has payment reference {string}")]
async fn payment_reference(world: &mut StoreWorld, alias: String, reference: String) {
    let number = world.order_number(&alias);
    let order = world.system().db.fetch_order_by_number(&number).await.unwrap().expect("Order not found");
    assert_eq!(order.payment_reference.as_deref(), Some(reference.as_str()));
}

#[then(expr = "product {string} still has {int} in stock")]
async fn stock_unchanged(world: &mut StoreWorld, slug: String, stock: i64) {
    let product = world.system().db.fetch_product_by_slug(&slug).await.unwrap().expect("Product not found");
    assert_eq!(product.stock, stock);
}

//--------------------------------------------------   Card   --------------------------------------------------------

#[when(expr = "the card payment for order {string} starts with session {string}")]
async fn begin_card(world: &mut StoreWorld, alias: String, session: String) {
    let number = world.order_number(&alias);
    world.system().payments.begin_card_payment(&number, &session).await.expect("Error starting card payment");
}

#[when(expr = "the card payment for order {string} tries to start with session {string}")]
async fn begin_card_attempt(world: &mut StoreWorld, alias: String, session: String) {
    let number = world.order_number(&alias);
    let result = world.system().payments.begin_card_payment(&number, &session).await;
    world.record_error(result);
}

async fn card_outcome(world: &mut StoreWorld, session: String, status: String, intent: Option<String>) {
    let outcome = CardOutcome {
        session_id: session,
        order_number: None,
        payment_intent: intent,
        status: status.parse().expect("Invalid payment status"),
    };
    let result = world.system().payments.apply_card_outcome(outcome).await;
    world.record_error(result);
}

#[when(expr = "Stripe reports session {string} as {string} with payment intent {string}")]
async fn stripe_outcome_with_intent(world: &mut StoreWorld, session: String, status: String, intent: String) {
    card_outcome(world, session, status, Some(intent)).await;
}

#[when(expr = "Stripe reports session {string} as {string}")]
async fn stripe_outcome(world: &mut StoreWorld, session: String, status: String) {
    card_outcome(world, session, status, None).await;
}

#[when(expr = "Stripe reports session {string} for order {string} as {string}")]
async fn stripe_outcome_by_order(world: &mut StoreWorld, session: String, alias: String, status: String) {
    let outcome = CardOutcome {
        session_id: session,
        order_number: Some(world.order_number(&alias)),
        payment_intent: None,
        status: status.parse().expect("Invalid payment status"),
    };
    let result = world.system().payments.apply_card_outcome(outcome).await;
    world.record_error(result);
}

//--------------------------------------------------   Solana   ------------------------------------------------------

async fn request_solana(world: &mut StoreWorld, alias: &str, asset: &str, reference: String) {
    let number = world.order_number(alias);
    let payments = &world.system().payments;
    let asset = match asset {
        "SOL" => SolanaAsset::Sol,
        _ => SolanaAsset::UsdToken { mint: USDC_MINT.to_string(), decimals: 6 },
    };
    let order = world.system().db.fetch_order_by_number(&number).await.unwrap().expect("Order not found");
    let result = match payments.solana_quote_for(&order, &asset, MERCHANT, reference).await {
        Ok(quote) => payments.begin_solana_payment(&number, quote).await.map(|_| ()),
        Err(e) => Err(e),
    };
    world.record_error(result);
}

#[when(expr = "a Solana payment for order {string} is requested in {word} with reference {string}")]
async fn solana_request(world: &mut StoreWorld, alias: String, asset: String, reference: String) {
    request_solana(world, &alias, &asset, reference).await;
    assert!(world.last_error.is_none(), "Solana request failed: {:?}", world.last_error);
}

#[when(expr = "a Solana payment for order {string} is attempted in {word} with reference {string}")]
async fn solana_request_attempt(world: &mut StoreWorld, alias: String, asset: String, reference: String) {
    request_solana(world, &alias, &asset, reference).await;
}

#[when(expr = "a Solana payment is recorded directly for order {string} with reference {string}")]
async fn solana_request_direct(world: &mut StoreWorld, alias: String, reference: String) {
    let number = world.order_number(&alias);
    let quote = SolanaQuote {
        reference,
        recipient: MERCHANT.to_string(),
        spl_token: None,
        amount_base_units: 1_000_000_000,
        decimals: 9,
    };
    let result = world.system().payments.begin_solana_payment(&number, quote).await;
    world.record_error(result);
}

#[then(expr = "the Solana request for order {string} expects {int} base units")]
async fn solana_amount(world: &mut StoreWorld, alias: String, amount: i64) {
    let number = world.order_number(&alias);
    let payment = world.system().payments.solana_payment_for(&number).await.unwrap().expect("No Solana request");
    assert_eq!(payment.amount_base_units, amount);
}

#[then(expr = "the Solana request for order {string} has reference {string}")]
async fn solana_reference(world: &mut StoreWorld, alias: String, reference: String) {
    let number = world.order_number(&alias);
    let payment = world.system().payments.solana_payment_for(&number).await.unwrap().expect("No Solana request");
    assert_eq!(payment.reference, reference);
    assert_eq!(payment.recipient, MERCHANT);
}

#[when(expr = "the Solana payment with reference {string} confirms with signature {string}")]
async fn solana_confirm(world: &mut StoreWorld, reference: String, signature: String) {
    let result = world.system().payments.confirm_solana_payment(&reference, &signature).await;
    world.record_error(result);
}

//--------------------------------------------------   E-transfer   --------------------------------------------------

fn etransfer_record(
    world: &StoreWorld,
    admin: String,
    alias: &str,
    sender: String,
    reference: String,
    amount: &str,
) -> NewETransferPayment {
    NewETransferPayment {
        order_number: world.order_number(alias),
        sender_name: sender,
        reference,
        amount: cents(amount),
        notes: None,
        recorded_by: admin,
    }
}

#[when(expr = "admin {string} records an e-transfer for order {string} from {string} with reference {string} for {word}")]
async fn record_etransfer(
    world: &mut StoreWorld,
    admin: String,
    alias: String,
    sender: String,
    reference: String,
    amount: String,
) {
    let payment = etransfer_record(world, admin, &alias, sender, reference, &amount);
    let result = world.system().payments.record_etransfer(payment, false).await;
    world.record_error(result);
}

#[when(
    expr = "admin {string} records an e-transfer for order {string} from {string} with reference {string} for {word} \
            and marks it paid"
)]
async fn record_etransfer_paid(
    world: &mut StoreWorld,
    admin: String,
    alias: String,
    sender: String,
    reference: String,
    amount: String,
) {
    let payment = etransfer_record(world, admin, &alias, sender, reference, &amount);
    let result = world.system().payments.record_etransfer(payment, true).await;
    world.record_error(result);
}

#[then(expr = "order {string} has {int} e-transfer record(s)")]
async fn etransfer_records(world: &mut StoreWorld, alias: String, count: usize) {
    let number = world.order_number(&alias);
    let records = world.system().payments.etransfers_for(&number).await.expect("Error fetching e-transfers");
    assert_eq!(records.len(), count);
}

//--------------------------------------------------   Admin   -------------------------------------------------------

#[when(expr = "the admin sets the payment status of order {string} to {string}")]
async fn admin_payment_status(world: &mut StoreWorld, alias: String, status: String) {
    let number = world.order_number(&alias);
    let result = world.system().payments.set_payment_status(&number, status.parse().unwrap()).await;
    world.record_error(result);
}

async fn move_order(world: &mut StoreWorld, alias: String, status: String, tracking: Option<String>) {
    let number = world.order_number(&alias);
    let status = status.parse::<ShippingStatus>().expect("Invalid shipping status");
    let result = world.system().payments.set_shipping_status(&number, status, tracking).await;
    world.record_error(result);
}

#[when(expr = "the admin moves order {string} to {string}")]
async fn admin_ship(world: &mut StoreWorld, alias: String, status: String) {
    move_order(world, alias, status, None).await;
}

#[when(expr = "the admin moves order {string} to {string} with tracking {string}")]
async fn admin_ship_tracking(world: &mut StoreWorld, alias: String, status: String, tracking: String) {
    move_order(world, alias, status, Some(tracking)).await;
}

#[then(expr = "order {string} has tracking number {string}")]
async fn tracking_number(world: &mut StoreWorld, alias: String, tracking: String) {
    let number = world.order_number(&alias);
    let order = world.system().db.fetch_order_by_number(&number).await.unwrap().expect("Order not found");
    assert_eq!(order.tracking_number.as_deref(), Some(tracking.as_str()));
}

//--------------------------------------------------   Accounts   ----------------------------------------------------

#[then(expr = "customer {string} with email {string} sees {int} order(s)")]
async fn customer_orders(world: &mut StoreWorld, user_id: String, email: String, count: usize) {
    let accounts = &world.system().accounts;
    let orders = accounts.orders_for_customer(&user_id, Some(&email)).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count);
    assert!(orders.windows(2).all(|w| w[0].created_at >= w[1].created_at), "Orders are not newest first");
}

#[then(expr = "customer {string} with email {string} can see order {string}")]
async fn customer_can_see(world: &mut StoreWorld, user_id: String, email: String, alias: String) {
    let number = world.order_number(&alias);
    let detail = world.system().accounts.order_for_customer(&number, &user_id, Some(&email)).await.unwrap();
    assert!(detail.is_some(), "{user_id} cannot see order {alias}");
}

#[then(expr = "customer {string} with email {string} cannot see order {string}")]
async fn customer_cannot_see(world: &mut StoreWorld, user_id: String, email: String, alias: String) {
    let number = world.order_number(&alias);
    let detail = world.system().accounts.order_for_customer(&number, &user_id, Some(&email)).await.unwrap();
    assert!(detail.is_none(), "{user_id} can see order {alias}");
}

//--------------------------------------------------   Subscriptions   -----------------------------------------------

async fn subscribe(world: &mut StoreWorld, user_id: String, plan: String, products: String) {
    let plans = world.system().subscriptions.plans().await.expect("Error fetching plans");
    let plan = plans.into_iter().find(|p| p.name == plan).unwrap_or_else(|| panic!("No plan named {plan}"));
    let request = NewSubscriptionRequest { plan_id: plan.id, product_ids: product_ids(world, &products).await };
    match world.system().subscriptions.subscribe(&user_id, request).await {
        Ok(subscription) => {
            world.subscription = Some(subscription);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "customer {string} subscribes to plan {string} with {string}")]
async fn customer_subscribes(world: &mut StoreWorld, user_id: String, plan: String, products: String) {
    subscribe(world, user_id, plan, products).await;
    assert!(world.last_error.is_none(), "Subscription failed: {:?}", world.last_error);
}

#[when(expr = "customer {string} tries to subscribe to plan {string} with {string}")]
async fn customer_subscribe_attempt(world: &mut StoreWorld, user_id: String, plan: String, products: String) {
    subscribe(world, user_id, plan, products).await;
}

async fn lifecycle(world: &mut StoreWorld, requester: Requester<'_>, action: &str) {
    let id = world.subscription_id();
    let api = &world.system().subscriptions;
    let result = match action {
        "pause" => api.pause(id, requester).await,
        "resume" => api.resume(id, requester).await,
        "cancel" => api.cancel(id, requester).await,
        other => panic!("Unknown subscription action {other}"),
    };
    world.record_error(result);
}

#[when(expr = "customer {string} requests to {word} the subscription")]
async fn customer_lifecycle(world: &mut StoreWorld, user_id: String, action: String) {
    lifecycle(world, Requester::Customer(&user_id), &action).await;
}

#[when(expr = "the admin requests to {word} the subscription")]
async fn admin_lifecycle(world: &mut StoreWorld, action: String) {
    lifecycle(world, Requester::Admin, &action).await;
}

#[then(expr = "the subscription is {string}")]
async fn subscription_status(world: &mut StoreWorld, status: String) {
    let id = world.subscription_id();
    let subscription = world.system().db.fetch_subscription(id).await.unwrap().expect("Subscription not found");
    assert_eq!(subscription.status.to_string(), status);
}

#[then(expr = "the billing period is {int} days long")]
async fn billing_period(world: &mut StoreWorld, days: i64) {
    let id = world.subscription_id();
    let subscription = world.system().db.fetch_subscription(id).await.unwrap().expect("Subscription not found");
    let length = subscription.current_period_end - subscription.current_period_start;
    assert_eq!(length.num_days(), days);
}

#[when("the admin creates a delivery for the subscription")]
async fn create_delivery(world: &mut StoreWorld) {
    let id = world.subscription_id();
    let current = world.system().db.fetch_subscription(id).await.unwrap().expect("Subscription not found");
    world.previous_period_end = Some(current.current_period_end);
    match world.system().subscriptions.create_delivery(id, Utc::now()).await {
        Ok((delivery, subscription)) => {
            world.delivery = Some(delivery);
            world.subscription = Some(subscription);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[then(expr = "the delivery costs {word}")]
async fn delivery_amount(world: &mut StoreWorld, amount: String) {
    let delivery = world.delivery.as_ref().expect("No delivery was created");
    assert_eq!(delivery.amount, cents(&amount));
}

#[then("the new billing period starts where the previous one ended")]
async fn period_advanced(world: &mut StoreWorld) {
    let subscription = world.subscription.as_ref().expect("No subscription");
    let previous_end = world.previous_period_end.expect("No previous period recorded");
    assert_eq!(subscription.current_period_start, previous_end);
}

#[then(expr = "the subscription has {int} deliveries")]
async fn delivery_count(world: &mut StoreWorld, count: usize) {
    let id = world.subscription_id();
    let deliveries = world.system().subscriptions.deliveries(id).await.expect("Error fetching deliveries");
    assert_eq!(deliveries.len(), count);
}
