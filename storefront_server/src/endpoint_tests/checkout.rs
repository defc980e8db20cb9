use actix_web::{http::StatusCode, test::TestRequest, web};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use sf_common::Cents;
use storefront_engine::{
    db_types::{PaymentMethod, PaymentStatus, Product},
    events::EventProducers,
    order_objects::ShippingRates,
    CheckoutApi,
    PaymentFlowApi,
};
use stripe_tools::CheckoutSession;

use super::{
    helpers::{customer_token, sample_order, sample_order_detail, send_request},
    mocks::{MockStore, MockStripe},
};
use crate::{
    config::ETransferConfig,
    data_objects::{CardCheckoutResponse, ETransferInstructions},
    routes::{CardCheckoutRoute, EtransferInstructionsRoute, PlaceOrderRoute},
};

const ORDER: &str = "PP-240612-K3Q9ZB";

fn bpc_157() -> Product {
    let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    Product {
        id: 7,
        slug: "bpc-157-5mg".to_string(),
        name: "BPC-157 5mg".to_string(),
        description: "Lyophilized research peptide".to_string(),
        price: Cents::from(4500),
        stock: 25,
        active: true,
        category: Some("peptides".to_string()),
        image_url: None,
        created_at,
        updated_at: created_at,
    }
}

fn checkout_form(email: Option<&str>) -> Value {
    json!({
        "email": email,
        "items": [{"product_id": 7, "quantity": 2}],
        "shipping_address": {
            "full_name": "Ada Lovelace", "line1": "12 St Clair Ave", "city": "Toronto", "region": "ON",
            "postal_code": "M4V 1K6", "country": "CA"
        },
        "payment_method": "card"
    })
}

fn checkout_store() -> MockStore {
    let mut store = MockStore::new();
    store.expect_fetch_products_by_ids().returning(|_| Ok(vec![bpc_157()]));
    store
}

fn configure_checkout(cfg: &mut web::ServiceConfig, store: MockStore) {
    let api = CheckoutApi::new(store, ShippingRates::default(), EventProducers::default());
    cfg.app_data(web::Data::new(api)).service(PlaceOrderRoute::<MockStore>::new());
}

#[actix_web::test]
async fn guest_order_is_priced_from_catalog() {
    let _ = env_logger::try_init().ok();
    let mut store = checkout_store();
    store
        .expect_insert_order()
        .withf(|o| {
            o.user_id.is_none() &&
                o.email == "guest@example.com" &&
                o.subtotal == Cents::from(9000) &&
                o.shipping_cost == Cents::from(1500) &&
                o.total == Cents::from(10_500) &&
                o.items[0].product_name == "BPC-157 5mg"
        })
        .times(1)
        .returning(|o| {
            let mut detail = sample_order_detail(o.order_number.as_str(), PaymentMethod::Card);
            detail.order.user_id = None;
            detail.order.email = o.email;
            Ok(detail)
        });
    let req = TestRequest::post().uri("/orders").set_json(checkout_form(Some("guest@example.com")));
    let (status, body) = send_request(req, None, |cfg| configure_checkout(cfg, store)).await;
    assert_eq!(status, StatusCode::CREATED);
    let detail: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(detail["order"]["email"], "guest@example.com");
    assert_eq!(detail["order"]["payment_status"], "pending");
    assert_eq!(detail["items"][0]["quantity"], 2);
}

#[actix_web::test]
async fn signed_in_order_uses_token_identity() {
    let _ = env_logger::try_init().ok();
    let mut store = checkout_store();
    store
        .expect_insert_order()
        .withf(|o| o.user_id.as_deref() == Some("user_2abc") && o.email == "ada@example.com")
        .times(1)
        .returning(|o| Ok(sample_order_detail(o.order_number.as_str(), PaymentMethod::Card)));
    let req = TestRequest::post().uri("/orders").set_json(checkout_form(None));
    let (status, _) = send_request(req, Some(&customer_token()), |cfg| configure_checkout(cfg, store)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[actix_web::test]
async fn guest_order_needs_email() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/orders").set_json(checkout_form(None));
    let (status, body) = send_request(req, None, |cfg| configure_checkout(cfg, MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("email"), "{body}");
}

#[actix_web::test]
async fn invalid_token_is_not_a_guest_checkout() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/orders").set_json(checkout_form(Some("guest@example.com")));
    let (status, _) = send_request(req, Some("not.a.token"), |cfg| configure_checkout(cfg, MockStore::new())).await;
    assert!(status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST, "{status}");
}

fn configure_card(cfg: &mut web::ServiceConfig, store: MockStore, stripe: MockStripe) {
    let api = PaymentFlowApi::new(store, EventProducers::default());
    cfg.app_data(web::Data::new(api))
        .app_data(web::Data::new(stripe))
        .service(CardCheckoutRoute::<MockStore, MockStripe>::new());
}

#[actix_web::test]
async fn card_checkout_opens_stripe_session() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order_detail().returning(|n| Ok(Some(sample_order_detail(n.as_str(), PaymentMethod::Card))));
    store.expect_fetch_order_by_number().returning(|n| Ok(Some(sample_order(n.as_str(), PaymentMethod::Card))));
    store.expect_attach_stripe_session().withf(|n, s| n.as_str() == ORDER && s == "cs_test_1").times(1).returning(
        |n, s| {
            let mut order = sample_order(n.as_str(), PaymentMethod::Card);
            order.payment_status = PaymentStatus::Processing;
            order.stripe_session_id = Some(s.to_string());
            Ok(order)
        },
    );
    let mut stripe = MockStripe::new();
    stripe
        .expect_create_session()
        .withf(|s| {
            s.order_number == ORDER &&
                s.shipping == Cents::from(1500) &&
                s.line_items.len() == 1 &&
                s.success_url.starts_with("https://shop.example.com/checkout/success")
        })
        .times(1)
        .returning(|_| {
            Ok(CheckoutSession {
                id: "cs_test_1".to_string(),
                url: Some("https://checkout.stripe.com/c/pay/cs_test_1".to_string()),
                ..Default::default()
            })
        });
    let req = TestRequest::post().uri(&format!("/orders/{ORDER}/checkout/card"));
    let (status, body) = send_request(req, None, |cfg| configure_card(cfg, store, stripe)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: CardCheckoutResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.session_id, "cs_test_1");
    assert_eq!(response.url, "https://checkout.stripe.com/c/pay/cs_test_1");
}

fn session(id: &str, status: &str) -> CheckoutSession {
    CheckoutSession {
        id: id.to_string(),
        url: Some(format!("https://checkout.stripe.com/c/pay/{id}")),
        status: Some(status.to_string()),
        ..Default::default()
    }
}

/// A card order whose first checkout session `cs_test_1` was opened earlier.
fn store_with_open_session() -> MockStore {
    let mut store = MockStore::new();
    store.expect_fetch_order_detail().returning(|n| {
        let mut detail = sample_order_detail(n.as_str(), PaymentMethod::Card);
        detail.order.payment_status = PaymentStatus::Processing;
        detail.order.stripe_session_id = Some("cs_test_1".to_string());
        Ok(Some(detail))
    });
    store
}

#[actix_web::test]
async fn card_checkout_expires_previous_session() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_open_session();
    store.expect_fetch_order_by_number().returning(|n| {
        let mut order = sample_order(n.as_str(), PaymentMethod::Card);
        order.payment_status = PaymentStatus::Processing;
        order.stripe_session_id = Some("cs_test_1".to_string());
        Ok(Some(order))
    });
    store.expect_attach_stripe_session().withf(|_, s| s == "cs_test_2").times(1).returning(|n, s| {
        let mut order = sample_order(n.as_str(), PaymentMethod::Card);
        order.payment_status = PaymentStatus::Processing;
        order.stripe_session_id = Some(s.to_string());
        Ok(order)
    });
    let mut stripe = MockStripe::new();
    stripe.expect_retrieve_session().withf(|id| id == "cs_test_1").returning(|id| Ok(session(id, "open")));
    stripe.expect_expire_session().withf(|id| id == "cs_test_1").times(1).returning(|id| Ok(session(id, "expired")));
    stripe.expect_create_session().times(1).returning(|_| Ok(session("cs_test_2", "open")));
    let req = TestRequest::post().uri(&format!("/orders/{ORDER}/checkout/card"));
    let (status, body) = send_request(req, None, |cfg| configure_card(cfg, store, stripe)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: CardCheckoutResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.session_id, "cs_test_2");
}

#[actix_web::test]
async fn card_checkout_refuses_while_previous_session_settles() {
    let _ = env_logger::try_init().ok();
    let mut stripe = MockStripe::new();
    stripe.expect_retrieve_session().returning(|id| Ok(session(id, "complete")));
    // No expire or create expectations: neither may be called.
    let req = TestRequest::post().uri(&format!("/orders/{ORDER}/checkout/card"));
    let (status, body) = send_request(req, None, |cfg| configure_card(cfg, store_with_open_session(), stripe)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already completed"), "{body}");
}

#[actix_web::test]
async fn card_checkout_rejects_other_methods() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order_detail().returning(|n| Ok(Some(sample_order_detail(n.as_str(), PaymentMethod::Solana))));
    // No expectations on Stripe: a session must not be created.
    let req = TestRequest::post().uri(&format!("/orders/{ORDER}/checkout/card"));
    let (status, _) = send_request(req, None, |cfg| configure_card(cfg, store, MockStripe::new())).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn card_checkout_unknown_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order_detail().returning(|_| Ok(None));
    let req = TestRequest::post().uri("/orders/PP-000000-NOPE00/checkout/card");
    let (status, _) = send_request(req, None, |cfg| configure_card(cfg, store, MockStripe::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn etransfer_instructions() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order_by_number().returning(|n| Ok(Some(sample_order(n.as_str(), PaymentMethod::ETransfer))));
    let config = ETransferConfig { recipient_email: Some("payments@example.com".to_string()) };
    let req = TestRequest::get().uri(&format!("/orders/{ORDER}/checkout/etransfer"));
    let (status, body) = send_request(req, None, move |cfg| {
        cfg.app_data(web::Data::new(PaymentFlowApi::new(store, EventProducers::default())))
            .app_data(web::Data::new(config))
            .service(EtransferInstructionsRoute::<MockStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let instructions: ETransferInstructions = serde_json::from_str(&body).unwrap();
    assert_eq!(instructions.amount, "$105.00");
    assert_eq!(instructions.message, ORDER);
    assert_eq!(instructions.recipient_email.as_deref(), Some("payments@example.com"));
    assert_eq!(instructions.payment_status, PaymentStatus::Pending);
}
