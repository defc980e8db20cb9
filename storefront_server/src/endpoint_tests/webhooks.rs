use actix_web::{http::StatusCode, test::TestRequest, web};
use chrono::Utc;
use serde_json::json;
use sf_common::Secret;
use storefront_engine::{
    db_types::{PaymentMethod, PaymentStatus},
    events::EventProducers,
    PaymentFlowApi,
};
use stripe_tools::webhook::{sign_payload, SIGNATURE_HEADER};

use super::{helpers::sample_order, helpers::send_request, mocks::MockStore};
use crate::{config::WebhookConfig, data_objects::JsonResponse, routes::StripeWebhookRoute};

const SECRET: &str = "whsec_endpoint_test";
const ORDER: &str = "PP-240612-K3Q9ZB";

fn session_event(event_type: &str, payment_status: &str) -> Vec<u8> {
    json!({
        "id": "evt_1",
        "type": event_type,
        "created": Utc::now().timestamp(),
        "data": {"object": {
            "id": "cs_test_1",
            "object": "checkout.session",
            "payment_status": payment_status,
            "payment_intent": "pi_1",
            "metadata": {"order_number": ORDER}
        }}
    })
    .to_string()
    .into_bytes()
}

fn signed_request(payload: Vec<u8>) -> TestRequest {
    let header = sign_payload(&payload, SECRET, Utc::now().timestamp()).unwrap();
    TestRequest::post().uri("/stripe/webhook").insert_header((SIGNATURE_HEADER, header)).set_payload(payload)
}

fn configure(cfg: &mut web::ServiceConfig, store: MockStore) {
    let webhook = WebhookConfig { secret: Secret::new(SECRET.to_string()), tolerance: 300 };
    cfg.app_data(web::Data::new(webhook))
        .app_data(web::Data::new(PaymentFlowApi::new(store, EventProducers::default())))
        .service(StripeWebhookRoute::<MockStore>::new());
}

fn awaiting_card_payment() -> MockStore {
    let mut store = MockStore::new();
    store.expect_fetch_order_by_stripe_session().returning(|session| {
        let mut order = sample_order(ORDER, PaymentMethod::Card);
        order.payment_status = PaymentStatus::Processing;
        order.stripe_session_id = Some(session.to_string());
        Ok(Some(order))
    });
    store
}

#[actix_web::test]
async fn paid_session_completes_order() {
    let _ = env_logger::try_init().ok();
    let mut store = awaiting_card_payment();
    store
        .expect_attach_payment_reference()
        .withf(|n, r, s| n.as_str() == ORDER && r == "pi_1" && *s == PaymentStatus::Completed)
        .times(1)
        .returning(|n, r, s| {
            let mut order = sample_order(n.as_str(), PaymentMethod::Card);
            order.payment_status = s;
            order.payment_reference = Some(r.to_string());
            Ok(order)
        });
    let req = signed_request(session_event("checkout.session.completed", "paid"));
    let (status, body) = send_request(req, None, |cfg| configure(cfg, store)).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success, "{}", response.message);
    assert!(response.message.contains("completed"), "{}", response.message);
}

#[actix_web::test]
async fn expired_session_cancels_payment() {
    let _ = env_logger::try_init().ok();
    let mut store = awaiting_card_payment();
    store
        .expect_attach_payment_reference()
        .withf(|_, _, s| *s == PaymentStatus::Cancelled)
        .times(1)
        .returning(|n, _, s| {
            let mut order = sample_order(n.as_str(), PaymentMethod::Card);
            order.payment_status = s;
            Ok(order)
        });
    let req = signed_request(session_event("checkout.session.expired", "unpaid"));
    let (status, body) = send_request(req, None, |cfg| configure(cfg, store)).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success);
}

#[actix_web::test]
async fn completed_order_is_not_downgraded() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order_by_stripe_session().returning(|_| {
        let mut order = sample_order(ORDER, PaymentMethod::Card);
        order.payment_status = PaymentStatus::Completed;
        Ok(Some(order))
    });
    // No write expectations. Any status write panics the mock.
    let req = signed_request(session_event("checkout.session.expired", "unpaid"));
    let (status, _) = send_request(req, None, |cfg| configure(cfg, store)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn unrelated_events_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let payload = json!({"id": "evt_2", "type": "customer.created", "data": {"object": {"id": "cus_1"}}});
    let req = signed_request(payload.to_string().into_bytes());
    let (status, body) = send_request(req, None, |cfg| configure(cfg, MockStore::new())).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success);
    assert!(response.message.contains("ignored"));
}

#[actix_web::test]
async fn bad_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let payload = session_event("checkout.session.completed", "paid");
    let header = sign_payload(&payload, "whsec_someone_else", Utc::now().timestamp()).unwrap();
    let req =
        TestRequest::post().uri("/stripe/webhook").insert_header((SIGNATURE_HEADER, header)).set_payload(payload);
    let (status, _) = send_request(req, None, |cfg| configure(cfg, MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let req =
        TestRequest::post().uri("/stripe/webhook").set_payload(session_event("checkout.session.completed", "paid"));
    let (status, body) = send_request(req, None, |cfg| configure(cfg, MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains(SIGNATURE_HEADER), "{body}");
}

#[actix_web::test]
async fn stale_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let payload = session_event("checkout.session.completed", "paid");
    let header = sign_payload(&payload, SECRET, Utc::now().timestamp() - 3600).unwrap();
    let req =
        TestRequest::post().uri("/stripe/webhook").insert_header((SIGNATURE_HEADER, header)).set_payload(payload);
    let (status, _) = send_request(req, None, |cfg| configure(cfg, MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
