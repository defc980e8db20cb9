use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use solana_tools::rpc::{ConfirmedTransaction, SignatureInfo};
use storefront_engine::{
    db_types::{OrderNumber, PaymentMethod, PaymentStatus, SolanaPayment, SolanaPaymentStatus},
    events::EventProducers,
    AccountApi,
    PaymentFlowApi,
};

use super::{
    helpers::{customer_token, get_issuer, sample_order, sample_order_detail, send_request},
    mocks::{MockChain, MockStore},
};
use crate::{
    data_objects::SolanaStatusResponse,
    middleware::JwtMiddlewareFactory,
    routes::{MyOrderRoute, MyOrdersRoute, SolanaStatusRoute},
};

const ORDER: &str = "PP-240612-K3Q9ZB";
const MERCHANT: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";
const REFERENCE: &str = "H3RgCHaoUko5kTKW32VC42WzjLmL2browFGfyvRFnfmT";
const SIGNATURE: &str = "2WhnyMUjkCcoFxkwmqcY6HTpboDh92xwDTqqssqHmqSNWhzm1LzWLXZ6MtvfL7gdXvoQUy3d3SLAd88Q2Bdhbixj";
const DUST_SIGNATURE: &str = "4kSm1pKuGZbzhcUQ7PbR8VxF3ZKcJX2uk9Hm2Dr8Xm6HwWqnoAyf9F2CKAdg8zxdTq7GLwWrvbVwFuMyT9oKjdHv";

//----------------------------------------------   Account  ----------------------------------------------------

fn configure_account(cfg: &mut ServiceConfig, store: MockStore) {
    cfg.app_data(web::Data::new(AccountApi::new(store))).service(
        web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(get_issuer()))
            .service(MyOrdersRoute::<MockStore>::new())
            .service(MyOrderRoute::<MockStore>::new()),
    );
}

#[actix_web::test]
async fn my_orders_include_guest_orders() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_orders_for_user().withf(|u| u == "user_2abc").returning(|_| {
        let mut order = sample_order(ORDER, PaymentMethod::Card);
        order.created_at = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        Ok(vec![order])
    });
    store.expect_fetch_orders_for_email().withf(|e| e == "ada@example.com").returning(|_| {
        let mut order = sample_order("PP-240612-GUEST1", PaymentMethod::ETransfer);
        order.id = 2;
        order.user_id = None;
        Ok(vec![order])
    });
    let req = TestRequest::get().uri("/api/account/orders");
    let (status, body) = send_request(req, Some(&customer_token()), |cfg| configure_account(cfg, store)).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Value = serde_json::from_str(&body).unwrap();
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    // Newest first
    assert_eq!(orders[0]["order_number"], "PP-240612-GUEST1");
    assert_eq!(orders[1]["order_number"], ORDER);
}

#[actix_web::test]
async fn my_orders_need_a_token() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/api/account/orders");
    let (status, _) = send_request(req, None, |cfg| configure_account(cfg, MockStore::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn someone_elses_order_is_not_found() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order_detail().returning(|n| {
        let mut detail = sample_order_detail(n.as_str(), PaymentMethod::Card);
        detail.order.user_id = Some("user_9xyz".to_string());
        detail.order.email = "someone@example.com".to_string();
        Ok(Some(detail))
    });
    let req = TestRequest::get().uri(&format!("/api/account/orders/{ORDER}"));
    let (status, _) = send_request(req, Some(&customer_token()), |cfg| configure_account(cfg, store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn my_order_detail() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order_detail().returning(|n| Ok(Some(sample_order_detail(n.as_str(), PaymentMethod::Card))));
    let req = TestRequest::get().uri(&format!("/api/account/orders/{ORDER}"));
    let (status, body) = send_request(req, Some(&customer_token()), |cfg| configure_account(cfg, store)).await;
    assert_eq!(status, StatusCode::OK);
    let detail: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(detail["items"][0]["product_name"], "BPC-157 5mg");
    assert_eq!(detail["shipping_address"]["city"], "Toronto");
}

//----------------------------------------------   Solana  ----------------------------------------------------

fn pending_payment(lamports: i64) -> SolanaPayment {
    let created_at = Utc.with_ymd_and_hms(2024, 6, 12, 14, 31, 0).unwrap();
    SolanaPayment {
        id: 4,
        order_number: OrderNumber::from(ORDER),
        reference: REFERENCE.to_string(),
        recipient: MERCHANT.to_string(),
        spl_token: None,
        amount_base_units: lamports,
        decimals: 9,
        status: SolanaPaymentStatus::Pending,
        signature: None,
        created_at,
        updated_at: created_at,
    }
}

fn sol_transfer() -> ConfirmedTransaction {
    let json = include_str!("../../../solana_tools/tests/fixtures/sol_transfer.json");
    let mut v: Value = serde_json::from_str(json).unwrap();
    serde_json::from_value(v["result"].take()).unwrap()
}

/// The same transfer with the merchant's balance untouched: it carries the reference but pays nothing.
fn dust_transfer() -> ConfirmedTransaction {
    let json = include_str!("../../../solana_tools/tests/fixtures/sol_transfer.json");
    let mut v: Value = serde_json::from_str(json).unwrap();
    let pre = v["result"]["meta"]["preBalances"].clone();
    v["result"]["meta"]["postBalances"] = pre;
    serde_json::from_value(v["result"].take()).unwrap()
}

fn dust_signature() -> SignatureInfo {
    SignatureInfo {
        signature: DUST_SIGNATURE.to_string(),
        slot: 272_009_400,
        block_time: Some(1_718_202_300),
        ..found_signature()
    }
}

fn found_signature() -> SignatureInfo {
    SignatureInfo {
        signature: SIGNATURE.to_string(),
        slot: 272_005_120,
        err: None,
        block_time: Some(1_718_200_580),
        confirmation_status: Some("confirmed".to_string()),
    }
}

/// A store holding one pending Solana request. Once the payment is confirmed, the order reads back as completed.
fn solana_store(lamports: i64) -> MockStore {
    let confirmed = Arc::new(AtomicBool::new(false));
    let mut store = MockStore::new();
    store.expect_fetch_solana_payment_by_order().returning(move |_| Ok(Some(pending_payment(lamports))));
    store.expect_fetch_solana_payment_by_reference().returning(move |_| Ok(Some(pending_payment(lamports))));
    let flag = Arc::clone(&confirmed);
    store.expect_fetch_order_by_number().returning(move |n| {
        let mut order = sample_order(n.as_str(), PaymentMethod::Solana);
        order.payment_status =
            if flag.load(Ordering::SeqCst) { PaymentStatus::Completed } else { PaymentStatus::Processing };
        Ok(Some(order))
    });
    store.expect_confirm_solana_payment().withf(|r, s| r == REFERENCE && s == SIGNATURE).returning(move |_, s| {
        confirmed.store(true, Ordering::SeqCst);
        let mut payment = pending_payment(lamports);
        payment.status = SolanaPaymentStatus::Confirmed;
        payment.signature = Some(s.to_string());
        Ok(payment)
    });
    store
}

async fn poll_status(store: MockStore, chain: MockChain) -> (StatusCode, String) {
    let req = TestRequest::get().uri(&format!("/orders/{ORDER}/checkout/solana/status"));
    send_request(req, None, move |cfg| {
        cfg.app_data(web::Data::new(PaymentFlowApi::new(store, EventProducers::default())))
            .app_data(web::Data::new(chain))
            .service(SolanaStatusRoute::<MockStore, MockChain>::new());
    })
    .await
}

#[actix_web::test]
async fn solana_payment_confirmed_on_chain() {
    let _ = env_logger::try_init().ok();
    let mut chain = MockChain::new();
    chain
        .expect_reference_signatures()
        .withf(|r| r.to_string() == REFERENCE)
        .returning(|_| Ok(vec![found_signature()]));
    chain.expect_transaction().withf(|s| s == SIGNATURE).returning(|_| Ok(Some(sol_transfer())));
    let (status, body) = poll_status(solana_store(850_000_000), chain).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: SolanaStatusResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.status, SolanaPaymentStatus::Confirmed);
    assert_eq!(response.payment_status, PaymentStatus::Completed);
    assert_eq!(response.signature.as_deref(), Some(SIGNATURE));
}

#[actix_web::test]
async fn solana_payment_is_found_behind_a_later_transaction() {
    let _ = env_logger::try_init().ok();
    let mut chain = MockChain::new();
    chain.expect_reference_signatures().returning(|_| Ok(vec![found_signature(), dust_signature()]));
    chain.expect_transaction().withf(|s| s == SIGNATURE).returning(|_| Ok(Some(sol_transfer())));
    chain.expect_transaction().withf(|s| s == DUST_SIGNATURE).returning(|_| Ok(Some(dust_transfer())));
    let (status, body) = poll_status(solana_store(850_000_000), chain).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: SolanaStatusResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.status, SolanaPaymentStatus::Confirmed);
    assert_eq!(response.signature.as_deref(), Some(SIGNATURE));
}

#[actix_web::test]
async fn non_paying_transactions_are_skipped() {
    let _ = env_logger::try_init().ok();
    let mut chain = MockChain::new();
    chain.expect_reference_signatures().returning(|_| Ok(vec![dust_signature(), found_signature()]));
    chain.expect_transaction().withf(|s| s == DUST_SIGNATURE).times(1).returning(|_| Ok(Some(dust_transfer())));
    chain.expect_transaction().withf(|s| s == SIGNATURE).times(1).returning(|_| Ok(Some(sol_transfer())));
    let (status, body) = poll_status(solana_store(850_000_000), chain).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: SolanaStatusResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.status, SolanaPaymentStatus::Confirmed);
    assert_eq!(response.payment_status, PaymentStatus::Completed);
    assert_eq!(response.signature.as_deref(), Some(SIGNATURE));
}

#[actix_web::test]
async fn solana_payment_not_yet_on_chain() {
    let _ = env_logger::try_init().ok();
    let mut chain = MockChain::new();
    chain.expect_reference_signatures().returning(|_| Ok(vec![]));
    let (status, body) = poll_status(solana_store(850_000_000), chain).await;
    assert_eq!(status, StatusCode::OK);
    let response: SolanaStatusResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.status, SolanaPaymentStatus::Pending);
    assert_eq!(response.payment_status, PaymentStatus::Processing);
    assert_eq!(response.detail, None);
}

#[actix_web::test]
async fn solana_underpayment_stays_pending() {
    let _ = env_logger::try_init().ok();
    let mut chain = MockChain::new();
    chain.expect_reference_signatures().returning(|_| Ok(vec![found_signature()]));
    chain.expect_transaction().returning(|_| Ok(Some(sol_transfer())));
    let (status, body) = poll_status(solana_store(900_000_000), chain).await;
    assert_eq!(status, StatusCode::OK);
    let response: SolanaStatusResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.status, SolanaPaymentStatus::Pending);
    assert_eq!(response.signature, None);
    assert!(response.detail.is_some());
}

#[actix_web::test]
async fn solana_status_without_request() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_solana_payment_by_order().returning(|_| Ok(None));
    let (status, _) = poll_status(store, MockChain::new()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
