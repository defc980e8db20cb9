use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::json;
use sf_common::Secret;
use storefront_engine::{
    db_types::PaymentMethod,
    events::EventProducers,
    PaymentFlowApi,
};

use super::{
    helpers::{admin_token, customer_token, get_auth_config, get_issuer, sample_order, send_request, ADMIN_PASSWORD},
    mocks::MockStore,
};
use crate::{
    auth::AdminCredentials,
    config::AuthConfig,
    data_objects::AccessTokenResponse,
    middleware::JwtMiddlewareFactory,
    routes::{admin_login, health, SearchOrdersRoute},
};

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/health");
    let (status, body) = send_request(req, None, |cfg| {
        cfg.service(health);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn admin_login_issues_admin_token() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/auth/admin").set_json(json!({"username": "admin", "password": ADMIN_PASSWORD}));
    let (status, body) = send_request(req, None, |cfg| {
        cfg.service(admin_login);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let response: AccessTokenResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.token_type, "Bearer");
    assert_eq!(response.expires_in, 3600);
    let claims = get_issuer().validate_token(&response.access_token).unwrap();
    assert_eq!(claims.sub, "admin");
    assert!(claims.is_admin());
}

#[actix_web::test]
async fn admin_login_wrong_password() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/auth/admin").set_json(json!({"username": "admin", "password": "hunter2"}));
    let (status, body) = send_request(req, None, |cfg| {
        cfg.service(admin_login);
    })
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!body.contains("access_token"));
}

#[actix_web::test]
async fn admin_login_disabled_without_password() {
    let _ = env_logger::try_init().ok();
    let config = AuthConfig { admin_password: Secret::default(), ..get_auth_config() };
    let req = TestRequest::post().uri("/auth/admin").set_json(json!({"username": "admin", "password": ""}));
    let (status, _) = send_request(req, None, move |cfg| {
        cfg.app_data(web::Data::new(AdminCredentials::new(&config))).service(admin_login);
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_route_without_token() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/api/admin/orders");
    let (status, _) = send_request(req, None, |cfg| configure_admin(cfg, MockStore::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_route_with_tampered_token() {
    let _ = env_logger::try_init().ok();
    let mut token = admin_token();
    token.replace_range(token.len() - 10..token.len() - 5, "AAAAA");
    let req = TestRequest::get().uri("/api/admin/orders");
    let (status, _) = send_request(req, Some(&token), |cfg| configure_admin(cfg, MockStore::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_route_as_customer() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/api/admin/orders");
    let (status, _) = send_request(req, Some(&customer_token()), |cfg| configure_admin(cfg, MockStore::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_route_as_admin() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_search_orders()
        .withf(|q| q.email.as_deref() == Some("ada@example.com"))
        .returning(|_| Ok(vec![sample_order("PP-240612-K3Q9ZB", PaymentMethod::Card)]));
    let req = TestRequest::get().uri("/api/admin/orders?email=ada@example.com");
    let (status, body) = send_request(req, Some(&admin_token()), |cfg| configure_admin(cfg, store)).await;
    assert_eq!(status, StatusCode::OK);
    let orders: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(orders[0]["order_number"], "PP-240612-K3Q9ZB");
    assert_eq!(orders[0]["payment_method"], "card");
}

fn configure_admin(cfg: &mut ServiceConfig, store: MockStore) {
    let api = PaymentFlowApi::new(store, EventProducers::default());
    cfg.app_data(web::Data::new(api)).service(
        web::scope("/api").wrap(JwtMiddlewareFactory::new(get_issuer())).service(SearchOrdersRoute::<MockStore>::new()),
    );
}
