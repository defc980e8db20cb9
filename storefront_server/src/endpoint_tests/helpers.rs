use std::sync::Arc;

use actix_web::{
    body,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{Duration, TimeZone, Utc};
use log::debug;
use sf_common::{Cents, Secret};
use storefront_engine::db_types::{
    Order,
    OrderDetail,
    OrderItem,
    OrderNumber,
    PaymentMethod,
    PaymentStatus,
    ShippingAddress,
    ShippingStatus,
};

use crate::{
    auth::{AdminCredentials, JwtClaims, TokenIssuer},
    config::{AuthConfig, ServerOptions},
};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

// A throwaway secret for test tokens. DO NOT re-use it anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: Secret::new("endpoint-test-secret-with-enough-bytes-for-hs256".to_string()),
        admin_username: ADMIN_USERNAME.to_string(),
        admin_password: Secret::new(ADMIN_PASSWORD.to_string()),
        token_lifetime: Duration::hours(1),
    }
}

pub fn get_issuer() -> Arc<TokenIssuer> {
    Arc::new(TokenIssuer::new(&get_auth_config()))
}

pub fn get_options() -> ServerOptions {
    ServerOptions {
        use_x_forwarded_for: false,
        use_forwarded: false,
        storefront_url: "https://shop.example.com".to_string(),
    }
}

pub fn issue_token(claims: JwtClaims) -> String {
    get_issuer().issue_token(claims).expect("Failed to sign token")
}

pub fn customer_token() -> String {
    issue_token(JwtClaims::customer("user_2abc", Some("ada@example.com".to_string())))
}

pub fn admin_token() -> String {
    issue_token(JwtClaims::admin(ADMIN_USERNAME))
}

/// Sends `req` to an app holding the shared auth state plus whatever `configure` registers, and returns the status
/// and body. Errors raised by middleware are rendered the same way the server would render them.
pub async fn send_request<F>(req: TestRequest, token: Option<&str>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let req = match token {
        Some(token) => req.insert_header(("Authorization", format!("Bearer {token}"))),
        None => req,
    };
    let app = App::new()
        .app_data(web::Data::from(get_issuer()))
        .app_data(web::Data::new(AdminCredentials::new(&get_auth_config())))
        .app_data(web::Data::new(get_options()))
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = body::to_bytes(res.into_body()).await.map(|b| b.to_vec()).unwrap_or_default();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub fn sample_order(number: &str, method: PaymentMethod) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 6, 12, 14, 30, 0).unwrap();
    Order {
        id: 1,
        order_number: OrderNumber::from(number),
        user_id: Some("user_2abc".to_string()),
        email: "ada@example.com".to_string(),
        subtotal: Cents::from(9000),
        shipping_cost: Cents::from(1500),
        total: Cents::from(10_500),
        payment_method: method,
        payment_status: PaymentStatus::Pending,
        shipping_status: ShippingStatus::Pending,
        payment_reference: None,
        stripe_session_id: None,
        tracking_number: None,
        notes: None,
        created_at,
        updated_at: created_at,
    }
}

pub fn sample_order_detail(number: &str, method: PaymentMethod) -> OrderDetail {
    OrderDetail {
        order: sample_order(number, method),
        items: vec![OrderItem {
            id: 1,
            order_id: 1,
            product_id: 7,
            product_name: "BPC-157 5mg".to_string(),
            unit_price: Cents::from(4500),
            quantity: 2,
        }],
        shipping_address: ShippingAddress {
            id: 1,
            order_id: 1,
            full_name: "Ada Lovelace".to_string(),
            line1: "12 St Clair Ave".to_string(),
            line2: None,
            city: "Toronto".to_string(),
            region: "ON".to_string(),
            postal_code: "M4V 1K6".to_string(),
            country: "CA".to_string(),
            phone: None,
        },
    }
}
