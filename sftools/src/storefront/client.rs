use anyhow::{anyhow, Result};
use log::{debug, info};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Response,
    StatusCode,
};
use serde::de::DeserializeOwned;
use storefront_engine::db_types::{Order, OrderNumber, ShippingStatus};
use storefront_server::data_objects::{
    AccessTokenResponse,
    AdminLoginRequest,
    OrderSearchParams,
    ShippingStatusUpdate,
};
use url::Url;

pub struct StorefrontClient {
    client: Client,
    server: Url,
    access_token: String,
}

impl StorefrontClient {
    pub fn new(server: &str) -> Result<Self> {
        let server = Url::parse(server).map_err(|e| anyhow!("'{server}' is not a valid server URL. {e}"))?;
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client =
            Client::builder().user_agent("Storefront Operator Tools").default_headers(headers).build()?;
        Ok(StorefrontClient { client, server, access_token: String::new() })
    }

    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.access_token = token.into();
        self
    }

    pub fn server(&self) -> &str {
        self.server.as_str()
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        self.server.join(path).map_err(|e| anyhow!("Failed to join URL: {}", e))
    }

    pub async fn health(&self) -> Result<String> {
        let url = self.url("/health")?;
        let res = self.client.get(url).send().await?;
        Ok(res.text().await?)
    }

    /// Exchanges the admin credentials for a bearer token, and keeps the token for later calls.
    pub async fn admin_login(&mut self, username: &str, password: &str) -> Result<AccessTokenResponse> {
        let url = self.url("/auth/admin")?;
        let body = AdminLoginRequest { username: username.to_string(), password: password.to_string() };
        let res = self.client.post(url).json(&body).send().await?;
        match res.status() {
            StatusCode::OK => {
                let token: AccessTokenResponse = res.json().await?;
                info!("Logged in to {} as {username}", self.server);
                self.access_token = token.access_token.clone();
                Ok(token)
            },
            StatusCode::UNAUTHORIZED => Err(anyhow!("The username or password is incorrect")),
            StatusCode::FORBIDDEN => Err(anyhow!("Admin login is disabled on this server")),
            _ => Err(anyhow!("Admin login failed. {}", res.text().await?)),
        }
    }

    pub async fn search_orders(&self, params: &OrderSearchParams) -> Result<Vec<Order>> {
        let url = self.url("/api/admin/orders")?;
        let res = self.client.get(url).bearer_auth(&self.access_token).query(params).send().await?;
        read_json(res, "searching orders").await
    }

    pub async fn update_shipping(
        &self,
        order_number: &OrderNumber,
        status: ShippingStatus,
        tracking_number: Option<String>,
    ) -> Result<Order> {
        let url = self.url(&format!("/api/admin/orders/{order_number}/shipping"))?;
        let body = ShippingStatusUpdate { status, tracking_number };
        let res = self.client.patch(url).bearer_auth(&self.access_token).json(&body).send().await?;
        read_json(res, "updating the shipping status").await
    }
}

async fn read_json<T: DeserializeOwned>(res: Response, action: &str) -> Result<T> {
    let status = res.status();
    debug!("Server replied {status} while {action}");
    match status {
        s if s.is_success() => Ok(res.json().await?),
        StatusCode::UNAUTHORIZED => Err(anyhow!("Not logged in, or the token has expired. Run `sftools admin-token`")),
        StatusCode::FORBIDDEN => Err(anyhow!("This token does not carry the admin role")),
        _ => {
            let msg = res.text().await?;
            Err(anyhow!("Error {action}: {msg}"))
        },
    }
}
