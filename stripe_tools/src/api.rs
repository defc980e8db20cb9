use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{config::StripeConfig, CheckoutSession, NewCheckoutSession, StripeApiError};

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let mut val = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_base)
    }

    /// Sends a form-encoded request. Stripe's API does not accept JSON bodies.
    pub async fn form_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("💳️ Sending Stripe request: {method} {url}");
        let mut req = self.client.request(method, url);
        if !form.is_empty() {
            req = req.form(form);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ Stripe request successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message })
        }
    }

    pub async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CheckoutSession, StripeApiError> {
        let form = session.to_form()?;
        debug!("💳️ Creating checkout session for order {}", session.order_number);
        let result = self.form_query::<CheckoutSession>(Method::POST, "/checkout/sessions", &form).await?;
        info!("💳️ Checkout session {} created for order {}", result.id, session.order_number);
        Ok(result)
    }

    pub async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, StripeApiError> {
        let path = format!("/checkout/sessions/{id}");
        self.form_query::<CheckoutSession>(Method::GET, &path, &[]).await
    }

    /// Expires an open session so that it can no longer be paid.
    pub async fn expire_checkout_session(&self, id: &str) -> Result<CheckoutSession, StripeApiError> {
        let path = format!("/checkout/sessions/{id}/expire");
        let result = self.form_query::<CheckoutSession>(Method::POST, &path, &[]).await?;
        info!("💳️ Checkout session {id} expired");
        Ok(result)
    }
}
