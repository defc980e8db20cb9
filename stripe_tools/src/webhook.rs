//! Stripe webhook verification.
//!
//! Stripe signs every webhook with the endpoint's signing secret and sends the result in the `Stripe-Signature` header:
//!
//! ```text
//! Stripe-Signature: t=1718000000,v1=5257a869...,v1=...,v0=...
//! ```
//!
//! `t` is the Unix timestamp of the delivery and each `v1` is a hex-encoded HMAC-SHA256 of `"{t}.{payload}"`. There
//! can be several `v1` entries while a secret is being rolled. `v0` entries are ignored.
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::{CheckoutSession, WebhookError};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";
/// Deliveries older (or newer) than this many seconds are rejected.
pub const DEFAULT_TOLERANCE: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for pair in header.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| WebhookError::MalformedHeader(format!("'{pair}' is not a key=value pair")))?;
            match key {
                "t" => {
                    let t = value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::MalformedHeader(format!("'{value}' is not a timestamp")))?;
                    timestamp = Some(t);
                },
                "v1" => signatures.push(value.to_string()),
                _ => trace!("💳️ Ignoring signature scheme '{key}'"),
            }
        }
        let timestamp = timestamp.ok_or_else(|| WebhookError::MalformedHeader("No timestamp".into()))?;
        if signatures.is_empty() {
            return Err(WebhookError::NoSignatures);
        }
        Ok(Self { timestamp, signatures })
    }
}

fn mac_for(payload: &[u8], secret: &str, timestamp: i64) -> Result<HmacSha256, WebhookError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::MissingSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Produces a `Stripe-Signature` header value for the payload, as Stripe itself would. Useful for local testing.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, WebhookError> {
    let signature = hex::encode(mac_for(payload, secret, timestamp)?.finalize().into_bytes());
    Ok(format!("t={timestamp},v1={signature}"))
}

/// Checks the `Stripe-Signature` header against the raw request body.
///
/// The payload must be the exact bytes Stripe sent. Each `v1` signature is compared in constant time, and the
/// timestamp must lie within `tolerance` seconds of `now`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: i64,
    now: DateTime<Utc>,
) -> Result<(), WebhookError> {
    if secret.is_empty() {
        return Err(WebhookError::MissingSecret);
    }
    let header = SignatureHeader::parse(header)?;
    let now = now.timestamp();
    if (now - header.timestamp).abs() > tolerance {
        return Err(WebhookError::TimestampOutOfRange { timestamp: header.timestamp, now, tolerance });
    }
    let mac = mac_for(payload, secret, header.timestamp)?;
    let matched = header
        .signatures
        .iter()
        .filter_map(|s| hex::decode(s).ok())
        .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());
    if matched {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

/// Verifies the signature, then parses the payload as a Stripe event.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: i64,
    now: DateTime<Utc>,
) -> Result<StripeEvent, WebhookError> {
    verify_signature(payload, header, secret, tolerance, now)?;
    serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventKind {
    CheckoutCompleted,
    CheckoutAsyncSucceeded,
    CheckoutAsyncFailed,
    CheckoutExpired,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    pub data: StripeEventData,
}

impl StripeEvent {
    pub fn kind(&self) -> StripeEventKind {
        match self.event_type.as_str() {
            "checkout.session.completed" => StripeEventKind::CheckoutCompleted,
            "checkout.session.async_payment_succeeded" => StripeEventKind::CheckoutAsyncSucceeded,
            "checkout.session.async_payment_failed" => StripeEventKind::CheckoutAsyncFailed,
            "checkout.session.expired" => StripeEventKind::CheckoutExpired,
            _ => StripeEventKind::Other,
        }
    }

    /// The checkout session carried by a `checkout.session.*` event.
    pub fn checkout_session(&self) -> Result<CheckoutSession, WebhookError> {
        if self.kind() == StripeEventKind::Other {
            return Err(WebhookError::InvalidPayload(format!("{} is not a checkout session event", self.event_type)));
        }
        serde_json::from_value(self.data.object.clone()).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }
}
