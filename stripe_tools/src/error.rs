use thiserror::Error;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Stripe request failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Invalid checkout session request. {0}")]
    InvalidSession(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("Malformed Stripe-Signature header. {0}")]
    MalformedHeader(String),
    #[error("The Stripe-Signature header carries no v1 signatures")]
    NoSignatures,
    #[error("Webhook timestamp {timestamp} is more than {tolerance}s away from {now}")]
    TimestampOutOfRange { timestamp: i64, now: i64, tolerance: i64 },
    #[error("No v1 signature matches the payload")]
    SignatureMismatch,
    #[error("The webhook secret is not configured")]
    MissingSecret,
    #[error("Could not read the webhook payload. {0}")]
    InvalidPayload(String),
}

impl WebhookError {
    /// True when the header could not be parsed at all, as opposed to parsing but failing verification.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedHeader(_) | Self::NoSignatures)
    }
}
