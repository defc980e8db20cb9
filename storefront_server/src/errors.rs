use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use solana_tools::SolanaError;
use storefront_engine::{
    CatalogError,
    CheckoutError,
    ExchangeRateError,
    OrderFlowError,
    SubscriptionError,
};
use stripe_tools::{StripeApiError, WebhookError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The request conflicts with the current state of the record. {0}")]
    Conflict(String),
    #[error("Invalid webhook. {0}")]
    InvalidWebhook(String),
    #[error("The payment provider returned an error. {0}")]
    PaymentProviderError(String),
    #[error("This service is temporarily unavailable. {0}")]
    Unavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidWebhook(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::AdminLoginDisabled => StatusCode::FORBIDDEN,
                AuthError::TokenCreation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentProviderError(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("Admin login has not been configured on this server.")]
    AdminLoginDisabled,
    #[error("Could not create an access token. {0}")]
    TokenCreation(String),
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            OrderFlowError::OrderNotFound(_) |
            OrderFlowError::StripeSessionNotFound(_) |
            OrderFlowError::SolanaPaymentNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::PaymentMethodMismatch { .. } |
            OrderFlowError::AlreadyPaid(_) |
            OrderFlowError::InvalidShippingTransition { .. } => Self::Conflict(e.to_string()),
            OrderFlowError::TrackingNumberRequired => Self::ValidationError(e.to_string()),
            OrderFlowError::PricingError(_) => Self::BackendError(e.to_string()),
            OrderFlowError::ExchangeRate(e) => e.into(),
        }
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::EmptyCart |
            CheckoutError::Validation(_) |
            CheckoutError::UnknownProduct(_) |
            CheckoutError::InvalidQuantity { .. } => Self::ValidationError(e.to_string()),
            CheckoutError::ProductUnavailable(_) | CheckoutError::InsufficientStock { .. } => {
                Self::Conflict(e.to_string())
            },
            CheckoutError::Catalog(e) => e.into(),
            CheckoutError::Order(e) => e.into(),
        }
    }
}

impl From<CatalogError> for ServerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            CatalogError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            CatalogError::InvalidProduct(_) | CatalogError::EmptyUpdate => Self::ValidationError(e.to_string()),
        }
    }
}

impl From<SubscriptionError> for ServerError {
    fn from(e: SubscriptionError) -> Self {
        match e {
            SubscriptionError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            SubscriptionError::PlanNotFound(_) |
            SubscriptionError::SubscriptionNotFound(_) |
            SubscriptionError::DeliveryNotFound(_) => Self::NoRecordFound(e.to_string()),
            SubscriptionError::PlanInactive(_) |
            SubscriptionError::InvalidTransition { .. } |
            SubscriptionError::NotDeliverable(_) => Self::Conflict(e.to_string()),
            SubscriptionError::ProductCountMismatch { .. } | SubscriptionError::Validation(_) => {
                Self::ValidationError(e.to_string())
            },
            SubscriptionError::NotOwner(_) => Self::InsufficientPermissions(e.to_string()),
            SubscriptionError::Catalog(e) => e.into(),
        }
    }
}

impl From<ExchangeRateError> for ServerError {
    fn from(e: ExchangeRateError) -> Self {
        match e {
            ExchangeRateError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            ExchangeRateError::RateDoesNotExist(_) => Self::Unavailable(e.to_string()),
            ExchangeRateError::InvalidRate(_) => Self::ValidationError(e.to_string()),
        }
    }
}

impl From<StripeApiError> for ServerError {
    fn from(e: StripeApiError) -> Self {
        match e {
            StripeApiError::Initialization(_) => Self::ConfigurationError(e.to_string()),
            _ => {
                error!("💳️ Stripe request failed. {e}");
                Self::PaymentProviderError(e.to_string())
            },
        }
    }
}

impl From<WebhookError> for ServerError {
    fn from(e: WebhookError) -> Self {
        Self::InvalidWebhook(e.to_string())
    }
}

impl From<SolanaError> for ServerError {
    fn from(e: SolanaError) -> Self {
        match e {
            SolanaError::InvalidPubkey(_) | SolanaError::InvalidAmount(_) | SolanaError::InvalidUrl(_) => {
                Self::BackendError(e.to_string())
            },
            SolanaError::QrCode(_) => Self::BackendError(e.to_string()),
            SolanaError::TransactionNotFound(_) => Self::NoRecordFound(e.to_string()),
            SolanaError::Validation(_) => Self::Conflict(e.to_string()),
            SolanaError::Transport(_) | SolanaError::Json(_) | SolanaError::Rpc { .. } => {
                error!("◎ Solana RPC request failed. {e}");
                Self::PaymentProviderError(e.to_string())
            },
        }
    }
}
