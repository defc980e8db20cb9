use thiserror::Error;

use crate::db_types::ExchangeRate;

#[derive(Debug, Clone, Error)]
pub enum ExchangeRateError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The requested exchange rate does not exist: {0}")]
    RateDoesNotExist(String),
    #[error("Exchange rates must be positive. {0}")]
    InvalidRate(String),
}

impl From<sqlx::Error> for ExchangeRateError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait ExchangeRates {
    /// Fetch the most recent rate for the given currency (e.g. `SOL`). If no rate has been stored, the error
    /// [`ExchangeRateError::RateDoesNotExist`] is returned.
    async fn fetch_last_rate(&self, currency: &str) -> Result<ExchangeRate, ExchangeRateError>;
    /// Append a new rate. Older rates are kept as history.
    async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError>;
}
