//! Exchange rates price the SOL payment rail. A rate is the USD value of one whole unit of the currency, in cents.

use std::fmt::Debug;

use log::*;

use crate::{
    db_types::ExchangeRate,
    traits::{ExchangeRateError, ExchangeRates},
};

pub struct ExchangeRateApi<B> {
    db: B,
}

impl<B> Debug for ExchangeRateApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangeRateApi")
    }
}

impl<B> ExchangeRateApi<B>
where B: ExchangeRates
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn fetch_last_rate(&self, currency: &str) -> Result<ExchangeRate, ExchangeRateError> {
        self.db.fetch_last_rate(&currency.to_ascii_uppercase()).await
    }

    pub async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError> {
        if !rate.rate.is_positive() {
            let msg = format!("{} is not a valid price for 1 {}", rate.rate, rate.base_currency);
            return Err(ExchangeRateError::InvalidRate(msg));
        }
        if rate.base_currency.trim().is_empty() {
            return Err(ExchangeRateError::InvalidRate("A currency code is required".into()));
        }
        self.db.set_exchange_rate(rate).await?;
        info!("💱️ 1 {} is now worth {}", rate.base_currency, rate.rate);
        Ok(())
    }
}
