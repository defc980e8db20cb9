use sqlx::SqliteConnection;

use crate::{db_types::ExchangeRate, traits::ExchangeRateError};

pub async fn fetch_last_rate(currency: &str, conn: &mut SqliteConnection) -> Result<ExchangeRate, ExchangeRateError> {
    let currency = currency.to_ascii_uppercase();
    let result: Option<ExchangeRate> = sqlx::query_as(
        r#"
            SELECT base_currency, rate, updated_at FROM exchange_rates
            WHERE base_currency = $1
            ORDER BY updated_at DESC, id DESC
            LIMIT 1
        "#,
    )
    .bind(currency.as_str())
    .fetch_optional(conn)
    .await?;
    result.ok_or(ExchangeRateError::RateDoesNotExist(currency))
}

pub async fn set_exchange_rate(rate: &ExchangeRate, conn: &mut SqliteConnection) -> Result<(), ExchangeRateError> {
    if !rate.rate.is_positive() {
        return Err(ExchangeRateError::InvalidRate(format!("{} for {}", rate.rate, rate.base_currency)));
    }
    sqlx::query("INSERT INTO exchange_rates (base_currency, rate) VALUES ($1, $2)")
        .bind(rate.base_currency.to_ascii_uppercase())
        .bind(rate.rate)
        .execute(conn)
        .await?;
    Ok(())
}
