use sqlx::SqliteConnection;

use crate::db_types::{
    ETransferPayment,
    NewETransferPayment,
    OrderNumber,
    SolanaPayment,
    SolanaPaymentStatus,
    SolanaQuote,
};

pub async fn insert_solana_payment(
    order_number: &OrderNumber,
    quote: SolanaQuote,
    conn: &mut SqliteConnection,
) -> Result<SolanaPayment, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO solana_payments (order_number, reference, recipient, spl_token, amount_base_units, decimals)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order_number.as_str())
    .bind(quote.reference)
    .bind(quote.recipient)
    .bind(quote.spl_token)
    .bind(quote.amount_base_units)
    .bind(quote.decimals)
    .fetch_one(conn)
    .await
}

pub async fn fetch_solana_payment_by_order(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<SolanaPayment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM solana_payments WHERE order_number = $1 ORDER BY id DESC LIMIT 1")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await
}

pub async fn fetch_solana_payment_by_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<SolanaPayment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM solana_payments WHERE reference = $1").bind(reference).fetch_optional(conn).await
}

pub async fn update_solana_payment(
    reference: &str,
    status: SolanaPaymentStatus,
    signature: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<SolanaPayment>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE solana_payments SET
                status = $1,
                signature = COALESCE($2, signature),
                updated_at = CURRENT_TIMESTAMP
            WHERE reference = $3
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(signature)
    .bind(reference)
    .fetch_optional(conn)
    .await
}

pub async fn insert_etransfer_payment(
    payment: NewETransferPayment,
    conn: &mut SqliteConnection,
) -> Result<ETransferPayment, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO etransfer_payments (order_number, sender_name, reference, amount, notes, recorded_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(payment.order_number.as_str())
    .bind(payment.sender_name)
    .bind(payment.reference)
    .bind(payment.amount)
    .bind(payment.notes)
    .bind(payment.recorded_by)
    .fetch_one(conn)
    .await
}

pub async fn fetch_etransfer_payments(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Vec<ETransferPayment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM etransfer_payments WHERE order_number = $1 ORDER BY id ASC")
        .bind(order_number.as_str())
        .fetch_all(conn)
        .await
}
