use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolanaError {
    #[error("Invalid public key: {0}")]
    InvalidPubkey(String),
    #[error("Invalid token amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid transfer request URL: {0}")]
    InvalidUrl(String),
    #[error("Could not reach the Solana RPC node: {0}")]
    Transport(String),
    #[error("Could not deserialize RPC response: {0}")]
    Json(String),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Could not render QR code: {0}")]
    QrCode(String),
    #[error("Transaction {0} was not found")]
    TransactionNotFound(String),
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

/// Reasons a transaction does not satisfy a transfer request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The transaction has no status metadata")]
    MissingMeta,
    #[error("The transaction failed on-chain: {0}")]
    TransactionFailed(String),
    #[error("The transfer request has no amount to check against")]
    MissingAmount,
    #[error("Reference {0} is not part of the transaction")]
    ReferenceMissing(String),
    #[error("The recipient {0} is not part of the transaction")]
    RecipientNotFound(String),
    #[error("The recipient received {actual} base units, but {expected} were requested")]
    AmountTooLow { expected: u64, actual: i128 },
}
