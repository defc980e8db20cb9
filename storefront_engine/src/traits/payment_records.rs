use crate::{
    db_types::{ETransferPayment, NewETransferPayment, OrderNumber, SolanaPayment, SolanaQuote},
    traits::OrderFlowError,
};

/// Append-only records of payments observed on the Solana and e-transfer rails.
#[allow(async_fn_in_trait)]
pub trait PaymentRecords {
    /// Stores a pending Solana Pay request for the order.
    async fn insert_solana_payment(
        &self,
        order_number: &OrderNumber,
        quote: SolanaQuote,
    ) -> Result<SolanaPayment, OrderFlowError>;

    /// The most recent Solana Pay request for the order, if any.
    async fn fetch_solana_payment_by_order(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<SolanaPayment>, OrderFlowError>;

    async fn fetch_solana_payment_by_reference(&self, reference: &str)
        -> Result<Option<SolanaPayment>, OrderFlowError>;

    /// Marks the request identified by `reference` as confirmed by the transaction `signature`, and marks the linked
    /// order as completed with the signature as its payment reference. Both writes happen in one transaction.
    async fn confirm_solana_payment(
        &self,
        reference: &str,
        signature: &str,
    ) -> Result<SolanaPayment, OrderFlowError>;

    async fn insert_etransfer_payment(&self, payment: NewETransferPayment) -> Result<ETransferPayment, OrderFlowError>;

    async fn fetch_etransfer_payments_for_order(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Vec<ETransferPayment>, OrderFlowError>;
}
