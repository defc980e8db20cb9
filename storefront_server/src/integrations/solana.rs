use log::*;
use solana_tools::{
    rpc::{ConfirmedTransaction, SignatureInfo},
    validate_transfer,
    Pubkey,
    SolanaError,
    SolanaRpcClient,
    TokenAmount,
    TransferRequest,
};
use storefront_engine::{
    db_types::{OrderNumber, PaymentStatus, SolanaPayment, SolanaPaymentStatus},
    traits::{ExchangeRates, OrderFlowError, OrderManagement, PaymentRecords},
    PaymentFlowApi,
};

use crate::{data_objects::SolanaStatusResponse, errors::ServerError};

/// Read access to the chain. Implemented by [`SolanaRpcClient`], and mocked in the endpoint tests.
#[allow(async_fn_in_trait)]
pub trait ChainLookup {
    /// The transactions that carry `reference` among their accounts, oldest first.
    async fn reference_signatures(&self, reference: &Pubkey) -> Result<Vec<SignatureInfo>, SolanaError>;
    async fn transaction(&self, signature: &str) -> Result<Option<ConfirmedTransaction>, SolanaError>;
}

impl ChainLookup for SolanaRpcClient {
    async fn reference_signatures(&self, reference: &Pubkey) -> Result<Vec<SignatureInfo>, SolanaError> {
        solana_tools::find_reference(self, reference).await
    }

    async fn transaction(&self, signature: &str) -> Result<Option<ConfirmedTransaction>, SolanaError> {
        self.get_transaction(signature).await
    }
}

fn parse_key(field: &str, value: &str) -> Result<Pubkey, ServerError> {
    value.parse::<Pubkey>().map_err(|e| ServerError::BackendError(format!("Stored {field} is not a valid key. {e}")))
}

/// Rebuilds the Solana Pay request for a stored payment.
pub fn transfer_request_for(payment: &SolanaPayment, label: &str) -> Result<TransferRequest, ServerError> {
    let recipient = parse_key("recipient", &payment.recipient)?;
    let reference = parse_key("reference", &payment.reference)?;
    let amount_base_units = u64::try_from(payment.amount_base_units)
        .map_err(|_| ServerError::BackendError(format!("Negative amount on payment {}", payment.id)))?;
    let decimals = u8::try_from(payment.decimals)
        .map_err(|_| ServerError::BackendError(format!("Invalid decimals on payment {}", payment.id)))?;
    let mut request = TransferRequest::new(recipient)
        .with_amount(TokenAmount::new(amount_base_units, decimals))
        .with_reference(reference)
        .with_message(format!("Order {}", payment.order_number))
        .with_memo(payment.order_number.as_str());
    if !label.is_empty() {
        request = request.with_label(label);
    }
    if let Some(mint) = &payment.spl_token {
        request = request.with_spl_token(parse_key("token mint", mint)?);
    }
    Ok(request)
}

fn status_response(payment: &SolanaPayment, payment_status: PaymentStatus) -> SolanaStatusResponse {
    SolanaStatusResponse {
        order_number: payment.order_number.clone(),
        reference: payment.reference.clone(),
        status: payment.status,
        payment_status,
        signature: payment.signature.clone(),
        detail: None,
    }
}

/// Looks for a transaction paying the order's Solana request and, when one satisfies it, confirms the payment.
///
/// Every transaction carrying the reference is checked, oldest first, so a later transaction that reuses the public
/// reference cannot hide the real payment. If none pays the request (too little, the wrong token, or failed), the
/// payment stays pending and the last reason is reported in `detail`.
pub async fn verify_solana_payment<B, C>(
    api: &PaymentFlowApi<B>,
    chain: &C,
    number: &OrderNumber,
) -> Result<SolanaStatusResponse, ServerError>
where
    B: OrderManagement + PaymentRecords + ExchangeRates,
    C: ChainLookup,
{
    let payment = api
        .solana_payment_for(number)
        .await?
        .ok_or_else(|| OrderFlowError::SolanaPaymentNotFound(number.to_string()))?;
    let order = api.fetch_order(number).await?;
    if payment.status != SolanaPaymentStatus::Pending {
        return Ok(status_response(&payment, order.payment_status));
    }
    let request = transfer_request_for(&payment, "")?;
    let reference = parse_key("reference", &payment.reference)?;
    let candidates = chain.reference_signatures(&reference).await?;
    if candidates.is_empty() {
        trace!("◎ Nothing on-chain yet for order {number}");
    }
    let mut problem = None;
    for found in candidates {
        if let Some(err) = &found.err {
            info!("◎ Transaction {} for order {number} failed on-chain. {err}", found.signature);
            problem = Some(format!("Transaction {} failed", found.signature));
            continue;
        }
        let Some(tx) = chain.transaction(&found.signature).await? else {
            debug!("◎ Transaction {} is not available from the node yet", found.signature);
            continue;
        };
        if let Err(e) = validate_transfer(&tx, &request) {
            warn!("◎ Transaction {} does not pay order {number}. {e}", found.signature);
            problem = Some(e.to_string());
            continue;
        }
        let order = api.confirm_solana_payment(&payment.reference, &found.signature).await?;
        let mut response = status_response(&payment, order.payment_status);
        response.status = SolanaPaymentStatus::Confirmed;
        response.signature = Some(found.signature);
        return Ok(response);
    }
    let mut response = status_response(&payment, order.payment_status);
    response.detail = problem;
    Ok(response)
}
