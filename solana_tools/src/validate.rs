use log::*;

use crate::{
    rpc::{ConfirmedTransaction, SignatureInfo, TokenBalance, TransactionMeta},
    Pubkey,
    SolanaError,
    SolanaRpcClient,
    TransferRequest,
    ValidationError,
};

/// The most signatures fetched for one reference key.
pub const REFERENCE_PAGE_SIZE: usize = 100;

/// Finds the transactions that include `reference` among their accounts, oldest first.
///
/// The reference key is public once the payment link is shown, so anyone can add it to a later transaction. The
/// caller must check each candidate in turn rather than trust the newest one.
pub async fn find_reference(client: &SolanaRpcClient, reference: &Pubkey) -> Result<Vec<SignatureInfo>, SolanaError> {
    let mut signatures = client.get_signatures_for_address(reference, REFERENCE_PAGE_SIZE).await?;
    signatures.reverse();
    match signatures.first() {
        Some(sig) => {
            debug!("◎ Reference {reference} found in {} transactions, first {}", signatures.len(), sig.signature)
        },
        None => trace!("◎ No transaction carries reference {reference} yet"),
    }
    Ok(signatures)
}

/// Checks that a confirmed transaction satisfies the transfer request: it succeeded, it includes every reference key,
/// and the recipient's balance grew by at least the requested amount. For SPL tokens only the token accounts owned by
/// the recipient for the requested mint are counted.
pub fn validate_transfer(tx: &ConfirmedTransaction, request: &TransferRequest) -> Result<(), ValidationError> {
    let meta = tx.meta.as_ref().ok_or(ValidationError::MissingMeta)?;
    if let Some(err) = &meta.err {
        return Err(ValidationError::TransactionFailed(err.to_string()));
    }
    let expected = request.amount.ok_or(ValidationError::MissingAmount)?.base_units;
    for reference in &request.references {
        if tx.account_index(reference).is_none() {
            return Err(ValidationError::ReferenceMissing(reference.to_string()));
        }
    }
    let received = match &request.spl_token {
        None => lamports_received(tx, meta, &request.recipient)?,
        Some(mint) => tokens_received(meta, &request.recipient, mint)?,
    };
    if received < i128::from(expected) {
        return Err(ValidationError::AmountTooLow { expected, actual: received });
    }
    trace!("◎ Transfer of {received} base units to {} is valid", request.recipient);
    Ok(())
}

fn lamports_received(
    tx: &ConfirmedTransaction,
    meta: &TransactionMeta,
    recipient: &Pubkey,
) -> Result<i128, ValidationError> {
    let not_found = || ValidationError::RecipientNotFound(recipient.to_string());
    let index = tx.account_index(recipient).ok_or_else(not_found)?;
    let pre = meta.pre_balances.get(index).ok_or_else(not_found)?;
    let post = meta.post_balances.get(index).ok_or_else(not_found)?;
    Ok(i128::from(*post) - i128::from(*pre))
}

fn tokens_received(meta: &TransactionMeta, recipient: &Pubkey, mint: &Pubkey) -> Result<i128, ValidationError> {
    let recipient_str = recipient.to_string();
    let mint_str = mint.to_string();
    let belongs = |b: &&TokenBalance| b.mint == mint_str && b.owner.as_deref() == Some(recipient_str.as_str());
    let empty = Vec::new();
    let post = meta.post_token_balances.as_ref().unwrap_or(&empty);
    let pre = meta.pre_token_balances.as_ref().unwrap_or(&empty);
    let accounts = post.iter().filter(belongs).collect::<Vec<_>>();
    if accounts.is_empty() {
        return Err(ValidationError::RecipientNotFound(recipient_str));
    }
    let received = accounts
        .into_iter()
        .map(|after| {
            // A token account created by this transaction has no pre-balance entry.
            let before = pre
                .iter()
                .filter(belongs)
                .find(|b| b.account_index == after.account_index)
                .map(|b| b.ui_token_amount.base_units())
                .unwrap_or_default();
            i128::from(after.ui_token_amount.base_units()) - i128::from(before)
        })
        .sum();
    Ok(received)
}
