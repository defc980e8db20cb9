use anyhow::{anyhow, Result};
use solana_tools::{Pubkey, TokenAmount, TransferRequest};

use crate::SolanaLinkParams;

pub const SOL_DECIMALS: u8 = 9;

pub fn print_new_reference() {
    let reference = Pubkey::new_reference();
    println!("----------------------------- Reference Key -----------------------------");
    println!("{reference}");
    println!("------------------------------------------------------------------------");
}

pub fn build_transfer_request(params: &SolanaLinkParams) -> Result<TransferRequest> {
    let recipient: Pubkey = params.recipient.parse().map_err(|e| anyhow!("Invalid recipient. {e}"))?;
    let decimals = match (&params.spl_token, params.decimals) {
        (None, _) => SOL_DECIMALS,
        (Some(_), Some(d)) => d,
        (Some(_), None) => return Err(anyhow!("--decimals is required for SPL token transfers")),
    };
    let amount = TokenAmount::parse(&params.amount, decimals)?;
    let mut request = TransferRequest::new(recipient).with_amount(amount);
    if let Some(mint) = &params.spl_token {
        request = request.with_spl_token(mint.parse().map_err(|e| anyhow!("Invalid token mint. {e}"))?);
    }
    let reference = match &params.reference {
        Some(r) => r.parse().map_err(|e| anyhow!("Invalid reference. {e}"))?,
        None => Pubkey::new_reference(),
    };
    request = request.with_reference(reference);
    if let Some(label) = &params.label {
        request = request.with_label(label.as_str());
    }
    if let Some(order) = &params.order {
        request = request.with_message(format!("Order {order}")).with_memo(order.as_str());
    }
    Ok(request)
}

pub fn print_solana_link(params: SolanaLinkParams) -> Result<()> {
    let request = build_transfer_request(&params)?;
    println!("----------------------------- Solana Pay -----------------------------");
    for reference in &request.references {
        println!("Reference: {reference}");
    }
    println!("URL: {}", request.to_url());
    if !params.no_qr {
        println!("{}", request.to_qr_unicode()?);
    }
    println!("----------------------------------------------------------------------");
    Ok(())
}
