//! Solana Pay transfer requests.
//!
//! ```text
//! solana:<recipient>?amount=<amount>&spl-token=<mint>&reference=<ref>&label=<label>&message=<message>&memo=<memo>
//! ```
//!
//! The amount is in whole tokens (never base units). `reference` may repeat. Text fields are percent-encoded.
use log::*;
use qrcode::{
    render::{svg, unicode},
    QrCode,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Pubkey, SolanaError, TokenAmount};

pub const SOLANA_PAY_SCHEME: &str = "solana";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub recipient: Pubkey,
    pub amount: Option<TokenAmount>,
    /// The SPL token mint. `None` requests native SOL.
    pub spl_token: Option<Pubkey>,
    pub references: Vec<Pubkey>,
    pub label: Option<String>,
    pub message: Option<String>,
    pub memo: Option<String>,
}

impl TransferRequest {
    pub fn new(recipient: Pubkey) -> Self {
        Self { recipient, amount: None, spl_token: None, references: vec![], label: None, message: None, memo: None }
    }

    pub fn with_amount(mut self, amount: TokenAmount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_spl_token(mut self, mint: Pubkey) -> Self {
        self.spl_token = Some(mint);
        self
    }

    pub fn with_reference(mut self, reference: Pubkey) -> Self {
        self.references.push(reference);
        self
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_memo<S: Into<String>>(mut self, memo: S) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn to_url(&self) -> String {
        let mut params = Vec::new();
        if let Some(amount) = &self.amount {
            params.push(format!("amount={amount}"));
        }
        if let Some(mint) = &self.spl_token {
            params.push(format!("spl-token={mint}"));
        }
        for reference in &self.references {
            params.push(format!("reference={reference}"));
        }
        let text = [("label", &self.label), ("message", &self.message), ("memo", &self.memo)];
        for (key, value) in text {
            if let Some(value) = value {
                params.push(format!("{key}={}", urlencoding::encode(value)));
            }
        }
        if params.is_empty() {
            format!("{SOLANA_PAY_SCHEME}:{}", self.recipient)
        } else {
            format!("{SOLANA_PAY_SCHEME}:{}?{}", self.recipient, params.join("&"))
        }
    }

    /// Parses a transfer-request URL. The URL does not say how many decimals the token has, so the caller supplies
    /// them (9 for SOL).
    pub fn parse_url(s: &str, decimals: u8) -> Result<Self, SolanaError> {
        let url = Url::parse(s.trim()).map_err(|e| SolanaError::InvalidUrl(e.to_string()))?;
        if url.scheme() != SOLANA_PAY_SCHEME {
            return Err(SolanaError::InvalidUrl(format!("Expected the '{SOLANA_PAY_SCHEME}:' scheme")));
        }
        let recipient = url.path().parse::<Pubkey>()?;
        let mut request = Self::new(recipient);
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "amount" => {
                    if request.amount.is_some() {
                        return Err(SolanaError::InvalidUrl("amount appears more than once".into()));
                    }
                    request.amount = Some(TokenAmount::parse(&value, decimals)?);
                },
                "spl-token" => request.spl_token = Some(value.parse()?),
                "reference" => request.references.push(value.parse()?),
                "label" => request.label = Some(value.into_owned()),
                "message" => request.message = Some(value.into_owned()),
                "memo" => request.memo = Some(value.into_owned()),
                other => debug!("◎ Ignoring unknown transfer request field '{other}'"),
            }
        }
        Ok(request)
    }

    pub fn to_qr_svg(&self) -> Result<String, SolanaError> {
        let code = QrCode::new(self.to_url()).map_err(|e| SolanaError::QrCode(e.to_string()))?;
        Ok(code.render::<svg::Color>().min_dimensions(256, 256).quiet_zone(true).build())
    }

    /// A QR code drawn with unicode half-blocks, for terminals.
    pub fn to_qr_unicode(&self) -> Result<String, SolanaError> {
        let code = QrCode::new(self.to_url()).map_err(|e| SolanaError::QrCode(e.to_string()))?;
        Ok(code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Dark)
            .light_color(unicode::Dense1x2::Light)
            .quiet_zone(true)
            .build())
    }
}
