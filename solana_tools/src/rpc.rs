//! A minimal Solana JSON-RPC client, and the response types the storefront reads.
//!
//! Transactions are fetched with `jsonParsed` encoding, so account keys arrive as base58 strings with their
//! signer/writable flags.
use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{Pubkey, SolanaError};

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

#[derive(Clone)]
pub struct SolanaRpcClient {
    url: String,
    client: Arc<Client>,
}

impl std::fmt::Debug for SolanaRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SolanaRpcClient({})", self.url)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl<T> RpcResponse<T> {
    fn into_result(self) -> Result<Option<T>, SolanaError> {
        match self.error {
            Some(e) => Err(SolanaError::Rpc { code: e.code, message: e.message }),
            None => Ok(self.result),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedTransaction {
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    pub meta: Option<TransactionMeta>,
    pub transaction: ParsedTransaction,
}

impl ConfirmedTransaction {
    pub fn signature(&self) -> Option<&str> {
        self.transaction.signatures.first().map(String::as_str)
    }

    pub fn account_index(&self, key: &Pubkey) -> Option<usize> {
        let key = key.to_string();
        self.transaction.message.account_keys.iter().position(|k| k.pubkey == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTransaction {
    pub signatures: Vec<String>,
    pub message: ParsedMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMessage {
    pub account_keys: Vec<AccountKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountKey {
    pub pubkey: String,
    #[serde(default)]
    pub signer: bool,
    #[serde(default)]
    pub writable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub fee: u64,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    #[serde(default)]
    pub pre_token_balances: Option<Vec<TokenBalance>>,
    #[serde(default)]
    pub post_token_balances: Option<Vec<TokenBalance>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub account_index: usize,
    pub mint: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub ui_token_amount: UiTokenAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiTokenAmount {
    /// Raw base units, as a decimal string.
    pub amount: String,
    pub decimals: u8,
}

impl UiTokenAmount {
    pub fn base_units(&self) -> u64 {
        self.amount.parse().unwrap_or_default()
    }
}

impl SolanaRpcClient {
    pub fn new<S: Into<String>>(url: S) -> Result<Self, SolanaError> {
        let client = Client::builder().build().map_err(|e| SolanaError::Transport(e.to_string()))?;
        Ok(Self { url: url.into(), client: Arc::new(client) })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>, SolanaError> {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
        trace!("◎ RPC {method} -> {}", self.url);
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SolanaError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SolanaError::Rpc { code: i64::from(status.as_u16()), message });
        }
        let result =
            response.json::<RpcResponse<T>>().await.map_err(|e| SolanaError::Json(e.to_string()))?.into_result();
        if let Err(e) = &result {
            warn!("◎ RPC {method} failed. {e}");
        }
        result
    }

    /// Signatures that touched `address`, newest first.
    pub async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, SolanaError> {
        let params = json!([address.to_string(), { "limit": limit, "commitment": "confirmed" }]);
        let result = self.call::<Vec<SignatureInfo>>("getSignaturesForAddress", params).await?;
        Ok(result.unwrap_or_default())
    }

    /// Fetches a transaction. `None` means the node does not (yet) know it.
    pub async fn get_transaction(&self, signature: &str) -> Result<Option<ConfirmedTransaction>, SolanaError> {
        let params = json!([
            signature,
            { "encoding": "jsonParsed", "maxSupportedTransactionVersion": 0, "commitment": "confirmed" }
        ]);
        self.call::<ConfirmedTransaction>("getTransaction", params).await
    }
}
