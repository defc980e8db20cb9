//! Solana Pay for the storefront.
//!
//! * [`TransferRequest`] builds and parses `solana:` transfer-request URLs and renders them as QR codes.
//! * [`SolanaRpcClient`] speaks just enough JSON-RPC to find and fetch transactions.
//! * [`find_reference`] and [`validate_transfer`] decide whether a payment carrying a given reference key has landed
//!   and pays what was asked.
mod amount;
mod error;
mod pubkey;
pub mod rpc;
mod transfer_request;
mod validate;

pub use amount::TokenAmount;
pub use error::{SolanaError, ValidationError};
pub use pubkey::Pubkey;
pub use rpc::SolanaRpcClient;
pub use transfer_request::TransferRequest;
pub use validate::{find_reference, validate_transfer};
