use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::SolanaError;

pub const PUBKEY_BYTES: usize = 32;

/// A 32-byte Solana address, shown in base58.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pubkey([u8; PUBKEY_BYTES]);

impl Pubkey {
    pub fn new(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// A random key to use as a Solana Pay reference. It never needs a private key, since it only tags the
    /// transaction so that it can be found with `getSignaturesForAddress`.
    pub fn new_reference() -> Self {
        Self(rand::random())
    }

    pub fn as_bytes(&self) -> &[u8; PUBKEY_BYTES] {
        &self.0
    }
}

impl FromStr for Pubkey {
    type Err = SolanaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s.trim()).into_vec().map_err(|e| SolanaError::InvalidPubkey(format!("{s}. {e}")))?;
        let bytes: [u8; PUBKEY_BYTES] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| SolanaError::InvalidPubkey(format!("{s} is {} bytes long, not 32", v.len())))?;
        Ok(Self(bytes))
    }
}

impl Display for Pubkey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl TryFrom<String> for Pubkey {
    type Error = SolanaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pubkey> for String {
    fn from(value: Pubkey) -> Self {
        value.to_string()
    }
}
