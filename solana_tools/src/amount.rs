use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::SolanaError;

/// An exact token amount: `base_units / 10^decimals` whole tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub base_units: u64,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn new(base_units: u64, decimals: u8) -> Self {
        Self { base_units, decimals }
    }

    /// Parses a decimal such as `"1.25"` into base units. More fractional digits than `decimals` is an error, since
    /// the amount could not be paid exactly.
    pub fn parse(s: &str, decimals: u8) -> Result<Self, SolanaError> {
        let err = |msg: &str| SolanaError::InvalidAmount(format!("'{s}' {msg}"));
        let s = s.trim();
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err("is not a non-negative decimal number"));
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) || (s.contains('.') && frac.is_empty()) {
            return Err(err("is not a non-negative decimal number"));
        }
        if frac.len() > usize::from(decimals) {
            return Err(err(&format!("has more than {decimals} decimal places")));
        }
        let scale = 10u64.checked_pow(u32::from(decimals)).ok_or_else(|| err("has too many decimals"))?;
        let whole = whole.parse::<u64>().map_err(|_| err("is too large"))?;
        let frac_units = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<width$}", width = usize::from(decimals));
            padded.parse::<u64>().map_err(|_| err("is too large"))?
        };
        let base_units = whole
            .checked_mul(scale)
            .and_then(|w| w.checked_add(frac_units))
            .ok_or_else(|| err("is too large"))?;
        Ok(Self { base_units, decimals })
    }
}

impl Display for TokenAmount {
    /// The shortest exact decimal form, e.g. `1.5` or `0.000001`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scale = 10u128.pow(u32::from(self.decimals));
        let units = u128::from(self.base_units);
        let whole = units / scale;
        let frac = units % scale;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{frac:0>width$}", width = usize::from(self.decimals));
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}
