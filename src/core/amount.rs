//! Token Amounts
//!
//! Wager amounts are held in base units (u128) and converted from/to
//! human decimal strings using the token's decimals (USDC = 6).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default token decimals (USDC).
pub const DEFAULT_DECIMALS: u8 = 6;

/// Largest decimals whose scale fits in a u128.
pub const MAX_DECIMALS: u8 = 38;

/// Amount in token base units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TokenAmount(pub u128);

/// Amount parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Empty input.
    #[error("amount is empty")]
    Empty,
    /// Not a plain decimal number.
    #[error("invalid amount format: {0}")]
    InvalidFormat(String),
    /// More fractional digits than the token supports.
    #[error("too many decimal places: {got} (max {max})")]
    TooPrecise {
        /// Fractional digits supplied.
        got: usize,
        /// Token decimals.
        max: u8,
    },
    /// Value does not fit in 128 bits.
    #[error("amount overflows")]
    Overflow,
}

impl TokenAmount {
    /// Zero amount.
    pub const ZERO: TokenAmount = TokenAmount(0);

    /// Create from base units.
    pub const fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    /// Raw base units.
    pub fn base_units(&self) -> u128 {
        self.0
    }

    /// True if zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a decimal string like `"10"` or `"10.50"`.
    pub fn parse(s: &str, decimals: u8) -> Result<Self, AmountError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !digits_only(whole) || !digits_only(frac) || (s.contains('.') && frac.is_empty()) {
            return Err(AmountError::InvalidFormat(s.to_string()));
        }
        if frac.len() > decimals as usize {
            return Err(AmountError::TooPrecise { got: frac.len(), max: decimals });
        }

        let scale = 10u128.checked_pow(decimals as u32).ok_or(AmountError::Overflow)?;
        let whole_units: u128 = whole.parse().map_err(|_| AmountError::Overflow)?;

        let mut frac_units: u128 = 0;
        if !frac.is_empty() {
            let padded = format!("{:0<width$}", frac, width = decimals as usize);
            frac_units = padded.parse().map_err(|_| AmountError::Overflow)?;
        }

        whole_units
            .checked_mul(scale)
            .and_then(|v| v.checked_add(frac_units))
            .map(TokenAmount)
            .ok_or(AmountError::Overflow)
    }

    /// Format as a decimal string with trailing zeros trimmed.
    pub fn format(&self, decimals: u8) -> String {
        if decimals == 0 {
            return self.0.to_string();
        }
        // Past MAX_DECIMALS every u128 is below one whole token
        let (whole, frac) = match 10u128.checked_pow(decimals as u32) {
            Some(divisor) => (self.0 / divisor, self.0 % divisor),
            None => (0, self.0),
        };
        if frac == 0 {
            return whole.to_string();
        }
        let frac_str = format!("{:0>width$}", frac, width = decimals as usize);
        format!("{}.{}", whole, frac_str.trim_end_matches('0'))
    }

    /// Checked addition.
    pub fn checked_add(self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_add(other.0).map(TokenAmount)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_sub(other.0).map(TokenAmount)
    }

    /// Whole-number percentage of this amount, rounded down.
    pub fn percent(self, pct: u128) -> TokenAmount {
        TokenAmount(self.0.saturating_mul(pct) / 100)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for TokenAmount {
    fn from(units: u128) -> Self {
        Self(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fraction() {
        assert_eq!(TokenAmount::parse("10", 6).unwrap(), TokenAmount(10_000_000));
        assert_eq!(TokenAmount::parse("10.50", 6).unwrap(), TokenAmount(10_500_000));
        assert_eq!(TokenAmount::parse("0.01", 2).unwrap(), TokenAmount(1));
        assert_eq!(TokenAmount::parse(" 7 ", 0).unwrap(), TokenAmount(7));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(TokenAmount::parse("", 6), Err(AmountError::Empty));
        assert!(matches!(TokenAmount::parse("-1", 6), Err(AmountError::InvalidFormat(_))));
        assert!(matches!(TokenAmount::parse("1.", 6), Err(AmountError::InvalidFormat(_))));
        assert!(matches!(TokenAmount::parse(".5", 6), Err(AmountError::InvalidFormat(_))));
        assert!(matches!(TokenAmount::parse("1e5", 6), Err(AmountError::InvalidFormat(_))));
        assert_eq!(
            TokenAmount::parse("1.123", 2),
            Err(AmountError::TooPrecise { got: 3, max: 2 })
        );
    }

    #[test]
    fn test_parse_overflow() {
        let huge = "9".repeat(40);
        assert_eq!(TokenAmount::parse(&huge, 6), Err(AmountError::Overflow));
    }

    #[test]
    fn test_format() {
        assert_eq!(TokenAmount(10_000_000).format(6), "10");
        assert_eq!(TokenAmount(10_500_000).format(6), "10.5");
        assert_eq!(TokenAmount(1).format(6), "0.000001");
        assert_eq!(TokenAmount(42).format(0), "42");
    }

    #[test]
    fn test_format_beyond_u128_scale() {
        assert_eq!(TokenAmount(1).format(MAX_DECIMALS), format!("0.{}1", "0".repeat(37)));
        assert_eq!(TokenAmount(1).format(39), format!("0.{}1", "0".repeat(38)));
        assert_eq!(TokenAmount(0).format(u8::MAX), "0");
        assert!(TokenAmount(u128::MAX).format(u8::MAX).starts_with("0.000"));
    }

    #[test]
    fn test_percent() {
        assert_eq!(TokenAmount(2_000).percent(5), TokenAmount(100));
        assert_eq!(TokenAmount(99).percent(5), TokenAmount(4));
    }
}
