//! Account Addresses
//!
//! 20-byte EVM account identifiers.
//! Ordered for use as BTreeMap keys in caches and listings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 20;

/// An EVM account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; ADDRESS_LEN]);

/// Address parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Missing `0x` prefix.
    #[error("address must start with 0x")]
    MissingPrefix,
    /// Wrong number of hex digits.
    #[error("address must be 40 hex digits, got {0}")]
    InvalidLength(usize),
    /// Non-hex characters.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),
}

impl Address {
    /// The zero address. Marks an unset challenger and a missing match.
    pub const ZERO: Address = Address([0; ADDRESS_LEN]);

    /// Create from raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a byte slice of exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != ADDRESS_LEN {
            return None;
        }
        let mut arr = [0u8; ADDRESS_LEN];
        arr.copy_from_slice(bytes);
        Some(Self(arr))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// True for the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; ADDRESS_LEN]
    }

    /// Short form for logs: `0x4b78…71bd`.
    pub fn short(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}…{}", &full[..4], &full[36..])
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /// Parse a `0x`-prefixed hex address. Case is ignored (no checksum validation).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::InvalidLength(digits.len()));
        }
        let bytes = hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        // Length was checked above
        Self::from_slice(&bytes).ok_or(AddressError::InvalidLength(digits.len()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_case() {
        let addr: Address = "0x4b7866e717f27Fa1C38313D25F647aE0598571BD".parse().unwrap();
        assert_eq!(addr.0[0], 0x4b);
        assert_eq!(addr.0[19], 0xbd);
        assert_eq!(addr.to_string(), "0x4b7866e717f27fa1c38313d25f647ae0598571bd");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "4b7866e717f27fa1c38313d25f647ae0598571bd".parse::<Address>(),
            Err(AddressError::MissingPrefix)
        );
        assert_eq!("0x1234".parse::<Address>(), Err(AddressError::InvalidLength(4)));
        assert!(matches!(
            "0xzz7866e717f27fa1c38313d25f647ae0598571bd".parse::<Address>(),
            Err(AddressError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_zero() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::new([1; 20]).is_zero());
        assert_eq!(Address::default(), Address::ZERO);
    }

    #[test]
    fn test_short() {
        let addr: Address = "0x4b7866e717f27fa1c38313d25f647ae0598571bd".parse().unwrap();
        assert_eq!(addr.short(), "0x4b78…71bd");
    }

    #[test]
    fn test_serde_as_string() {
        let addr = Address::new([0xab; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(20)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
