//! Keccak Hashing
//!
//! Provides the keccak-256 digests the contract ABI is keyed on:
//! - 4-byte function selectors
//! - 32-byte event topics
//! - Simulated transaction hashes

use sha3::{Digest, Keccak256};

/// Hash output type (256 bits / 32 bytes)
pub type Hash32 = [u8; 32];

/// Function selector type (first 4 bytes of the signature hash).
pub type Selector = [u8; 4];

/// Incremental keccak-256 hasher.
///
/// Order of updates matters: callers feed fields in a fixed order.
pub struct KeccakHasher {
    hasher: Keccak256,
}

impl KeccakHasher {
    /// Create a new hasher with a domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for simulated transaction hashes.
    pub fn for_transaction() -> Self {
        Self::new(b"MATCHUP_SIM_TX_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u64 value (big-endian, as the EVM orders words).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_be_bytes());
    }

    /// Update with a u128 value (big-endian).
    #[inline]
    pub fn update_u128(&mut self, value: u128) {
        self.hasher.update(value.to_be_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> Hash32 {
        self.hasher.finalize().into()
    }
}

/// Compute keccak-256 of arbitrary data.
pub fn keccak256(data: &[u8]) -> Hash32 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Function selector for a canonical signature such as `"joinMatch(uint256)"`.
pub fn selector(signature: &str) -> Selector {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Event topic for a canonical signature such as `"MatchStarted(uint256)"`.
pub fn event_topic(signature: &str) -> Hash32 {
    keccak256(signature.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_known_selectors() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("Error(string)")), "08c379a0");
    }

    #[test]
    fn test_known_topic() {
        assert_eq!(
            hex::encode(event_topic("Transfer(address,address,uint256)")),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_hasher_domain_separation() {
        let mut a = KeccakHasher::for_transaction();
        a.update_u64(1);
        let mut b = KeccakHasher::new(b"OTHER");
        b.update_u64(1);
        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_hasher_deterministic() {
        let run = || {
            let mut h = KeccakHasher::for_transaction();
            h.update_bytes(b"abc");
            h.update_u128(42);
            h.finalize()
        };
        assert_eq!(run(), run());
    }
}
