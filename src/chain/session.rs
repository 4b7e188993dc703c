//! Wallet Session
//!
//! The connected wallet, passed explicitly to every mutating operation
//! instead of living in global state. A disconnected session still
//! allows reads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::address::Address;

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No account connected.
    #[error("Please connect your wallet first")]
    NotConnected,
    /// Wallet is on a different chain than the contract.
    #[error("wrong network: expected chain {expected}, wallet is on {actual}")]
    WrongNetwork {
        /// Chain the contract is deployed on.
        expected: u64,
        /// Chain the wallet reports.
        actual: u64,
    },
}

/// Wallet connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    /// Connected account, if any.
    pub account: Option<Address>,
    /// Chain the wallet is connected to.
    pub chain_id: u64,
}

impl WalletSession {
    /// Session with a connected account.
    pub fn connected(account: Address, chain_id: u64) -> Self {
        Self { account: Some(account), chain_id }
    }

    /// Session without an account.
    pub fn disconnected(chain_id: u64) -> Self {
        Self { account: None, chain_id }
    }

    /// Whether an account is connected.
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    /// The connected account.
    pub fn require_account(&self) -> Result<Address, SessionError> {
        self.account.ok_or(SessionError::NotConnected)
    }

    /// Check the wallet is on the expected chain.
    pub fn ensure_network(&self, expected: u64) -> Result<(), SessionError> {
        if self.chain_id == expected {
            Ok(())
        } else {
            Err(SessionError::WrongNetwork { expected, actual: self.chain_id })
        }
    }

    /// Account ready to sign on the expected chain.
    pub fn signer(&self, expected_chain: u64) -> Result<Address, SessionError> {
        let account = self.require_account()?;
        self.ensure_network(expected_chain)?;
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_session() {
        let account = Address::new([1; 20]);
        let session = WalletSession::connected(account, 421614);
        assert!(session.is_connected());
        assert_eq!(session.signer(421614), Ok(account));
    }

    #[test]
    fn test_disconnected_session() {
        let session = WalletSession::disconnected(421614);
        assert_eq!(session.require_account(), Err(SessionError::NotConnected));
        assert_eq!(session.signer(421614), Err(SessionError::NotConnected));
        assert_eq!(SessionError::NotConnected.to_string(), "Please connect your wallet first");
    }

    #[test]
    fn test_wrong_network() {
        let session = WalletSession::connected(Address::new([1; 20]), 1);
        assert_eq!(
            session.signer(421614),
            Err(SessionError::WrongNetwork { expected: 421614, actual: 1 })
        );
    }
}
