//! Client Errors
//!
//! Every failure of a match operation lands in one `ClientError`, which
//! sorts into a `FailureKind` so callers can decide what to do next:
//!
//! | Kind | Meaning | Next step |
//! |---|---|---|
//! | `UserRejected` | wallet declined to sign | nothing, the user chose |
//! | `Network` | submission or connection failure | retry |
//! | `ContractRejected` | the contract reverted | show reason, do not retry |
//! | `StaleState` | cached copy was out of date | refetch and re-decide |
//! | `InvalidRequest` | request can never succeed as-is | fix input |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::session::SessionError;
use crate::chain::transport::{TransportError, TxHash};
use crate::contract::abi::AbiError;
use crate::contract::events::EventError;
use crate::contract::lifecycle::{MatchAction, MatchPhase, TransitionError};
use crate::contract::types::MatchId;
use crate::core::address::Address;

/// Coarse failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Wallet declined the signature.
    UserRejected,
    /// Network or submission failure.
    Network,
    /// Contract revert.
    ContractRejected,
    /// Local copy was stale.
    StaleState,
    /// Request is invalid in the current state.
    InvalidRequest,
}

/// Match client errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No wallet connected.
    #[error("Please connect your wallet first")]
    NotConnected,

    /// Wallet on the wrong chain.
    #[error("wrong network: expected chain {expected}, wallet is on {actual}")]
    WrongNetwork {
        /// Contract chain.
        expected: u64,
        /// Wallet chain.
        actual: u64,
    },

    /// Wallet declined to sign.
    #[error("transaction rejected in wallet")]
    UserRejected(String),

    /// Transport failure.
    #[error("network error: {0}")]
    Network(TransportError),

    /// No receipt before the deadline. The transaction may still land.
    #[error("transaction {0} not confirmed in time")]
    ConfirmationTimeout(TxHash),

    /// Contract reverted, at pre-flight (`tx` unset) or in a block.
    #[error("contract rejected the transaction: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Reverted {
        /// `require` message, when the revert carried one.
        reason: Option<String>,
        /// Mined transaction that reverted.
        tx: Option<TxHash>,
    },

    /// Cached snapshot allowed the action; the chain no longer does.
    #[error("match {match_id} changed: was {cached}, now {current}; refresh before you {action}")]
    StaleState {
        /// Match.
        match_id: MatchId,
        /// Phase of the cached copy.
        cached: MatchPhase,
        /// Phase on chain.
        current: MatchPhase,
        /// Attempted action.
        action: MatchAction,
    },

    /// Action not allowed for this match.
    #[error("match {match_id}: {source}")]
    InvalidTransition {
        /// Match.
        match_id: MatchId,
        /// Failed check.
        #[source]
        source: TransitionError,
    },

    /// No match with this id.
    #[error("match {0} does not exist")]
    MatchNotFound(MatchId),

    /// Account already has a profile.
    #[error("profile already exists for {0}")]
    ProfileExists(Address),

    /// Bad input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected return data.
    #[error("failed to decode contract response: {0}")]
    Decode(#[from] AbiError),

    /// Undecodable log.
    #[error("failed to decode event: {0}")]
    Event(#[from] EventError),

    /// Confirmed transaction lacks the expected event.
    #[error("transaction {tx} emitted no {event} event")]
    MissingEvent {
        /// Transaction.
        tx: TxHash,
        /// Expected event name.
        event: &'static str,
    },
}

impl ClientError {
    /// Failure category.
    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::UserRejected(_) => FailureKind::UserRejected,
            ClientError::Network(_)
            | ClientError::ConfirmationTimeout(_)
            | ClientError::Decode(_)
            | ClientError::Event(_)
            | ClientError::MissingEvent { .. } => FailureKind::Network,
            ClientError::Reverted { .. } => FailureKind::ContractRejected,
            ClientError::StaleState { .. } => FailureKind::StaleState,
            ClientError::NotConnected
            | ClientError::WrongNetwork { .. }
            | ClientError::InvalidTransition { .. }
            | ClientError::MatchNotFound(_)
            | ClientError::ProfileExists(_)
            | ClientError::InvalidRequest(_) => FailureKind::InvalidRequest,
        }
    }

    /// Safe to resubmit unchanged. A confirmation timeout is not: the
    /// original transaction may still be mined.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }

    /// Revert reason, if the contract gave one.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            ClientError::Reverted { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }

    /// User-facing notification text for a failed `action`.
    pub fn notification(&self, action: &str) -> String {
        match self {
            ClientError::NotConnected => self.to_string(),
            ClientError::StaleState { .. } => {
                format!("Failed to {}: match changed, please refresh and try again", action)
            }
            _ => format!("Failed to {}: {}", action, self),
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::UserRejected(message) => ClientError::UserRejected(message),
            ref e if e.is_revert() => ClientError::Reverted { reason: e.revert_reason(), tx: None },
            other => ClientError::Network(other),
        }
    }
}

impl From<SessionError> for ClientError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotConnected => ClientError::NotConnected,
            SessionError::WrongNetwork { expected, actual } => ClientError::WrongNetwork { expected, actual },
        }
    }
}
