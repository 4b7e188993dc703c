//! Contract Transport
//!
//! The seam between the match client and a chain. Implemented by the
//! WebSocket JSON-RPC transport and by the in-memory simulated chain.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contract::abi::decode_revert;
use crate::core::address::Address;
use crate::core::amount::TokenAmount;
use crate::core::hash::Hash32;

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC code nodes use for reverted calls and gas estimation.
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// Transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TxHash(pub Hash32);

impl TxHash {
    /// Raw bytes.
    pub fn as_bytes(&self) -> &Hash32 {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash(0x{}…)", hex::encode(&self.0[..6]))
    }
}

/// Read-only call (`eth_call`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Contract.
    pub to: Address,
    /// Optional caller (views do not depend on it here).
    pub from: Option<Address>,
    /// Calldata.
    pub data: Vec<u8>,
}

/// State-changing transaction (`eth_sendTransaction`). The wallet signs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Sending account.
    pub from: Address,
    /// Contract.
    pub to: Address,
    /// Calldata.
    pub data: Vec<u8>,
    /// Attached value (payable functions only).
    pub value: TokenAmount,
}

/// An emitted log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Emitting contract.
    pub address: Address,
    /// Topics (topic0 = event signature hash).
    pub topics: Vec<Hash32>,
    /// ABI-encoded non-indexed parameters.
    pub data: Vec<u8>,
    /// Block the log was included in.
    pub block_number: u64,
    /// Transaction that emitted it.
    pub transaction_hash: TxHash,
    /// Position within the block.
    pub log_index: u64,
}

/// Transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction.
    pub transaction_hash: TxHash,
    /// Inclusion block.
    pub block_number: u64,
    /// `true` on success, `false` if the transaction reverted in the block.
    pub status: bool,
    /// Emitted logs (empty when reverted).
    pub logs: Vec<Log>,
}

/// Log query over an inclusive block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    /// Contract address.
    pub address: Address,
    /// First block (inclusive).
    pub from_block: u64,
    /// Last block (inclusive).
    pub to_block: u64,
}

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Wallet declined to sign.
    #[error("user rejected request: {0}")]
    UserRejected(String),
    /// Connection lost or never established.
    #[error("connection error: {0}")]
    Connection(String),
    /// Node answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
        /// Raw revert data, if any.
        data: Option<Vec<u8>>,
    },
    /// No answer in time.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Malformed response.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Whether the node reported an EVM revert.
    pub fn is_revert(&self) -> bool {
        match self {
            TransportError::Rpc { code, message, .. } => {
                *code == EXECUTION_REVERTED_CODE || message.contains("execution reverted")
            }
            _ => false,
        }
    }

    /// Revert reason decoded from `Error(string)` data, falling back to
    /// the text after `"execution reverted: "` in the message.
    pub fn revert_reason(&self) -> Option<String> {
        let TransportError::Rpc { message, data, .. } = self else {
            return None;
        };
        if let Some(reason) = data.as_deref().and_then(decode_revert) {
            return Some(reason);
        }
        message
            .split_once("execution reverted: ")
            .map(|(_, reason)| reason.to_string())
            .filter(|reason| !reason.is_empty())
    }
}

/// Access to the MatchUp contract on some chain.
///
/// Futures must be `Send` so the event watcher can run on a spawned task.
pub trait ContractTransport: Send + Sync {
    /// Execute a read-only call and return the raw return data.
    fn call(&self, request: CallRequest) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Submit a transaction for signing and broadcast. Resolves once the
    /// transaction is accepted, not once it is mined.
    fn send_transaction(&self, tx: TxRequest) -> impl Future<Output = Result<TxHash, TransportError>> + Send;

    /// Receipt of a mined transaction, `None` while pending.
    fn transaction_receipt(&self, hash: TxHash) -> impl Future<Output = Result<Option<Receipt>, TransportError>> + Send;

    /// Latest block number.
    fn block_number(&self) -> impl Future<Output = Result<u64, TransportError>> + Send;

    /// Logs emitted by a contract over a block range.
    fn logs(&self, filter: LogFilter) -> impl Future<Output = Result<Vec<Log>, TransportError>> + Send;
}

impl<T: ContractTransport> ContractTransport for Arc<T> {
    fn call(&self, request: CallRequest) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send {
        (**self).call(request)
    }

    fn send_transaction(&self, tx: TxRequest) -> impl Future<Output = Result<TxHash, TransportError>> + Send {
        (**self).send_transaction(tx)
    }

    fn transaction_receipt(&self, hash: TxHash) -> impl Future<Output = Result<Option<Receipt>, TransportError>> + Send {
        (**self).transaction_receipt(hash)
    }

    fn block_number(&self) -> impl Future<Output = Result<u64, TransportError>> + Send {
        (**self).block_number()
    }

    fn logs(&self, filter: LogFilter) -> impl Future<Output = Result<Vec<Log>, TransportError>> + Send {
        (**self).logs(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::abi::encode_revert;

    #[test]
    fn test_revert_reason_from_data() {
        let err = TransportError::Rpc {
            code: EXECUTION_REVERTED_CODE,
            message: "execution reverted".to_string(),
            data: Some(encode_revert("Match not open")),
        };
        assert!(err.is_revert());
        assert_eq!(err.revert_reason().as_deref(), Some("Match not open"));
    }

    #[test]
    fn test_revert_reason_from_message() {
        let err = TransportError::Rpc {
            code: -32000,
            message: "execution reverted: Cannot join own match".to_string(),
            data: None,
        };
        assert!(err.is_revert());
        assert_eq!(err.revert_reason().as_deref(), Some("Cannot join own match"));
    }

    #[test]
    fn test_non_revert_errors() {
        let err = TransportError::Rpc { code: -32601, message: "method not found".to_string(), data: None };
        assert!(!err.is_revert());
        assert_eq!(err.revert_reason(), None);
        assert!(!TransportError::Connection("closed".to_string()).is_revert());
    }

    #[test]
    fn test_tx_hash_display() {
        let hash = TxHash([0xab; 32]);
        assert_eq!(hash.to_string(), format!("0x{}", "ab".repeat(32)));
    }
}
