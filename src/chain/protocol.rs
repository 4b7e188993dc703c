//! JSON-RPC Protocol Messages
//!
//! Wire format for talking to an Ethereum node over WebSocket.
//! Quantities and byte strings travel as `0x`-prefixed hex.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chain::transport::{Log, Receipt, TransportError, TxHash};
use crate::core::address::Address;
use crate::core::hash::Hash32;

// =============================================================================
// ENVELOPES
// =============================================================================

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Correlation id.
    pub id: u64,
    /// Method name.
    pub method: String,
    /// Positional params.
    pub params: Value,
}

impl RpcRequest {
    /// Build a request.
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Correlation id (absent on subscription notifications).
    #[serde(default)]
    pub id: Option<u64>,
    /// Success payload.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error payload.
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// Turn into the result value or a transport error.
    pub fn into_result(self) -> Result<Value, TransportError> {
        if let Some(err) = self.error {
            return Err(err.into_transport_error());
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    /// Error code.
    pub code: i64,
    /// Message.
    pub message: String,
    /// Optional data; revert payloads arrive as a hex string.
    #[serde(default)]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    /// Map to a transport error, recognising wallet rejections.
    pub fn into_transport_error(self) -> TransportError {
        if self.code == crate::chain::transport::USER_REJECTED_CODE {
            return TransportError::UserRejected(self.message);
        }
        let data = match &self.data {
            Some(Value::String(s)) => parse_data(s).ok(),
            Some(Value::Object(obj)) => obj
                .get("data")
                .and_then(Value::as_str)
                .and_then(|s| parse_data(s).ok()),
            _ => None,
        };
        TransportError::Rpc { code: self.code, message: self.message, data }
    }
}

// =============================================================================
// PARAMS
// =============================================================================

/// Call / transaction object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcCallObject {
    /// Sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Contract.
    pub to: String,
    /// Calldata.
    pub data: String,
    /// Attached value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// `eth_getLogs` filter object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLogFilter {
    /// Contract.
    pub address: String,
    /// First block.
    pub from_block: String,
    /// Last block.
    pub to_block: String,
}

// =============================================================================
// RESULTS
// =============================================================================

/// Log as returned by the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    /// Emitting contract.
    pub address: String,
    /// Topics.
    pub topics: Vec<String>,
    /// Data.
    pub data: String,
    /// Block number.
    pub block_number: String,
    /// Transaction hash.
    pub transaction_hash: String,
    /// Log index.
    pub log_index: String,
}

impl TryFrom<RpcLog> for Log {
    type Error = TransportError;

    fn try_from(log: RpcLog) -> Result<Self, Self::Error> {
        Ok(Log {
            address: parse_address(&log.address)?,
            topics: log.topics.iter().map(|t| parse_hash(t)).collect::<Result<_, _>>()?,
            data: parse_data(&log.data)?,
            block_number: parse_u64(&log.block_number)?,
            transaction_hash: TxHash(parse_hash(&log.transaction_hash)?),
            log_index: parse_u64(&log.log_index)?,
        })
    }
}

/// Receipt as returned by the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    /// Transaction hash.
    pub transaction_hash: String,
    /// Block number.
    pub block_number: String,
    /// `"0x1"` success, `"0x0"` reverted.
    pub status: String,
    /// Logs.
    #[serde(default)]
    pub logs: Vec<RpcLog>,
}

impl TryFrom<RpcReceipt> for Receipt {
    type Error = TransportError;

    fn try_from(receipt: RpcReceipt) -> Result<Self, Self::Error> {
        Ok(Receipt {
            transaction_hash: TxHash(parse_hash(&receipt.transaction_hash)?),
            block_number: parse_u64(&receipt.block_number)?,
            status: parse_quantity(&receipt.status)? == 1,
            logs: receipt.logs.into_iter().map(Log::try_from).collect::<Result<_, _>>()?,
        })
    }
}

// =============================================================================
// HEX HELPERS
// =============================================================================

fn protocol_err(what: &str, value: &str) -> TransportError {
    TransportError::Protocol(format!("invalid {}: {}", what, value))
}

/// Encode a quantity (`0x0`, `0x1a`, no leading zeros).
pub fn to_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

/// Encode bytes as `0x`-prefixed hex.
pub fn to_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse a hex quantity.
pub fn parse_quantity(s: &str) -> Result<u128, TransportError> {
    let digits = s.strip_prefix("0x").ok_or_else(|| protocol_err("quantity", s))?;
    if digits.is_empty() {
        return Err(protocol_err("quantity", s));
    }
    u128::from_str_radix(digits, 16).map_err(|_| protocol_err("quantity", s))
}

/// Parse a hex quantity that must fit in u64.
pub fn parse_u64(s: &str) -> Result<u64, TransportError> {
    u64::try_from(parse_quantity(s)?).map_err(|_| protocol_err("u64 quantity", s))
}

/// Parse `0x`-prefixed hex bytes.
pub fn parse_data(s: &str) -> Result<Vec<u8>, TransportError> {
    let digits = s.strip_prefix("0x").ok_or_else(|| protocol_err("data", s))?;
    hex::decode(digits).map_err(|_| protocol_err("data", s))
}

/// Parse a 32-byte hash.
pub fn parse_hash(s: &str) -> Result<Hash32, TransportError> {
    let bytes = parse_data(s)?;
    bytes.try_into().map_err(|_| protocol_err("hash", s))
}

/// Parse an address.
pub fn parse_address(s: &str) -> Result<Address, TransportError> {
    s.parse().map_err(|_| protocol_err("address", s))
}
