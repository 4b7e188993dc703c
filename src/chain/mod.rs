//! Chain Access
//!
//! Everything between the match client and a chain node.
//!
//! ## Module Structure
//!
//! - `transport`: the `ContractTransport` seam and its wire types
//! - `protocol`: JSON-RPC 2.0 messages and hex helpers
//! - `rpc`: WebSocket JSON-RPC transport
//! - `simulated`: in-memory chain running the contract rules
//! - `session`: explicitly passed wallet context

pub mod transport;
pub mod protocol;
pub mod rpc;
pub mod simulated;
pub mod session;

// Re-export key types
pub use transport::{
    CallRequest, ContractTransport, Log, LogFilter, Receipt, TransportError, TxHash, TxRequest,
};
pub use rpc::WsTransport;
pub use simulated::SimulatedChain;
pub use session::{SessionError, WalletSession};
