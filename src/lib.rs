//! # MatchUp Client
//!
//! Typed client for the MatchUp wager contract: skill-based matches
//! between two players with escrowed bets, plus the on-chain Riot ID
//! profile registry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     MATCHUP CLIENT                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Chain primitives                          │
//! │  ├── address.rs  - 20-byte account addresses                 │
//! │  ├── amount.rs   - Token amounts and decimal parsing         │
//! │  └── hash.rs     - Keccak-256, selectors, event topics       │
//! │                                                              │
//! │  contract/       - Contract interface                        │
//! │  ├── types.rs    - Match, MatchStatus, UserProfile           │
//! │  ├── abi.rs      - Calldata and return data codec            │
//! │  ├── events.rs   - Contract events                           │
//! │  └── lifecycle.rs- Client-side lifecycle state machine       │
//! │                                                              │
//! │  chain/          - Chain access                              │
//! │  ├── transport.rs- ContractTransport seam                    │
//! │  ├── protocol.rs - JSON-RPC messages                         │
//! │  ├── rpc.rs      - WebSocket JSON-RPC transport              │
//! │  ├── simulated.rs- In-memory chain with contract rules       │
//! │  └── session.rs  - Wallet session                            │
//! │                                                              │
//! │  client/         - Match lifecycle client                    │
//! │  ├── matches.rs  - MatchClient operations                    │
//! │  ├── pending.rs  - Submitted vs confirmed transactions       │
//! │  ├── cache.rs    - Snapshot cache                            │
//! │  ├── watcher.rs  - Event polling                             │
//! │  ├── config.rs   - Configuration                             │
//! │  └── error.rs    - Failure taxonomy                          │
//! │                                                              │
//! │  schema/         - Shared presentation schema                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Source of Truth
//!
//! The contract owns every match and profile. The client only holds
//! snapshots, never writes them optimistically, and treats a submitted
//! transaction as unconfirmed until its receipt arrives.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod contract;
pub mod chain;
pub mod client;
pub mod schema;

// Re-export commonly used types
pub use crate::core::{Address, TokenAmount};
pub use crate::contract::{ContractEvent, Match, MatchId, MatchPhase, MatchStatus, UserProfile};
pub use crate::chain::{ContractTransport, SimulatedChain, WalletSession, WsTransport};
pub use crate::client::{ClientConfig, ClientError, FailureKind, MatchClient};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
