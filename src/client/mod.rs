//! Match Lifecycle Client
//!
//! Translates user intent into contract calls and surfaces results and
//! failures to whatever presents them.
//!
//! ## Module Structure
//!
//! - `config`: client configuration from defaults and environment
//! - `error`: failure taxonomy and notification text
//! - `cache`: per-entity snapshot cache
//! - `pending`: submitted vs confirmed transactions
//! - `matches`: the `MatchClient` itself
//! - `watcher`: contract event polling and broadcast

pub mod config;
pub mod error;
pub mod cache;
pub mod pending;
pub mod matches;
pub mod watcher;

// Re-export key types
pub use config::{ClientConfig, ConfigError, DEFAULT_CHAIN_ID, DEFAULT_CONTRACT};
pub use error::{ClientError, FailureKind};
pub use cache::{Cached, SnapshotCache};
pub use pending::{Confirmation, PendingTransaction, TxState};
pub use matches::{
    ContractInfo, CreatedMatch, JoinedMatch, MatchClient, MatchResolved, ProfileCreated, ReadyOutcome,
};
pub use watcher::EventWatcher;
