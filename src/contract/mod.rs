//! Contract Interface
//!
//! Typed view of the MatchUp wager contract. The contract source is not
//! part of this crate; only its ABI and observable rules are.
//!
//! ## Module Structure
//!
//! - `types`: Match, UserProfile and status snapshots
//! - `abi`: calldata / return data / revert codec
//! - `events`: decoded contract events
//! - `lifecycle`: client-side transition checks

pub mod types;
pub mod abi;
pub mod events;
pub mod lifecycle;

// Re-export key types
pub use types::{Match, MatchId, MatchStatus, UserProfile};
pub use abi::{AbiError, ContractCall};
pub use events::{ContractEvent, EventError};
pub use lifecycle::{MatchAction, MatchPhase, ReadyCheck, TransitionError};
