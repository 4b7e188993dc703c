//! Core primitives.
//!
//! Value types shared by the contract codec, the transports and the schema.

pub mod address;
pub mod amount;
pub mod hash;

// Re-export core types
pub use address::{Address, AddressError};
pub use amount::{TokenAmount, AmountError, DEFAULT_DECIMALS};
pub use hash::{keccak256, selector, event_topic, Hash32, Selector};
