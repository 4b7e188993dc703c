//! Contract State Definitions
//!
//! Read-only copies of the entities owned by the MatchUp contract.
//! The contract is the single source of truth; these are snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::amount::TokenAmount;

// =============================================================================
// MATCH ID
// =============================================================================

/// Sequential match identifier assigned by the contract (first id is 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct MatchId(pub u64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for MatchId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// =============================================================================
// MATCH STATUS
// =============================================================================

/// On-chain match status (`enum MatchStatus`, encoded as uint8).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MatchStatus {
    /// Created by the creator, escrow funded, waiting for a challenger.
    Created = 0,
    /// Challenger attached, waiting for both ready flags.
    Joined = 1,
    /// Both players ready.
    Started = 2,
    /// Winner declared and paid out.
    Completed = 3,
    /// Cancelled before start and refunded.
    Cancelled = 4,
}

impl MatchStatus {
    /// Decode from the uint8 discriminant. Unknown values are rejected.
    pub fn from_u8(value: u8) -> Option<MatchStatus> {
        match value {
            0 => Some(MatchStatus::Created),
            1 => Some(MatchStatus::Joined),
            2 => Some(MatchStatus::Started),
            3 => Some(MatchStatus::Completed),
            4 => Some(MatchStatus::Cancelled),
            _ => None,
        }
    }

    /// uint8 discriminant.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether the match has reached a final state.
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Cancelled)
    }
}

// =============================================================================
// MATCH
// =============================================================================

/// Snapshot of `struct MatchUpContract.Match`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Match creator.
    pub creator: Address,
    /// Challenger (zero address until someone joins).
    pub challenger: Address,
    /// Wager fixed at creation.
    pub bet_amount: TokenAmount,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Creator has readied up.
    pub creator_ready: bool,
    /// Challenger has readied up.
    pub challenger_ready: bool,
}

impl Match {
    /// A freshly created match.
    pub fn new(creator: Address, bet_amount: TokenAmount) -> Self {
        Self {
            creator,
            challenger: Address::ZERO,
            bet_amount,
            status: MatchStatus::Created,
            creator_ready: false,
            challenger_ready: false,
        }
    }

    /// Contract mappings return a zeroed struct for unknown keys.
    pub fn exists(&self) -> bool {
        !self.creator.is_zero()
    }

    /// Challenger, if one has joined.
    pub fn challenger(&self) -> Option<Address> {
        if self.challenger.is_zero() {
            None
        } else {
            Some(self.challenger)
        }
    }

    /// Whether the address is the creator or the challenger.
    pub fn is_participant(&self, address: &Address) -> bool {
        !address.is_zero() && (self.creator == *address || self.challenger == *address)
    }

    /// Ready flag of a participant, `None` for outsiders.
    pub fn is_ready(&self, address: &Address) -> Option<bool> {
        if address.is_zero() {
            None
        } else if self.creator == *address {
            Some(self.creator_ready)
        } else if self.challenger == *address {
            Some(self.challenger_ready)
        } else {
            None
        }
    }

    /// Number of ready flags set.
    pub fn ready_count(&self) -> u8 {
        self.creator_ready as u8 + self.challenger_ready as u8
    }
}

// =============================================================================
// USER PROFILE
// =============================================================================

/// Snapshot of `struct MatchUpContract.UserProfile`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Riot ID handle.
    pub riot_id: String,
}

impl UserProfile {
    /// Unset profiles come back with an empty Riot ID.
    pub fn exists(&self) -> bool {
        !self.riot_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    #[test]
    fn test_status_roundtrip_and_unknown() {
        for v in 0..=4u8 {
            assert_eq!(MatchStatus::from_u8(v).unwrap().as_u8(), v);
        }
        assert_eq!(MatchStatus::from_u8(5), None);
        assert!(MatchStatus::Completed.is_terminal());
        assert!(!MatchStatus::Started.is_terminal());
    }

    #[test]
    fn test_new_match_is_open() {
        let m = Match::new(addr(1), TokenAmount(10));
        assert!(m.exists());
        assert_eq!(m.challenger(), None);
        assert_eq!(m.status, MatchStatus::Created);
        assert_eq!(m.ready_count(), 0);
    }

    #[test]
    fn test_participants_and_ready() {
        let mut m = Match::new(addr(1), TokenAmount(10));
        m.challenger = addr(2);
        m.creator_ready = true;

        assert!(m.is_participant(&addr(1)));
        assert!(m.is_participant(&addr(2)));
        assert!(!m.is_participant(&addr(3)));
        assert!(!m.is_participant(&Address::ZERO));

        assert_eq!(m.is_ready(&addr(1)), Some(true));
        assert_eq!(m.is_ready(&addr(2)), Some(false));
        assert_eq!(m.is_ready(&addr(3)), None);
        assert_eq!(m.ready_count(), 1);
    }

    #[test]
    fn test_zeroed_struct_does_not_exist() {
        let m = Match::new(Address::ZERO, TokenAmount::ZERO);
        assert!(!m.exists());
        assert!(!UserProfile::default().exists());
    }
}
