//! Contract Events
//!
//! The seven events the MatchUp contract emits. None of their
//! parameters are indexed, so every log carries a single topic
//! (the signature hash) and ABI-encoded data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contract::abi::{encode, AbiError, Decoder, Token};
use crate::contract::types::MatchId;
use crate::core::address::Address;
use crate::core::amount::TokenAmount;
use crate::core::hash::{event_topic, Hash32};

/// Event decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// Log has no topics (anonymous event).
    #[error("log has no topics")]
    NoTopics,
    /// First topic matches no known event.
    #[error("unknown event topic 0x{}", hex::encode(.0))]
    UnknownTopic(Hash32),
    /// Data does not match the event layout.
    #[error("event data: {0}")]
    Abi(#[from] AbiError),
}

/// A decoded contract event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ContractEvent {
    /// `MatchCreated(uint256,address,uint256)`
    MatchCreated {
        /// Newly assigned id.
        match_id: MatchId,
        /// Creator.
        creator: Address,
        /// Escrowed wager.
        bet_amount: TokenAmount,
    },
    /// `MatchJoined(uint256,address)`
    MatchJoined {
        /// Match.
        match_id: MatchId,
        /// New challenger.
        challenger: Address,
    },
    /// `PlayerReady(uint256,address)`
    PlayerReady {
        /// Match.
        match_id: MatchId,
        /// Player that readied up.
        player: Address,
    },
    /// `MatchStarted(uint256)`
    MatchStarted {
        /// Match.
        match_id: MatchId,
    },
    /// `MatchCompleted(uint256,address)`
    MatchCompleted {
        /// Match.
        match_id: MatchId,
        /// Paid-out winner.
        winner: Address,
    },
    /// `MatchCancelled(uint256)`
    MatchCancelled {
        /// Match.
        match_id: MatchId,
    },
    /// `UserProfileCreated(address,string)`
    UserProfileCreated {
        /// Profile owner.
        user: Address,
        /// Riot ID handle.
        riot_id: String,
    },
}

const SIGNATURES: [&str; 7] = [
    "MatchCreated(uint256,address,uint256)",
    "MatchJoined(uint256,address)",
    "PlayerReady(uint256,address)",
    "MatchStarted(uint256)",
    "MatchCompleted(uint256,address)",
    "MatchCancelled(uint256)",
    "UserProfileCreated(address,string)",
];

impl ContractEvent {
    fn signature_index(&self) -> usize {
        match self {
            ContractEvent::MatchCreated { .. } => 0,
            ContractEvent::MatchJoined { .. } => 1,
            ContractEvent::PlayerReady { .. } => 2,
            ContractEvent::MatchStarted { .. } => 3,
            ContractEvent::MatchCompleted { .. } => 4,
            ContractEvent::MatchCancelled { .. } => 5,
            ContractEvent::UserProfileCreated { .. } => 6,
        }
    }

    /// Canonical event signature.
    pub fn signature(&self) -> &'static str {
        SIGNATURES[self.signature_index()]
    }

    /// Event name.
    pub fn name(&self) -> &'static str {
        let sig = self.signature();
        sig.split('(').next().unwrap_or(sig)
    }

    /// topic0 of this event.
    pub fn topic(&self) -> Hash32 {
        event_topic(self.signature())
    }

    /// Topics of every known event (for log filters).
    pub fn all_topics() -> Vec<Hash32> {
        SIGNATURES.iter().map(|sig| event_topic(sig)).collect()
    }

    /// Match the event refers to, if any.
    pub fn match_id(&self) -> Option<MatchId> {
        match self {
            ContractEvent::MatchCreated { match_id, .. }
            | ContractEvent::MatchJoined { match_id, .. }
            | ContractEvent::PlayerReady { match_id, .. }
            | ContractEvent::MatchStarted { match_id }
            | ContractEvent::MatchCompleted { match_id, .. }
            | ContractEvent::MatchCancelled { match_id } => Some(*match_id),
            ContractEvent::UserProfileCreated { .. } => None,
        }
    }

    /// Encode as `(topics, data)`.
    pub fn encode(&self) -> (Vec<Hash32>, Vec<u8>) {
        let id = |m: &MatchId| Token::Uint(m.0 as u128);
        let tokens = match self {
            ContractEvent::MatchCreated { match_id, creator, bet_amount } => {
                vec![id(match_id), Token::Address(*creator), Token::Uint(bet_amount.0)]
            }
            ContractEvent::MatchJoined { match_id, challenger } => {
                vec![id(match_id), Token::Address(*challenger)]
            }
            ContractEvent::PlayerReady { match_id, player } => {
                vec![id(match_id), Token::Address(*player)]
            }
            ContractEvent::MatchCompleted { match_id, winner } => {
                vec![id(match_id), Token::Address(*winner)]
            }
            ContractEvent::MatchStarted { match_id } | ContractEvent::MatchCancelled { match_id } => {
                vec![id(match_id)]
            }
            ContractEvent::UserProfileCreated { user, riot_id } => {
                vec![Token::Address(*user), Token::String(riot_id.clone())]
            }
        };
        (vec![self.topic()], encode(&tokens))
    }

    /// Decode from a log's topics and data.
    pub fn decode(topics: &[Hash32], data: &[u8]) -> Result<Self, EventError> {
        let topic0 = topics.first().ok_or(EventError::NoTopics)?;
        let index = SIGNATURES
            .iter()
            .position(|sig| event_topic(sig) == *topic0)
            .ok_or(EventError::UnknownTopic(*topic0))?;

        let d = Decoder::new(data);
        let match_id = || d.uint64(0).map(MatchId);
        let event = match index {
            0 => ContractEvent::MatchCreated {
                match_id: match_id()?,
                creator: d.address(1)?,
                bet_amount: TokenAmount(d.uint(2)?),
            },
            1 => ContractEvent::MatchJoined { match_id: match_id()?, challenger: d.address(1)? },
            2 => ContractEvent::PlayerReady { match_id: match_id()?, player: d.address(1)? },
            3 => ContractEvent::MatchStarted { match_id: match_id()? },
            4 => ContractEvent::MatchCompleted { match_id: match_id()?, winner: d.address(1)? },
            5 => ContractEvent::MatchCancelled { match_id: match_id()? },
            _ => ContractEvent::UserProfileCreated { user: d.address(0)?, riot_id: d.string(1)? },
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::abi::WORD;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    #[test]
    fn test_match_created_layout() {
        let event = ContractEvent::MatchCreated {
            match_id: MatchId(3),
            creator: addr(1),
            bet_amount: TokenAmount(10_000_000),
        };
        let (topics, data) = event.encode();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0], event_topic("MatchCreated(uint256,address,uint256)"));
        assert_eq!(data.len(), 3 * WORD);
        assert_eq!(ContractEvent::decode(&topics, &data).unwrap(), event);
    }

    #[test]
    fn test_profile_event_with_string() {
        let event = ContractEvent::UserProfileCreated {
            user: addr(9),
            riot_id: "a-rather-long-riot-id-over-32-bytes#NA1".to_string(),
        };
        let (topics, data) = event.encode();
        // address, offset, length, two data words
        assert_eq!(data.len(), 5 * WORD);
        assert_eq!(ContractEvent::decode(&topics, &data).unwrap(), event);
        assert_eq!(event.match_id(), None);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(ContractEvent::decode(&[], &[]), Err(EventError::NoTopics));
        assert_eq!(
            ContractEvent::decode(&[[7u8; 32]], &[]),
            Err(EventError::UnknownTopic([7u8; 32]))
        );

        let topic = event_topic("MatchStarted(uint256)");
        assert!(matches!(
            ContractEvent::decode(&[topic], &[0u8; 8]),
            Err(EventError::Abi(AbiError::TooShort { .. }))
        ));
    }

    #[test]
    fn test_all_topics_distinct() {
        let topics = ContractEvent::all_topics();
        assert_eq!(topics.len(), 7);
        let unique: std::collections::BTreeSet<_> = topics.iter().collect();
        assert_eq!(unique.len(), 7);
    }

    #[test]
    fn test_match_id_and_name() {
        let event = ContractEvent::PlayerReady { match_id: MatchId(4), player: addr(2) };
        assert_eq!(event.match_id(), Some(MatchId(4)));
        assert_eq!(event.name(), "PlayerReady");
    }

    #[test]
    fn test_json_tagging() {
        let event = ContractEvent::MatchCancelled { match_id: MatchId(2) };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"match_cancelled\""));
    }
}
