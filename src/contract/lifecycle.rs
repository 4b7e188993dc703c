//! Match Lifecycle
//!
//! Client-side state machine over contract snapshots. Used to reject
//! out-of-order calls before they cost a network round-trip.
//!
//! ```text
//! Open ──join──▶ Joined ──ready──▶ AwaitingReady ──ready──▶ InProgress ──declare──▶ Completed
//!   │               │                   │
//!   └──cancel───────┴───────cancel──────┴──────────▶ Cancelled
//! ```
//!
//! The contract stays authoritative: a passing check is no promise
//! that the transaction succeeds.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contract::types::{Match, MatchStatus};
use crate::core::address::Address;

/// Client view of where a match is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Waiting for a challenger.
    Open,
    /// Both seats taken, nobody ready.
    Joined,
    /// One participant ready.
    AwaitingReady,
    /// Both ready, match running.
    InProgress,
    /// Winner declared.
    Completed,
    /// Cancelled and refunded.
    Cancelled,
}

impl MatchPhase {
    /// Derive the phase from a snapshot.
    pub fn of(m: &Match) -> MatchPhase {
        match m.status {
            MatchStatus::Created => MatchPhase::Open,
            MatchStatus::Joined if m.ready_count() == 0 => MatchPhase::Joined,
            MatchStatus::Joined => MatchPhase::AwaitingReady,
            MatchStatus::Started => MatchPhase::InProgress,
            MatchStatus::Completed => MatchPhase::Completed,
            MatchStatus::Cancelled => MatchPhase::Cancelled,
        }
    }

    /// Phases before the match starts.
    pub fn is_pre_start(self) -> bool {
        matches!(self, MatchPhase::Open | MatchPhase::Joined | MatchPhase::AwaitingReady)
    }

    /// Final phases.
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchPhase::Completed | MatchPhase::Cancelled)
    }

    /// Phases in which an action is allowed.
    pub fn allows(self, action: MatchAction) -> bool {
        match action {
            MatchAction::Join => self == MatchPhase::Open,
            MatchAction::ReadyUp => matches!(self, MatchPhase::Joined | MatchPhase::AwaitingReady),
            MatchAction::DeclareWinner => self == MatchPhase::InProgress,
            MatchAction::Cancel => self.is_pre_start(),
        }
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchPhase::Open => "open",
            MatchPhase::Joined => "joined",
            MatchPhase::AwaitingReady => "awaiting ready",
            MatchPhase::InProgress => "in progress",
            MatchPhase::Completed => "completed",
            MatchPhase::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A lifecycle transition on an existing match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchAction {
    /// `joinMatch`
    Join,
    /// `readyUp`
    ReadyUp,
    /// `declareWinner`
    DeclareWinner,
    /// `cancelMatch`
    Cancel,
}

impl fmt::Display for MatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchAction::Join => "join",
            MatchAction::ReadyUp => "ready up",
            MatchAction::DeclareWinner => "declare winner",
            MatchAction::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

/// Why a transition was rejected locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Action not allowed in the current phase.
    #[error("cannot {action} a match that is {phase}")]
    WrongPhase {
        /// Requested action.
        action: MatchAction,
        /// Phase at check time.
        phase: MatchPhase,
    },
    /// Creator tried to join their own match.
    #[error("cannot join own match")]
    OwnMatch,
    /// Caller is neither creator nor challenger.
    #[error("{0} is not a participant")]
    NotParticipant(Address),
    /// Declared winner is neither creator nor challenger.
    #[error("winner {0} is not a participant")]
    WinnerNotParticipant(Address),
}

/// Result of a ready-up check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyCheck {
    /// Submit the ready-up.
    Submit {
        /// This ready-up is the last one missing.
        completes_start: bool,
    },
    /// Caller's flag is already set; nothing to submit.
    AlreadyReady,
}

/// Check `joinMatch` by `caller`.
pub fn check_join(m: &Match, caller: &Address) -> Result<(), TransitionError> {
    ensure_phase(m, MatchAction::Join)?;
    if m.creator == *caller {
        return Err(TransitionError::OwnMatch);
    }
    Ok(())
}

/// Check `readyUp` by `caller`.
pub fn check_ready(m: &Match, caller: &Address) -> Result<ReadyCheck, TransitionError> {
    ensure_phase(m, MatchAction::ReadyUp)?;
    match m.is_ready(caller) {
        None => Err(TransitionError::NotParticipant(*caller)),
        Some(true) => Ok(ReadyCheck::AlreadyReady),
        Some(false) => Ok(ReadyCheck::Submit { completes_start: m.ready_count() == 1 }),
    }
}

/// Check `declareWinner(winner)`. Who may call it is contract policy.
pub fn check_declare(m: &Match, winner: &Address) -> Result<(), TransitionError> {
    ensure_phase(m, MatchAction::DeclareWinner)?;
    if !m.is_participant(winner) {
        return Err(TransitionError::WinnerNotParticipant(*winner));
    }
    Ok(())
}

/// Check `cancelMatch`.
pub fn check_cancel(m: &Match) -> Result<(), TransitionError> {
    ensure_phase(m, MatchAction::Cancel)
}

fn ensure_phase(m: &Match, action: MatchAction) -> Result<(), TransitionError> {
    let phase = MatchPhase::of(m);
    if phase.allows(action) {
        Ok(())
    } else {
        Err(TransitionError::WrongPhase { action, phase })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::amount::TokenAmount;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn open() -> Match {
        Match::new(addr(1), TokenAmount(100))
    }

    fn joined() -> Match {
        let mut m = open();
        m.challenger = addr(2);
        m.status = MatchStatus::Joined;
        m
    }

    #[test]
    fn test_phase_derivation() {
        assert_eq!(MatchPhase::of(&open()), MatchPhase::Open);
        let mut m = joined();
        assert_eq!(MatchPhase::of(&m), MatchPhase::Joined);
        m.challenger_ready = true;
        assert_eq!(MatchPhase::of(&m), MatchPhase::AwaitingReady);
        m.status = MatchStatus::Started;
        assert_eq!(MatchPhase::of(&m), MatchPhase::InProgress);
        m.status = MatchStatus::Completed;
        assert!(MatchPhase::of(&m).is_terminal());
    }

    #[test]
    fn test_join_rules() {
        assert!(check_join(&open(), &addr(2)).is_ok());
        assert_eq!(check_join(&open(), &addr(1)), Err(TransitionError::OwnMatch));
        assert_eq!(
            check_join(&joined(), &addr(3)),
            Err(TransitionError::WrongPhase { action: MatchAction::Join, phase: MatchPhase::Joined })
        );
    }

    #[test]
    fn test_ready_rules() {
        let mut m = joined();
        assert_eq!(check_ready(&m, &addr(1)), Ok(ReadyCheck::Submit { completes_start: false }));
        assert_eq!(check_ready(&m, &addr(3)), Err(TransitionError::NotParticipant(addr(3))));

        m.creator_ready = true;
        assert_eq!(check_ready(&m, &addr(1)), Ok(ReadyCheck::AlreadyReady));
        assert_eq!(check_ready(&m, &addr(2)), Ok(ReadyCheck::Submit { completes_start: true }));

        assert!(matches!(
            check_ready(&open(), &addr(1)),
            Err(TransitionError::WrongPhase { phase: MatchPhase::Open, .. })
        ));
    }

    #[test]
    fn test_declare_rules() {
        let mut m = joined();
        assert!(matches!(check_declare(&m, &addr(1)), Err(TransitionError::WrongPhase { .. })));
        m.status = MatchStatus::Started;
        assert!(check_declare(&m, &addr(2)).is_ok());
        assert_eq!(
            check_declare(&m, &addr(7)),
            Err(TransitionError::WinnerNotParticipant(addr(7)))
        );
    }

    #[test]
    fn test_cancel_only_pre_start() {
        assert!(check_cancel(&open()).is_ok());
        assert!(check_cancel(&joined()).is_ok());
        let mut m = joined();
        m.status = MatchStatus::Started;
        assert!(check_cancel(&m).is_err());
        m.status = MatchStatus::Cancelled;
        assert!(check_cancel(&m).is_err());
    }

    #[test]
    fn test_terminal_phases_allow_nothing() {
        for phase in [MatchPhase::Completed, MatchPhase::Cancelled] {
            for action in [MatchAction::Join, MatchAction::ReadyUp, MatchAction::DeclareWinner, MatchAction::Cancel] {
                assert!(!phase.allows(action));
            }
        }
    }
}
