//! Match Listing
//!
//! Matchmaking page rows built from on-chain matches. Matches have
//! exactly two seats, creator and challenger.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::contract::lifecycle::{MatchAction, MatchPhase};
use crate::contract::types::{Match, MatchId};
use crate::core::address::Address;
use crate::core::amount::TokenAmount;

/// Seats per match.
pub const MAX_PLAYERS: usize = 2;

/// Unknown filter name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown match filter: {0}")]
pub struct UnknownFilter(pub String);

/// Matchmaking page filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchFilter {
    /// Every match.
    #[default]
    All,
    /// Matches the viewer created or joined.
    Mine,
    /// Matches waiting for a challenger.
    Open,
}

impl FromStr for MatchFilter {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(MatchFilter::All),
            "my" | "mine" => Ok(MatchFilter::Mine),
            "open" => Ok(MatchFilter::Open),
            other => Err(UnknownFilter(other.to_string())),
        }
    }
}

impl fmt::Display for MatchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchFilter::All => "All Matches",
            MatchFilter::Mine => "My Matches",
            MatchFilter::Open => "Open Matches",
        };
        f.write_str(s)
    }
}

/// One matchmaking row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchView {
    /// Match id.
    pub id: MatchId,
    /// Creator.
    pub creator: Address,
    /// Challenger, once joined.
    pub challenger: Option<Address>,
    /// Wager.
    pub bet_amount: TokenAmount,
    /// Lifecycle phase.
    pub phase: MatchPhase,
}

impl MatchView {
    /// Build from an on-chain snapshot.
    pub fn new(id: MatchId, m: &Match) -> Self {
        Self {
            id,
            creator: m.creator,
            challenger: m.challenger(),
            bet_amount: m.bet_amount,
            phase: MatchPhase::of(m),
        }
    }

    /// Seated players.
    pub fn players(&self) -> Vec<Address> {
        std::iter::once(self.creator).chain(self.challenger).collect()
    }

    /// Both seats taken.
    pub fn is_full(&self) -> bool {
        self.players().len() >= MAX_PLAYERS
    }

    /// Whether `account` created or joined the match.
    pub fn involves(&self, account: &Address) -> bool {
        self.creator == *account || self.challenger == Some(*account)
    }

    /// Whether the join button applies to `viewer`.
    pub fn can_join(&self, viewer: Option<&Address>) -> bool {
        match viewer {
            Some(account) => self.phase.allows(MatchAction::Join) && !self.involves(account),
            None => false,
        }
    }

    /// Whether the row passes a filter for `viewer`.
    pub fn matches_filter(&self, filter: MatchFilter, viewer: Option<&Address>) -> bool {
        match filter {
            MatchFilter::All => true,
            MatchFilter::Mine => viewer.is_some_and(|v| self.involves(v)),
            MatchFilter::Open => self.phase == MatchPhase::Open,
        }
    }

    /// Wager for display, e.g. `"10.5"`.
    pub fn display_bet(&self, decimals: u8) -> String {
        self.bet_amount.format(decimals)
    }

    /// Seat count for display, e.g. `"1/2"`.
    pub fn seats(&self) -> String {
        format!("{}/{}", self.players().len(), MAX_PLAYERS)
    }
}

/// Rows passing a filter, newest match first.
pub fn filter_matches(views: &[MatchView], filter: MatchFilter, viewer: Option<&Address>) -> Vec<MatchView> {
    let mut out: Vec<MatchView> = views
        .iter()
        .filter(|v| v.matches_filter(filter, viewer))
        .cloned()
        .collect();
    out.sort_by(|a, b| b.id.cmp(&a.id));
    out
}

/// Build rows from `(id, match)` pairs as returned by the client.
pub fn views(matches: &[(MatchId, Match)]) -> Vec<MatchView> {
    matches.iter().map(|(id, m)| MatchView::new(*id, m)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::types::MatchStatus;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn sample() -> Vec<MatchView> {
        let open = Match::new(addr(1), TokenAmount(10_500_000));
        let mut joined = Match::new(addr(2), TokenAmount(5_000_000));
        joined.challenger = addr(1);
        joined.status = MatchStatus::Joined;
        let mut done = Match::new(addr(3), TokenAmount(1));
        done.challenger = addr(4);
        done.status = MatchStatus::Completed;
        views(&[(MatchId(1), open), (MatchId(2), joined), (MatchId(3), done)])
    }

    #[test]
    fn test_filters() {
        let rows = sample();
        assert_eq!(filter_matches(&rows, MatchFilter::All, None).len(), 3);
        assert_eq!(filter_matches(&rows, MatchFilter::All, None)[0].id, MatchId(3));

        let mine = filter_matches(&rows, MatchFilter::Mine, Some(&addr(1)));
        assert_eq!(mine.iter().map(|v| v.id.0).collect::<Vec<_>>(), vec![2, 1]);
        assert!(filter_matches(&rows, MatchFilter::Mine, None).is_empty());

        let open = filter_matches(&rows, MatchFilter::Open, None);
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, MatchId(1));
    }

    #[test]
    fn test_can_join() {
        let rows = sample();
        assert!(rows[0].can_join(Some(&addr(5))));
        assert!(!rows[0].can_join(Some(&addr(1))));
        assert!(!rows[0].can_join(None));
        assert!(!rows[1].can_join(Some(&addr(5))));
    }

    #[test]
    fn test_seats_and_display() {
        let rows = sample();
        assert_eq!(rows[0].seats(), "1/2");
        assert!(!rows[0].is_full());
        assert_eq!(rows[1].seats(), "2/2");
        assert!(rows[1].is_full());
        assert_eq!(rows[0].display_bet(6), "10.5");
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!("my".parse::<MatchFilter>(), Ok(MatchFilter::Mine));
        assert_eq!("open".parse::<MatchFilter>(), Ok(MatchFilter::Open));
        assert!("closed".parse::<MatchFilter>().is_err());
        assert_eq!(MatchFilter::default().to_string(), "All Matches");
    }
}
