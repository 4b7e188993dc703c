//! Snapshot Cache
//!
//! Read-only copies of contract state, one map per entity so match and
//! profile fetches never touch each other's entries. Entries are only
//! written from fresh chain reads; confirmed writes and watched events
//! mark them stale so the next read refetches.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::contract::types::{Match, MatchId, UserProfile};
use crate::core::address::Address;

/// A cached value with its fetch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached<T> {
    /// Snapshot.
    pub value: T,
    /// When it was read from chain.
    pub fetched_at: DateTime<Utc>,
    /// Invalidated since fetching.
    pub stale: bool,
}

impl<T> Cached<T> {
    fn fresh(value: T) -> Self {
        Self { value, fetched_at: Utc::now(), stale: false }
    }
}

/// Per-entity snapshot maps.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    matches: BTreeMap<MatchId, Cached<Match>>,
    profiles: BTreeMap<Address, Cached<UserProfile>>,
}

impl SnapshotCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // MATCHES
    // =========================================================================

    /// Store a freshly read match.
    pub fn put_match(&mut self, id: MatchId, m: Match) {
        self.matches.insert(id, Cached::fresh(m));
    }

    /// Cached match, stale or not.
    pub fn get_match(&self, id: &MatchId) -> Option<&Cached<Match>> {
        self.matches.get(id)
    }

    /// Cached match if still fresh.
    pub fn fresh_match(&self, id: &MatchId) -> Option<&Match> {
        self.matches.get(id).filter(|c| !c.stale).map(|c| &c.value)
    }

    /// Mark a match stale. Returns whether an entry existed.
    pub fn invalidate_match(&mut self, id: &MatchId) -> bool {
        match self.matches.get_mut(id) {
            Some(entry) => {
                entry.stale = true;
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // PROFILES
    // =========================================================================

    /// Store a freshly read profile.
    pub fn put_profile(&mut self, user: Address, profile: UserProfile) {
        self.profiles.insert(user, Cached::fresh(profile));
    }

    /// Cached profile, stale or not.
    pub fn get_profile(&self, user: &Address) -> Option<&Cached<UserProfile>> {
        self.profiles.get(user)
    }

    /// Cached profile if still fresh.
    pub fn fresh_profile(&self, user: &Address) -> Option<&UserProfile> {
        self.profiles.get(user).filter(|c| !c.stale).map(|c| &c.value)
    }

    /// Mark a profile stale. Returns whether an entry existed.
    pub fn invalidate_profile(&mut self, user: &Address) -> bool {
        match self.profiles.get_mut(user) {
            Some(entry) => {
                entry.stale = true;
                true
            }
            None => false,
        }
    }

    /// Mark everything stale.
    pub fn invalidate_all(&mut self) {
        self.matches.values_mut().for_each(|c| c.stale = true);
        self.profiles.values_mut().for_each(|c| c.stale = true);
    }

    /// Number of cached entries (matches, profiles).
    pub fn len(&self) -> (usize, usize) {
        (self.matches.len(), self.profiles.len())
    }

    /// Check if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::amount::TokenAmount;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    #[test]
    fn test_entities_isolated() {
        let mut cache = SnapshotCache::new();
        cache.put_match(MatchId(1), Match::new(addr(1), TokenAmount(10)));
        cache.put_profile(addr(9), UserProfile { riot_id: "nine#EUW".to_string() });

        assert!(cache.invalidate_match(&MatchId(1)));
        assert!(cache.fresh_match(&MatchId(1)).is_none());
        assert_eq!(cache.fresh_profile(&addr(9)).map(|p| p.riot_id.as_str()), Some("nine#EUW"));
        assert!(cache.fresh_profile(&addr(1)).is_none());
        assert_eq!(cache.len(), (1, 1));
    }

    #[test]
    fn test_refetch_clears_stale() {
        let mut cache = SnapshotCache::new();
        cache.put_match(MatchId(2), Match::new(addr(1), TokenAmount(10)));
        cache.invalidate_match(&MatchId(2));
        assert!(cache.get_match(&MatchId(2)).unwrap().stale);

        cache.put_match(MatchId(2), Match::new(addr(1), TokenAmount(10)));
        assert!(cache.fresh_match(&MatchId(2)).is_some());
    }

    #[test]
    fn test_invalidate_missing_and_all() {
        let mut cache = SnapshotCache::new();
        assert!(cache.is_empty());
        assert!(!cache.invalidate_match(&MatchId(5)));
        assert!(!cache.invalidate_profile(&addr(5)));

        cache.put_match(MatchId(1), Match::new(addr(1), TokenAmount(1)));
        cache.put_profile(addr(1), UserProfile::default());
        cache.invalidate_all();
        assert!(cache.fresh_match(&MatchId(1)).is_none());
        assert!(cache.fresh_profile(&addr(1)).is_none());
    }
}
