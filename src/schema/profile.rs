//! Gaming Profile
//!
//! Off-chain profile shown on the profile page. Featured badges are
//! stored as achievement ids and resolved against the profile's own
//! achievement list.

use serde::{Deserialize, Serialize};

use crate::contract::types::UserProfile;
use crate::schema::achievement::{Achievement, AchievementError, AchievementProgress};

/// Platform whose account id doubles as the on-chain Riot ID.
pub const RIOT_PLATFORM: &str = "Riot";

/// A linked platform account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAccount {
    /// Platform name.
    pub platform: String,
    /// Account id on that platform.
    pub account_id: String,
    /// Ownership verified.
    pub verified: bool,
    /// Platform logo.
    pub image_url: String,
}

/// A stat value; either a number or text like "Gold II".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    /// Numeric stat.
    Number(f64),
    /// Free-form stat.
    Text(String),
}

/// One labelled stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    /// Label.
    pub label: String,
    /// Value.
    pub value: StatValue,
}

/// Stats for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    /// Game.
    pub game: String,
    /// Stats.
    pub stats: Vec<Stat>,
}

/// Profile page data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamingProfile {
    /// Display name.
    pub username: String,
    /// Bio.
    pub bio: String,
    /// Linked accounts.
    pub gaming_accounts: Vec<LinkedAccount>,
    /// All achievements.
    pub achievements: Vec<Achievement>,
    /// Reputation score.
    pub reputation: u32,
    /// Per-game stats.
    pub game_stats: Vec<GameStats>,
    /// Ids of featured achievements.
    #[serde(default)]
    pub featured_badges: Vec<String>,
}

impl GamingProfile {
    /// Featured achievements, in featured order. Unknown ids are skipped.
    pub fn featured(&self) -> Vec<&Achievement> {
        self.featured_badges
            .iter()
            .filter_map(|id| self.achievements.iter().find(|a| a.id == *id))
            .collect()
    }

    /// Feature an achievement. Idempotent.
    pub fn feature_badge(&mut self, id: &str) -> Result<(), AchievementError> {
        if !self.achievements.iter().any(|a| a.id == id) {
            return Err(AchievementError::Unknown(id.to_string()));
        }
        if !self.featured_badges.iter().any(|f| f == id) {
            self.featured_badges.push(id.to_string());
        }
        Ok(())
    }

    /// Stop featuring an achievement.
    pub fn unfeature_badge(&mut self, id: &str) {
        self.featured_badges.retain(|f| f != id);
    }

    /// Verified linked accounts.
    pub fn verified_accounts(&self) -> impl Iterator<Item = &LinkedAccount> {
        self.gaming_accounts.iter().filter(|a| a.verified)
    }

    /// Achievement completion summary.
    pub fn progress(&self) -> AchievementProgress {
        AchievementProgress::of(&self.achievements)
    }

    /// Riot account id, if linked.
    pub fn riot_id(&self) -> Option<&str> {
        self.gaming_accounts
            .iter()
            .find(|a| a.platform == RIOT_PLATFORM)
            .map(|a| a.account_id.as_str())
    }

    /// On-chain profile this page would register.
    pub fn to_user_profile(&self) -> Option<UserProfile> {
        self.riot_id()
            .filter(|id| !id.is_empty())
            .map(|id| UserProfile { riot_id: id.to_string() })
    }

    /// Whether the on-chain profile matches the linked Riot account.
    pub fn matches_on_chain(&self, on_chain: &UserProfile) -> bool {
        on_chain.exists() && self.riot_id() == Some(on_chain.riot_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::achievement::tests::achievement;

    fn profile() -> GamingProfile {
        GamingProfile {
            username: "fac3_m4n".to_string(),
            bio: "FPS and strategy".to_string(),
            gaming_accounts: vec![
                LinkedAccount {
                    platform: "Steam".to_string(),
                    account_id: "steam123".to_string(),
                    verified: true,
                    image_url: String::new(),
                },
                LinkedAccount {
                    platform: "Riot".to_string(),
                    account_id: "riot123".to_string(),
                    verified: false,
                    image_url: String::new(),
                },
            ],
            achievements: vec![achievement("1", "General", 1, 1), achievement("2", "CS:GO", 3, 25)],
            reputation: 850,
            game_stats: vec![GameStats {
                game: "Valorant".to_string(),
                stats: vec![
                    Stat { label: "Rank".to_string(), value: StatValue::Text("Gold II".to_string()) },
                    Stat { label: "Win Rate".to_string(), value: StatValue::Number(54.0) },
                ],
            }],
            featured_badges: vec!["2".to_string(), "missing".to_string()],
        }
    }

    #[test]
    fn test_featured_resolves_to_achievements() {
        let mut p = profile();
        let featured = p.featured();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].id, "2");

        p.feature_badge("1").unwrap();
        p.feature_badge("1").unwrap();
        assert_eq!(p.featured().len(), 2);
        assert!(p.feature_badge("nope").is_err());

        p.unfeature_badge("2");
        assert_eq!(p.featured()[0].id, "1");
    }

    #[test]
    fn test_riot_bridge() {
        let p = profile();
        assert_eq!(p.riot_id(), Some("riot123"));
        let on_chain = p.to_user_profile().unwrap();
        assert!(p.matches_on_chain(&on_chain));
        assert!(!p.matches_on_chain(&UserProfile::default()));
        assert_eq!(p.verified_accounts().count(), 1);
        assert_eq!(p.progress().percent(), 50);
    }

    #[test]
    fn test_stat_values_untagged() {
        let json = serde_json::to_value(&profile().game_stats[0]).unwrap();
        assert_eq!(json["stats"][0]["value"], "Gold II");
        assert_eq!(json["stats"][1]["value"], 54.0);
    }
}
