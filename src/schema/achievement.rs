//! Achievements
//!
//! Badge progress tracking. A badge can be claimed once its progress
//! reaches the requirement.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Badge rarity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    /// Common.
    Common,
    /// Rare.
    Rare,
    /// Epic.
    Epic,
    /// Legendary.
    Legendary,
}

/// Achievement errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AchievementError {
    /// Progress below the requirement.
    #[error("achievement {id} not completed ({current}/{required})")]
    NotCompleted {
        /// Achievement id.
        id: String,
        /// Current progress.
        current: u32,
        /// Required progress.
        required: u32,
    },
    /// Badge already claimed.
    #[error("badge {0} already claimed")]
    AlreadyClaimed(String),
    /// No achievement with this id.
    #[error("unknown achievement {0}")]
    Unknown(String),
}

/// A badge and the caller's progress towards it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    /// Stable id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What to do.
    pub description: String,
    /// Progress needed to complete.
    pub required_progress: u32,
    /// Progress so far.
    pub current_progress: u32,
    /// Badge kind.
    pub badge_type: String,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Badge image.
    pub image_url: String,
    /// Game or platform category.
    pub category: String,
    /// Badge has been claimed.
    #[serde(default)]
    pub claimed: bool,
}

impl Achievement {
    /// Whether progress has reached the requirement.
    pub fn is_completed(&self) -> bool {
        self.current_progress >= self.required_progress
    }

    /// Progress bar fill, capped at 100.
    pub fn progress_percent(&self) -> f64 {
        if self.required_progress == 0 {
            return 100.0;
        }
        (self.current_progress as f64 * 100.0 / self.required_progress as f64).min(100.0)
    }

    /// Claim the badge.
    pub fn claim(&mut self) -> Result<(), AchievementError> {
        if !self.is_completed() {
            return Err(AchievementError::NotCompleted {
                id: self.id.clone(),
                current: self.current_progress,
                required: self.required_progress,
            });
        }
        if self.claimed {
            return Err(AchievementError::AlreadyClaimed(self.id.clone()));
        }
        self.current_progress = self.required_progress;
        self.claimed = true;
        Ok(())
    }
}

/// Completion summary over a set of achievements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AchievementProgress {
    /// Completed achievements.
    pub completed: usize,
    /// All achievements.
    pub total: usize,
}

impl AchievementProgress {
    /// Summarise a list.
    pub fn of(achievements: &[Achievement]) -> Self {
        Self {
            completed: achievements.iter().filter(|a| a.is_completed()).count(),
            total: achievements.len(),
        }
    }

    /// Completion rounded to a whole percent (0 for an empty list).
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.completed as f64 * 100.0 / self.total as f64).round() as u32
    }
}

/// Category filter for the achievement list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CategoryFilter {
    /// Every category.
    #[default]
    All,
    /// One category.
    Named(String),
}

impl CategoryFilter {
    /// Whether an achievement passes.
    pub fn matches(&self, achievement: &Achievement) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Named(category) => achievement.category == *category,
        }
    }

    /// Filter a list, keeping order.
    pub fn apply<'a>(&self, achievements: &'a [Achievement]) -> Vec<&'a Achievement> {
        achievements.iter().filter(|a| self.matches(a)).collect()
    }
}

impl FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == "All" { CategoryFilter::All } else { CategoryFilter::Named(s.to_string()) })
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("All"),
            CategoryFilter::Named(category) => f.write_str(category),
        }
    }
}

/// Distinct categories in first-seen order, prefixed with `All`.
pub fn categories(achievements: &[Achievement]) -> Vec<CategoryFilter> {
    let mut out = vec![CategoryFilter::All];
    for a in achievements {
        let named = CategoryFilter::Named(a.category.clone());
        if !out.contains(&named) {
            out.push(named);
        }
    }
    out
}

/// Claim a badge by id.
pub fn claim_badge(achievements: &mut [Achievement], id: &str) -> Result<(), AchievementError> {
    achievements
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or_else(|| AchievementError::Unknown(id.to_string()))?
        .claim()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn achievement(id: &str, category: &str, current: u32, required: u32) -> Achievement {
        Achievement {
            id: id.to_string(),
            name: format!("Badge {}", id),
            description: String::new(),
            required_progress: required,
            current_progress: current,
            badge_type: "Achievement".to_string(),
            rarity: Rarity::Rare,
            image_url: String::new(),
            category: category.to_string(),
            claimed: false,
        }
    }

    #[test]
    fn test_progress_percent_capped() {
        assert_eq!(achievement("1", "CS:GO", 18, 25).progress_percent(), 72.0);
        assert_eq!(achievement("2", "General", 5, 1).progress_percent(), 100.0);
        assert_eq!(achievement("3", "General", 0, 0).progress_percent(), 100.0);
    }

    #[test]
    fn test_summary_rounds() {
        let list = vec![
            achievement("1", "Platform", 1, 1),
            achievement("2", "Platform", 0, 1),
            achievement("3", "General", 2, 3),
        ];
        let progress = AchievementProgress::of(&list);
        assert_eq!((progress.completed, progress.total), (1, 3));
        assert_eq!(progress.percent(), 33);
        assert_eq!(AchievementProgress::of(&[]).percent(), 0);
    }

    #[test]
    fn test_claim_rules() {
        let mut list = vec![achievement("1", "Platform", 1, 1), achievement("2", "Platform", 0, 3)];
        assert!(claim_badge(&mut list, "1").is_ok());
        assert!(list[0].claimed);
        assert_eq!(claim_badge(&mut list, "1"), Err(AchievementError::AlreadyClaimed("1".to_string())));
        assert!(matches!(claim_badge(&mut list, "2"), Err(AchievementError::NotCompleted { current: 0, .. })));
        assert_eq!(claim_badge(&mut list, "9"), Err(AchievementError::Unknown("9".to_string())));
    }

    #[test]
    fn test_category_filter() {
        let list = vec![
            achievement("1", "Platform", 0, 1),
            achievement("2", "Valorant", 0, 1),
            achievement("3", "Platform", 0, 1),
        ];
        let filter: CategoryFilter = "Platform".parse().unwrap();
        let ids: Vec<_> = filter.apply(&list).iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(CategoryFilter::All.apply(&list).len(), 3);

        let cats = categories(&list);
        assert_eq!(cats.len(), 3);
        assert_eq!(cats[0].to_string(), "All");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(achievement("7", "CS:GO", 18, 25)).unwrap();
        assert_eq!(json["requiredProgress"], 25);
        assert_eq!(json["rarity"], "Rare");
    }
}
