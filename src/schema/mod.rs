//! Shared Schema
//!
//! One definition per presentation entity. Pages and tools import these
//! instead of redeclaring their own shapes.
//!
//! ## Module Structure
//!
//! - `achievement`: badges, progress and category filters
//! - `profile`: gaming profile with linked accounts and featured badges
//! - `feed`: social posts, likes and comments
//! - `listing`: matchmaking rows over on-chain matches

pub mod achievement;
pub mod profile;
pub mod feed;
pub mod listing;

// Re-export key types
pub use achievement::{Achievement, AchievementError, AchievementProgress, CategoryFilter, Rarity};
pub use profile::{GameStats, GamingProfile, LinkedAccount, Stat, StatValue};
pub use feed::{Attachment, Comment, Feed, FeedError, Post};
pub use listing::{MatchFilter, MatchView, MAX_PLAYERS};
