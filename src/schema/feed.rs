//! Social Feed
//!
//! Posts, likes and comments, newest first. Likes are a per-account set,
//! so the count can never drift from who actually liked a post.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::chain::session::{SessionError, WalletSession};
use crate::contract::types::MatchId;
use crate::core::address::Address;

/// Feed errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// Blank post or comment.
    #[error("Post content cannot be empty")]
    EmptyContent,
    /// No post with this id.
    #[error("post {0} not found")]
    PostNotFound(Uuid),
    /// No wallet connected.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Something shared alongside a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    /// An earned badge.
    Achievement {
        /// Achievement id.
        achievement_id: String,
    },
    /// An on-chain match.
    Match {
        /// Match id.
        match_id: MatchId,
    },
    /// An image.
    Image {
        /// Image location.
        url: String,
    },
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment id.
    pub id: Uuid,
    /// Author.
    pub author: Address,
    /// Text.
    pub content: String,
    /// Posted at.
    pub timestamp: DateTime<Utc>,
}

/// A feed post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post id.
    pub id: Uuid,
    /// Author.
    pub author: Address,
    /// Text.
    pub content: String,
    /// Posted at.
    pub timestamp: DateTime<Utc>,
    /// Accounts that liked the post.
    pub liked_by: BTreeSet<Address>,
    /// Attachments.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Comments, oldest first.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    /// Like count.
    pub fn likes(&self) -> usize {
        self.liked_by.len()
    }

    /// Whether `account` liked the post.
    pub fn has_liked(&self, account: &Address) -> bool {
        self.liked_by.contains(account)
    }
}

/// The social feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feed {
    posts: Vec<Post>,
}

fn non_blank(content: &str) -> Result<String, FeedError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(FeedError::EmptyContent);
    }
    Ok(trimmed.to_string())
}

impl Feed {
    /// Empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts, newest first.
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// A post by id.
    pub fn post(&self, id: &Uuid) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == *id)
    }

    fn post_mut(&mut self, id: &Uuid) -> Result<&mut Post, FeedError> {
        self.posts.iter_mut().find(|p| p.id == *id).ok_or(FeedError::PostNotFound(*id))
    }

    /// Publish a post as the connected account.
    pub fn create_post(
        &mut self,
        session: &WalletSession,
        content: &str,
        attachments: Vec<Attachment>,
    ) -> Result<&Post, FeedError> {
        let author = session.require_account()?;
        let post = Post {
            id: Uuid::new_v4(),
            author,
            content: non_blank(content)?,
            timestamp: Utc::now(),
            liked_by: BTreeSet::new(),
            attachments,
            comments: Vec::new(),
        };
        self.posts.insert(0, post);
        Ok(&self.posts[0])
    }

    /// Insert an existing post, keeping newest-first order.
    pub fn insert(&mut self, post: Post) {
        let index = self.posts.partition_point(|p| p.timestamp > post.timestamp);
        self.posts.insert(index, post);
    }

    /// Like or unlike. Returns whether the post is now liked.
    pub fn toggle_like(&mut self, session: &WalletSession, post_id: &Uuid) -> Result<bool, FeedError> {
        let account = session.require_account()?;
        let post = self.post_mut(post_id)?;
        if post.liked_by.remove(&account) {
            Ok(false)
        } else {
            post.liked_by.insert(account);
            Ok(true)
        }
    }

    /// Comment on a post.
    pub fn add_comment(
        &mut self,
        session: &WalletSession,
        post_id: &Uuid,
        content: &str,
    ) -> Result<&Comment, FeedError> {
        let author = session.require_account()?;
        let content = non_blank(content)?;
        let post = self.post_mut(post_id)?;
        post.comments.push(Comment { id: Uuid::new_v4(), author, content, timestamp: Utc::now() });
        post.comments.last().ok_or(FeedError::PostNotFound(*post_id))
    }

    /// Posts by one author, newest first.
    pub fn by_author<'a>(&'a self, author: &'a Address) -> impl Iterator<Item = &'a Post> + 'a {
        self.posts.iter().filter(move |p| p.author == *author)
    }
}
