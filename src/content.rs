//! Resource-owner lookups
//!
//! Protected routes read posts, hashtags and the follow graph of the account
//! decoded from the caller's token.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::models::{Account, AccountId, Follow, Hashtag, Post};

/// Content store errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ContentError {
    #[error("content store unavailable: {0}")]
    Unavailable(String),

    #[error("follow edge references unknown account {0}")]
    DanglingFollow(AccountId),
}

pub type ContentResult<T> = Result<T, ContentError>;

/// Account and content lookup
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find_account(&self, id: AccountId) -> ContentResult<Option<Account>>;

    /// Posts written by an account
    async fn posts_by_account(&self, id: AccountId) -> ContentResult<Vec<Post>>;

    async fn find_hashtag(&self, title: &str) -> ContentResult<Option<Hashtag>>;

    /// Posts tagged with a hashtag
    async fn posts_by_hashtag(&self, hashtag: &Hashtag) -> ContentResult<Vec<Post>>;

    /// Accounts following `id`
    async fn followers(&self, id: AccountId) -> ContentResult<Vec<Account>>;

    /// Accounts `id` follows
    async fn followings(&self, id: AccountId) -> ContentResult<Vec<Account>>;
}

/// In-memory content store (for development and testing)
#[derive(Default)]
pub struct InMemoryContentStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
    posts: RwLock<Vec<Post>>,
    follows: RwLock<Vec<Follow>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(accounts: Vec<Account>, posts: Vec<Post>, follows: Vec<Follow>) -> Self {
        Self {
            accounts: RwLock::new(accounts.into_iter().map(|a| (a.id, a)).collect()),
            posts: RwLock::new(posts),
            follows: RwLock::new(follows),
        }
    }

    fn resolve(&self, ids: impl Iterator<Item = AccountId>) -> ContentResult<Vec<Account>> {
        let accounts = self.accounts.read();
        ids.map(|id| {
            accounts.get(&id).cloned().ok_or(ContentError::DanglingFollow(id))
        })
        .collect()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn find_account(&self, id: AccountId) -> ContentResult<Option<Account>> {
        Ok(self.accounts.read().get(&id).cloned())
    }

    async fn posts_by_account(&self, id: AccountId) -> ContentResult<Vec<Post>> {
        Ok(self
            .posts
            .read()
            .iter()
            .filter(|p| p.user_id == id)
            .cloned()
            .collect())
    }

    async fn find_hashtag(&self, title: &str) -> ContentResult<Option<Hashtag>> {
        let known = self
            .posts
            .read()
            .iter()
            .any(|p| p.hashtags.iter().any(|t| t == title));

        Ok(known.then(|| Hashtag { title: title.to_string() }))
    }

    async fn posts_by_hashtag(&self, hashtag: &Hashtag) -> ContentResult<Vec<Post>> {
        Ok(self
            .posts
            .read()
            .iter()
            .filter(|p| p.hashtags.contains(&hashtag.title))
            .cloned()
            .collect())
    }

    async fn followers(&self, id: AccountId) -> ContentResult<Vec<Account>> {
        let ids: Vec<AccountId> = self
            .follows
            .read()
            .iter()
            .filter(|f| f.following_id == id)
            .map(|f| f.follower_id)
            .collect();
        self.resolve(ids.into_iter())
    }

    async fn followings(&self, id: AccountId) -> ContentResult<Vec<Account>> {
        let ids: Vec<AccountId> = self
            .follows
            .read()
            .iter()
            .filter(|f| f.follower_id == id)
            .map(|f| f.following_id)
            .collect();
        self.resolve(ids.into_iter())
    }
}
