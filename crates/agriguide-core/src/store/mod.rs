//! Persistence for sessions, the tip cache, profiles and community posts
//!
//! Everything lives behind the [`Store`], [`ProfileStore`] and
//! [`CommunityStore`] traits so that state can be shared by several server
//! instances and survive restarts. [`MemoryStore`] keeps everything
//! in-process; [`RedisStore`] is the shared backend. Both implement all three.

mod memory;
mod redis_store;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::community::{CommunityPost, PostComment, PostStats};
use crate::config::{StorageConfig, StoreBackend};
use crate::error::Result;
use crate::genai::Role;
use crate::profiles::UserProfile;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// A conversation owned by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub session_id: String,
    pub user: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(session_id: impl Into<String>, user: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user: user.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// One persisted message of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(role: Role, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Persistence boundary for sessions, turns and cached tips
pub trait Store: Send + Sync {
    /// Return the caller's session with this id, creating it when unknown.
    ///
    /// Without an id a fresh UUID session is created. An id owned by another
    /// user fails with [`crate::Error::SessionConflict`].
    fn open_session<'a>(
        &'a self,
        user: &'a str,
        session_id: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ChatSession>>;

    /// Append a turn and bump the session's `updated_at`
    fn append_turn<'a>(
        &'a self,
        session_id: &'a str,
        turn: ChatTurn,
    ) -> BoxFuture<'a, Result<()>>;

    /// The last `limit` turns, oldest first
    fn recent_turns<'a>(
        &'a self,
        session_id: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<ChatTurn>>>;

    /// Delete a session and its turns; false when the user has no such session
    fn clear_session<'a>(
        &'a self,
        user: &'a str,
        session_id: &'a str,
    ) -> BoxFuture<'a, Result<bool>>;

    fn cached_tip<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

    fn cache_tip<'a>(
        &'a self,
        key: &'a str,
        tip: &'a str,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Profiles keyed by user name
pub trait ProfileStore: Send + Sync {
    fn profile<'a>(&'a self, user: &'a str) -> BoxFuture<'a, Result<Option<UserProfile>>>;

    /// Insert or replace a profile.
    ///
    /// Fails with [`crate::Error::PhoneNumberTaken`] when another user
    /// already holds the profile's phone number.
    fn save_profile(&self, profile: UserProfile) -> BoxFuture<'_, Result<()>>;
}

/// Posts, likes and comments of the community board
pub trait CommunityStore: Send + Sync {
    fn create_post(&self, post: CommunityPost) -> BoxFuture<'_, Result<()>>;

    /// Up to `limit` posts, newest first
    fn recent_posts(&self, limit: usize) -> BoxFuture<'_, Result<Vec<CommunityPost>>>;

    fn get_post<'a>(&'a self, post_id: &'a str) -> BoxFuture<'a, Result<Option<CommunityPost>>>;

    /// Remove a post with its likes and comments; false when unknown
    fn delete_post<'a>(&'a self, post_id: &'a str) -> BoxFuture<'a, Result<bool>>;

    /// Flip the user's like; returns whether the post is now liked.
    /// Unknown posts fail with [`crate::Error::PostNotFound`].
    fn toggle_like<'a>(&'a self, post_id: &'a str, user: &'a str) -> BoxFuture<'a, Result<bool>>;

    fn post_stats<'a>(
        &'a self,
        post_id: &'a str,
        viewer: &'a str,
    ) -> BoxFuture<'a, Result<PostStats>>;

    /// Unknown posts fail with [`crate::Error::PostNotFound`]
    fn add_comment(&self, comment: PostComment) -> BoxFuture<'_, Result<()>>;

    /// Comments of a post, oldest first
    fn comments<'a>(&'a self, post_id: &'a str) -> BoxFuture<'a, Result<Vec<PostComment>>>;
}

/// Handles to one backend, seen through each of its traits
#[derive(Clone)]
pub struct Stores {
    pub sessions: Arc<dyn Store>,
    pub profiles: Arc<dyn ProfileStore>,
    pub community: Arc<dyn CommunityStore>,
}

impl Stores {
    fn from_backend<S>(backend: S) -> Self
    where
        S: Store + ProfileStore + CommunityStore + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            sessions: backend.clone(),
            profiles: backend.clone(),
            community: backend,
        }
    }

    pub fn memory() -> Self {
        Self::from_backend(MemoryStore::new())
    }
}

/// Build the store selected by configuration
pub async fn connect(config: &StorageConfig) -> Result<Stores> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(Stores::memory())
        }
        StoreBackend::Redis => {
            info!("Connecting to Redis store at {}", config.redis_url);
            Ok(Stores::from_backend(
                RedisStore::connect(&config.redis_url).await?,
            ))
        }
    }
}
