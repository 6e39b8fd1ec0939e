//! Redis-backed store shared by every server instance
//!
//! Layout:
//! - `agriguide:session:<id>`: JSON [`ChatSession`]
//! - `agriguide:session:<id>:turns`: list of JSON [`ChatTurn`], oldest first
//! - `agriguide:tip:<key>`: cached tip text with an expiry
//! - `agriguide:profile:<user>`: JSON [`UserProfile`]
//! - `agriguide:phone:<number>`: user name holding that phone number
//! - `agriguide:posts`: sorted set of post ids scored by creation millis
//! - `agriguide:post:<id>`: JSON [`CommunityPost`]
//! - `agriguide:post:<id>:likes`: set of user names
//! - `agriguide:post:<id>:comments`: list of JSON [`PostComment`], oldest first

use chrono::Utc;
use futures::future::BoxFuture;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ChatSession, ChatTurn, CommunityStore, ProfileStore, Store};
use crate::community::{CommunityPost, PostComment, PostStats};
use crate::error::{Error, Result};
use crate::profiles::UserProfile;

const KEY_PREFIX: &str = "agriguide";

fn session_key(session_id: &str) -> String {
    format!("{}:session:{}", KEY_PREFIX, session_id)
}

fn turns_key(session_id: &str) -> String {
    format!("{}:session:{}:turns", KEY_PREFIX, session_id)
}

fn tip_key(key: &str) -> String {
    format!("{}:tip:{}", KEY_PREFIX, key)
}

fn profile_key(user: &str) -> String {
    format!("{}:profile:{}", KEY_PREFIX, user)
}

fn phone_key(number: &str) -> String {
    format!("{}:phone:{}", KEY_PREFIX, number)
}

fn posts_key() -> String {
    format!("{}:posts", KEY_PREFIX)
}

fn post_key(post_id: &str) -> String {
    format!("{}:post:{}", KEY_PREFIX, post_id)
}

fn likes_key(post_id: &str) -> String {
    format!("{}:post:{}:likes", KEY_PREFIX, post_id)
}

fn comments_key(post_id: &str) -> String {
    format!("{}:post:{}:comments", KEY_PREFIX, post_id)
}

fn from_json<T: serde::de::DeserializeOwned>(raw: Option<String>) -> Result<Option<T>> {
    raw.map(|json| serde_json::from_str(&json).map_err(Error::from))
        .transpose()
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        info!("Connected to Redis");
        Ok(Self { connection })
    }

    async fn load_session(&self, session_id: &str) -> Result<Option<ChatSession>> {
        let mut con = self.connection.clone();
        let raw: Option<String> = con.get(session_key(session_id)).await?;
        from_json(raw)
    }

    async fn open(&self, user: &str, session_id: Option<&str>) -> Result<ChatSession> {
        let session_id = session_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Some(existing) = self.load_session(&session_id).await? {
            return owned_by(existing, user);
        }

        let session = ChatSession::new(session_id.clone(), user);
        let mut con = self.connection.clone();
        let created: Option<String> = redis::cmd("SET")
            .arg(session_key(&session_id))
            .arg(serde_json::to_string(&session)?)
            .arg("NX")
            .query_async(&mut con)
            .await?;

        if created.is_some() {
            debug!("Created session {} for {}", session_id, user);
            return Ok(session);
        }

        // lost a creation race; whoever won owns it
        match self.load_session(&session_id).await? {
            Some(existing) => owned_by(existing, user),
            None => Err(Error::StorageError(format!(
                "session {} vanished during creation",
                session_id
            ))),
        }
    }

    async fn append(&self, session_id: &str, turn: ChatTurn) -> Result<()> {
        let mut session = self
            .load_session(session_id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        session.updated_at = Utc::now();

        let mut con = self.connection.clone();
        let _: () = redis::pipe()
            .atomic()
            .rpush(turns_key(session_id), serde_json::to_string(&turn)?)
            .ignore()
            .set(session_key(session_id), serde_json::to_string(&session)?)
            .ignore()
            .query_async(&mut con)
            .await?;
        Ok(())
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut con = self.connection.clone();
        let start = -(limit.min(isize::MAX as usize) as isize);
        let raw: Vec<String> = con.lrange(turns_key(session_id), start, -1).await?;
        raw.iter()
            .map(|json| serde_json::from_str(json).map_err(Error::from))
            .collect()
    }

    async fn clear(&self, user: &str, session_id: &str) -> Result<bool> {
        match self.load_session(session_id).await? {
            Some(session) if session.user == user => {
                let mut con = self.connection.clone();
                let _: () = con
                    .del(vec![session_key(session_id), turns_key(session_id)])
                    .await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn tip(&self, key: &str) -> Result<Option<String>> {
        let mut con = self.connection.clone();
        let tip: Option<String> = con.get(tip_key(key)).await?;
        Ok(tip)
    }

    async fn put_tip(&self, key: &str, tip: &str, ttl: Duration) -> Result<()> {
        let mut con = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(tip_key(key))
            .arg(tip)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut con)
            .await?;
        Ok(())
    }

    async fn load_profile(&self, user: &str) -> Result<Option<UserProfile>> {
        let mut con = self.connection.clone();
        let raw: Option<String> = con.get(profile_key(user)).await?;
        from_json(raw)
    }

    async fn claim_phone(&self, number: &str, user: &str) -> Result<()> {
        let mut con = self.connection.clone();
        let claimed: Option<String> = redis::cmd("SET")
            .arg(phone_key(number))
            .arg(user)
            .arg("NX")
            .query_async(&mut con)
            .await?;
        if claimed.is_some() {
            return Ok(());
        }

        let holder: Option<String> = con.get(phone_key(number)).await?;
        match holder {
            Some(holder) if holder != user => Err(Error::PhoneNumberTaken(number.to_string())),
            _ => Ok(()),
        }
    }

    async fn store_profile(&self, profile: UserProfile) -> Result<()> {
        let previous = self
            .load_profile(&profile.username)
            .await?
            .and_then(|p| p.phone_number);

        if let Some(number) = &profile.phone_number {
            self.claim_phone(number, &profile.username).await?;
        }

        let mut con = self.connection.clone();
        let _: () = con
            .set(profile_key(&profile.username), serde_json::to_string(&profile)?)
            .await?;

        if let Some(old) = previous.filter(|old| profile.phone_number.as_ref() != Some(old)) {
            debug!("Releasing phone number of {}", profile.username);
            let _: () = con.del(phone_key(&old)).await?;
        }
        Ok(())
    }

    async fn post_exists(&self, post_id: &str) -> Result<bool> {
        let mut con = self.connection.clone();
        Ok(con.exists(post_key(post_id)).await?)
    }

    async fn insert_post(&self, post: CommunityPost) -> Result<()> {
        let mut con = self.connection.clone();
        let _: () = redis::pipe()
            .atomic()
            .set(post_key(&post.id), serde_json::to_string(&post)?)
            .ignore()
            .zadd(posts_key(), &post.id, post.created_at.timestamp_millis())
            .ignore()
            .query_async(&mut con)
            .await?;
        Ok(())
    }

    async fn newest_posts(&self, limit: usize) -> Result<Vec<CommunityPost>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut con = self.connection.clone();
        let stop = limit.min(isize::MAX as usize) as isize - 1;
        let ids: Vec<String> = con.zrevrange(posts_key(), 0, stop).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| post_key(id)).collect();
        let raw: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut con)
            .await?;

        // ids whose post was deleted meanwhile are skipped
        let mut posts = Vec::with_capacity(raw.len());
        for json in raw.into_iter().flatten() {
            posts.push(serde_json::from_str(&json)?);
        }
        Ok(posts)
    }

    async fn post(&self, post_id: &str) -> Result<Option<CommunityPost>> {
        let mut con = self.connection.clone();
        let raw: Option<String> = con.get(post_key(post_id)).await?;
        from_json(raw)
    }

    async fn remove_post(&self, post_id: &str) -> Result<bool> {
        let mut con = self.connection.clone();
        let (removed,): (u64,) = redis::pipe()
            .atomic()
            .del(post_key(post_id))
            .zrem(posts_key(), post_id)
            .ignore()
            .del(vec![likes_key(post_id), comments_key(post_id)])
            .ignore()
            .query_async(&mut con)
            .await?;
        Ok(removed > 0)
    }

    async fn like(&self, post_id: &str, user: &str) -> Result<bool> {
        if !self.post_exists(post_id).await? {
            return Err(Error::PostNotFound(post_id.to_string()));
        }

        let mut con = self.connection.clone();
        let added: u64 = con.sadd(likes_key(post_id), user).await?;
        if added > 0 {
            return Ok(true);
        }
        let _: () = con.srem(likes_key(post_id), user).await?;
        Ok(false)
    }

    async fn stats(&self, post_id: &str, viewer: &str) -> Result<PostStats> {
        if !self.post_exists(post_id).await? {
            return Err(Error::PostNotFound(post_id.to_string()));
        }

        let mut con = self.connection.clone();
        let (likes_count, comments_count, is_liked): (u64, u64, bool) = redis::pipe()
            .scard(likes_key(post_id))
            .llen(comments_key(post_id))
            .sismember(likes_key(post_id), viewer)
            .query_async(&mut con)
            .await?;

        Ok(PostStats {
            likes_count,
            comments_count,
            is_liked,
        })
    }

    async fn push_comment(&self, comment: PostComment) -> Result<()> {
        if !self.post_exists(&comment.post_id).await? {
            return Err(Error::PostNotFound(comment.post_id));
        }

        let mut con = self.connection.clone();
        let _: () = con
            .rpush(comments_key(&comment.post_id), serde_json::to_string(&comment)?)
            .await?;
        Ok(())
    }

    async fn post_comments(&self, post_id: &str) -> Result<Vec<PostComment>> {
        let mut con = self.connection.clone();
        let raw: Vec<String> = con.lrange(comments_key(post_id), 0, -1).await?;
        raw.iter()
            .map(|json| serde_json::from_str(json).map_err(Error::from))
            .collect()
    }
}

fn owned_by(session: ChatSession, user: &str) -> Result<ChatSession> {
    if session.user == user {
        Ok(session)
    } else {
        Err(Error::SessionConflict(session.session_id))
    }
}

impl Store for RedisStore {
    fn open_session<'a>(
        &'a self,
        user: &'a str,
        session_id: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ChatSession>> {
        Box::pin(self.open(user, session_id))
    }

    fn append_turn<'a>(
        &'a self,
        session_id: &'a str,
        turn: ChatTurn,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.append(session_id, turn))
    }

    fn recent_turns<'a>(
        &'a self,
        session_id: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<ChatTurn>>> {
        Box::pin(self.recent(session_id, limit))
    }

    fn clear_session<'a>(
        &'a self,
        user: &'a str,
        session_id: &'a str,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(self.clear(user, session_id))
    }

    fn cached_tip<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(self.tip(key))
    }

    fn cache_tip<'a>(
        &'a self,
        key: &'a str,
        tip: &'a str,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.put_tip(key, tip, ttl))
    }
}

impl ProfileStore for RedisStore {
    fn profile<'a>(&'a self, user: &'a str) -> BoxFuture<'a, Result<Option<UserProfile>>> {
        Box::pin(self.load_profile(user))
    }

    fn save_profile(&self, profile: UserProfile) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.store_profile(profile))
    }
}

impl CommunityStore for RedisStore {
    fn create_post(&self, post: CommunityPost) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.insert_post(post))
    }

    fn recent_posts(&self, limit: usize) -> BoxFuture<'_, Result<Vec<CommunityPost>>> {
        Box::pin(self.newest_posts(limit))
    }

    fn get_post<'a>(&'a self, post_id: &'a str) -> BoxFuture<'a, Result<Option<CommunityPost>>> {
        Box::pin(self.post(post_id))
    }

    fn delete_post<'a>(&'a self, post_id: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(self.remove_post(post_id))
    }

    fn toggle_like<'a>(&'a self, post_id: &'a str, user: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(self.like(post_id, user))
    }

    fn post_stats<'a>(
        &'a self,
        post_id: &'a str,
        viewer: &'a str,
    ) -> BoxFuture<'a, Result<PostStats>> {
        Box::pin(self.stats(post_id, viewer))
    }

    fn add_comment(&self, comment: PostComment) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.push_comment(comment))
    }

    fn comments<'a>(&'a self, post_id: &'a str) -> BoxFuture<'a, Result<Vec<PostComment>>> {
        Box::pin(self.post_comments(post_id))
    }
}
