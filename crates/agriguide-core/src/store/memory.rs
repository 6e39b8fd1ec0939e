//! In-process store for tests and single-instance deployments

use chrono::Utc;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{ChatSession, ChatTurn, CommunityStore, ProfileStore, Store};
use crate::community::{CommunityPost, PostComment, PostStats};
use crate::error::{Error, Result};
use crate::profiles::UserProfile;

#[derive(Default)]
struct State {
    sessions: HashMap<String, SessionEntry>,
    tips: HashMap<String, CachedTip>,
    profiles: HashMap<String, UserProfile>,
    posts: HashMap<String, PostEntry>,
    next_post_seq: u64,
}

struct SessionEntry {
    session: ChatSession,
    turns: Vec<ChatTurn>,
}

struct CachedTip {
    tip: String,
    expires_at: Instant,
}

struct PostEntry {
    /// Insertion order, breaks ties between equal timestamps
    seq: u64,
    post: CommunityPost,
    likes: HashSet<String>,
    comments: Vec<PostComment>,
}

/// Everything held in one lock-protected state
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn open(&self, user: &str, session_id: Option<&str>) -> Result<ChatSession> {
        let session_id = session_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut state = self.state.write().await;
        if let Some(entry) = state.sessions.get(&session_id) {
            if entry.session.user != user {
                return Err(Error::SessionConflict(session_id));
            }
            return Ok(entry.session.clone());
        }

        debug!("Creating session {} for {}", session_id, user);
        let session = ChatSession::new(session_id.clone(), user);
        state.sessions.insert(
            session_id,
            SessionEntry {
                session: session.clone(),
                turns: Vec::new(),
            },
        );
        Ok(session)
    }

    async fn append(&self, session_id: &str, turn: ChatTurn) -> Result<()> {
        let mut state = self.state.write().await;
        let entry = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        entry.session.updated_at = Utc::now();
        entry.turns.push(turn);
        Ok(())
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
        let state = self.state.read().await;
        let turns = match state.sessions.get(session_id) {
            Some(entry) => {
                let start = entry.turns.len().saturating_sub(limit);
                entry.turns[start..].to_vec()
            }
            None => Vec::new(),
        };
        Ok(turns)
    }

    async fn clear(&self, user: &str, session_id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let owned = state
            .sessions
            .get(session_id)
            .map_or(false, |e| e.session.user == user);
        if owned {
            state.sessions.remove(session_id);
        }
        Ok(owned)
    }

    async fn tip(&self, key: &str) -> Result<Option<String>> {
        let state = self.state.read().await;
        Ok(state
            .tips
            .get(key)
            .filter(|cached| cached.expires_at > Instant::now())
            .map(|cached| cached.tip.clone()))
    }

    async fn put_tip(&self, key: &str, tip: &str, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.write().await;
        state.tips.retain(|_, cached| cached.expires_at > now);
        state.tips.insert(
            key.to_string(),
            CachedTip {
                tip: tip.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn load_profile(&self, user: &str) -> Result<Option<UserProfile>> {
        let state = self.state.read().await;
        Ok(state.profiles.get(user).cloned())
    }

    async fn store_profile(&self, profile: UserProfile) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(phone) = &profile.phone_number {
            let taken = state.profiles.values().any(|p| {
                p.username != profile.username && p.phone_number.as_ref() == Some(phone)
            });
            if taken {
                return Err(Error::PhoneNumberTaken(phone.clone()));
            }
        }
        state.profiles.insert(profile.username.clone(), profile);
        Ok(())
    }

    async fn insert_post(&self, post: CommunityPost) -> Result<()> {
        let mut state = self.state.write().await;
        let seq = state.next_post_seq;
        state.next_post_seq += 1;
        state.posts.insert(
            post.id.clone(),
            PostEntry {
                seq,
                post,
                likes: HashSet::new(),
                comments: Vec::new(),
            },
        );
        Ok(())
    }

    async fn newest_posts(&self, limit: usize) -> Result<Vec<CommunityPost>> {
        let state = self.state.read().await;
        let mut entries: Vec<&PostEntry> = state.posts.values().collect();
        entries.sort_by(|a, b| (b.post.created_at, b.seq).cmp(&(a.post.created_at, a.seq)));
        Ok(entries
            .into_iter()
            .take(limit)
            .map(|e| e.post.clone())
            .collect())
    }

    async fn post(&self, post_id: &str) -> Result<Option<CommunityPost>> {
        let state = self.state.read().await;
        Ok(state.posts.get(post_id).map(|e| e.post.clone()))
    }

    async fn remove_post(&self, post_id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.posts.remove(post_id).is_some())
    }

    async fn like(&self, post_id: &str, user: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let entry = state
            .posts
            .get_mut(post_id)
            .ok_or_else(|| Error::PostNotFound(post_id.to_string()))?;

        if entry.likes.remove(user) {
            Ok(false)
        } else {
            entry.likes.insert(user.to_string());
            Ok(true)
        }
    }

    async fn stats(&self, post_id: &str, viewer: &str) -> Result<PostStats> {
        let state = self.state.read().await;
        let entry = state
            .posts
            .get(post_id)
            .ok_or_else(|| Error::PostNotFound(post_id.to_string()))?;

        Ok(PostStats {
            likes_count: entry.likes.len() as u64,
            comments_count: entry.comments.len() as u64,
            is_liked: entry.likes.contains(viewer),
        })
    }

    async fn push_comment(&self, comment: PostComment) -> Result<()> {
        let mut state = self.state.write().await;
        let entry = state
            .posts
            .get_mut(&comment.post_id)
            .ok_or_else(|| Error::PostNotFound(comment.post_id.clone()))?;
        entry.comments.push(comment);
        Ok(())
    }

    async fn post_comments(&self, post_id: &str) -> Result<Vec<PostComment>> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .get(post_id)
            .map(|e| e.comments.clone())
            .unwrap_or_default())
    }
}

impl Store for MemoryStore {
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

impl ProfileStore for MemoryStore {
    fn profile<'a>(&'a self, user: &'a str) -> BoxFuture<'a, Result<Option<UserProfile>>> {
        Box::pin(self.load_profile(user))
    }

    fn save_profile(&self, profile: UserProfile) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.store_profile(profile))
    }
}

impl CommunityStore for MemoryStore {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::Role;
    use chrono::Duration as ChronoDuration;

    async fn has_session(store: &MemoryStore, session_id: &str) -> bool {
        store.state.read().await.sessions.contains_key(session_id)
    }

    fn post(id: &str, minutes_ago: i64) -> CommunityPost {
        let at = Utc::now() - ChronoDuration::minutes(minutes_ago);
        CommunityPost {
            id: id.to_string(),
            author: "ama".to_string(),
            content: format!("post {}", id),
            tags: Vec::new(),
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_open_creates_then_reuses() {
        let store = MemoryStore::new();

        let created = store.open_session("ama", Some("s-1")).await.unwrap();
        assert_eq!(created.session_id, "s-1");
        assert_eq!(created.user, "ama");

        let reopened = store.open_session("ama", Some("s-1")).await.unwrap();
        assert_eq!(reopened, created);

        let generated = store.open_session("ama", None).await.unwrap();
        assert!(Uuid::parse_str(&generated.session_id).is_ok());
        assert_ne!(generated.session_id, created.session_id);
    }

    #[tokio::test]
    async fn test_session_owned_by_other_user() {
        let store = MemoryStore::new();
        store.open_session("ama", Some("s-1")).await.unwrap();

        let result = store.open_session("kwame", Some("s-1")).await;
        assert!(matches!(result, Err(Error::SessionConflict(_))));
        assert!(!store.clear_session("kwame", "s-1").await.unwrap());
        assert!(has_session(&store, "s-1").await);
    }

    #[tokio::test]
    async fn test_turns_are_ordered_and_limited() {
        let store = MemoryStore::new();
        store.open_session("ama", Some("s-1")).await.unwrap();

        for i in 0..7 {
            let role = if i % 2 == 0 { Role::User } else { Role::Model };
            store
                .append_turn("s-1", ChatTurn::new(role, format!("turn {}", i)))
                .await
                .unwrap();
        }

        let recent = store.recent_turns("s-1", 5).await.unwrap();
        let messages: Vec<_> = recent.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, ["turn 2", "turn 3", "turn 4", "turn 5", "turn 6"]);

        assert!(store.recent_turns("s-1", 0).await.unwrap().is_empty());
        assert!(store.recent_turns("unknown", 5).await.unwrap().is_empty());

        let state = store.state.read().await;
        let session = &state.sessions["s-1"].session;
        assert!(session.updated_at >= session.created_at);
    }

    #[tokio::test]
    async fn test_append_to_missing_session() {
        let store = MemoryStore::new();
        let result = store.append_turn("nope", ChatTurn::new(Role::User, "hi")).await;
        assert!(matches!(result, Err(Error::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_clear_session() {
        let store = MemoryStore::new();
        store.open_session("ama", Some("s-1")).await.unwrap();
        store
            .append_turn("s-1", ChatTurn::new(Role::User, "hello"))
            .await
            .unwrap();

        assert!(store.clear_session("ama", "s-1").await.unwrap());
        assert!(!store.clear_session("ama", "s-1").await.unwrap());
        assert!(!has_session(&store, "s-1").await);
        assert!(store.recent_turns("s-1", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tip_cache_expiry() {
        let store = MemoryStore::new();
        store
            .cache_tip("farming_tip_2026-10-16", "Mulch your beds.", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .cache_tip("expired", "Old tip.", Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(
            store.cached_tip("farming_tip_2026-10-16").await.unwrap().as_deref(),
            Some("Mulch your beds.")
        );
        assert_eq!(store.cached_tip("expired").await.unwrap(), None);
        assert_eq!(store.cached_tip("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_caching_a_tip_drops_expired_entries() {
        let store = MemoryStore::new();
        for day in 1..=5 {
            store
                .cache_tip(&format!("farming_tip_2026-10-0{}", day), "Old tip.", Duration::ZERO)
                .await
                .unwrap();
        }
        store
            .cache_tip("farming_tip_2026-10-16", "Fresh tip.", Duration::from_secs(60))
            .await
            .unwrap();

        let state = store.state.read().await;
        assert_eq!(state.tips.len(), 1);
        assert!(state.tips.contains_key("farming_tip_2026-10-16"));
    }

    #[tokio::test]
    async fn test_profile_phone_uniqueness() {
        let store = MemoryStore::new();
        let mut ama = UserProfile::new("ama");
        ama.phone_number = Some("+233201234567".into());
        store.save_profile(ama.clone()).await.unwrap();

        let mut kwame = UserProfile::new("kwame");
        kwame.phone_number = ama.phone_number.clone();
        assert!(matches!(
            store.save_profile(kwame.clone()).await,
            Err(Error::PhoneNumberTaken(_))
        ));

        ama.phone_number = Some("+233209999999".into());
        store.save_profile(ama).await.unwrap();
        store.save_profile(kwame).await.unwrap();
        assert_eq!(
            store.profile("kwame").await.unwrap().unwrap().phone_number.as_deref(),
            Some("+233201234567")
        );
    }

    #[tokio::test]
    async fn test_posts_likes_and_comments() {
        let store = MemoryStore::new();
        store.create_post(post("old", 30)).await.unwrap();
        store.create_post(post("new", 1)).await.unwrap();
        store.create_post(post("mid", 10)).await.unwrap();

        let ids: Vec<_> = store
            .recent_posts(2)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, ["new", "mid"]);

        assert!(store.toggle_like("mid", "kwame").await.unwrap());
        let comment = PostComment {
            id: "c-1".into(),
            post_id: "mid".into(),
            author: "kwame".into(),
            content: "Nice".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.add_comment(comment.clone()).await.unwrap();

        let stats = store.post_stats("mid", "kwame").await.unwrap();
        assert_eq!(
            stats,
            PostStats {
                likes_count: 1,
                comments_count: 1,
                is_liked: true,
            }
        );
        assert!(!store.post_stats("mid", "ama").await.unwrap().is_liked);

        assert!(store.delete_post("mid").await.unwrap());
        assert!(!store.delete_post("mid").await.unwrap());
        assert!(store.comments("mid").await.unwrap().is_empty());
        assert!(matches!(
            store.add_comment(comment).await,
            Err(Error::PostNotFound(_))
        ));
    }
}
