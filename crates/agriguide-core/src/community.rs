//! Community posts with likes and comments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::CommunityStore;

pub const DEFAULT_FEED_LIMIT: usize = 20;
pub const MAX_FEED_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityPost {
    pub id: String,
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostComment {
    pub id: String,
    pub post_id: String,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Counters for one post as seen by one viewer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostStats {
    pub likes_count: u64,
    pub comments_count: u64,
    pub is_liked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: CommunityPost,
    #[serde(flatten)]
    pub stats: PostStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub struct CommunityService {
    store: Arc<dyn CommunityStore>,
}

impl CommunityService {
    pub fn new(store: Arc<dyn CommunityStore>) -> Self {
        Self { store }
    }

    pub async fn create_post(&self, author: &str, new_post: NewPost) -> Result<PostView> {
        let content = require_content(&new_post.content, "Post content is required")?;

        let mut tags: Vec<String> = Vec::new();
        for tag in new_post.tags.iter().map(|t| t.trim()) {
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        let now = Utc::now();
        let post = CommunityPost {
            id: Uuid::new_v4().to_string(),
            author: author.to_string(),
            content: content.to_string(),
            tags,
            created_at: now,
            updated_at: now,
        };
        self.store.create_post(post.clone()).await?;
        info!("{} published post {}", author, post.id);

        Ok(PostView {
            post,
            stats: PostStats::default(),
        })
    }

    /// Newest posts first
    pub async fn feed(&self, viewer: &str, limit: Option<usize>) -> Result<Vec<PostView>> {
        let limit = limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT);
        let posts = self.store.recent_posts(limit).await?;

        let mut views = Vec::with_capacity(posts.len());
        for post in posts {
            let stats = self.store.post_stats(&post.id, viewer).await?;
            views.push(PostView { post, stats });
        }
        Ok(views)
    }

    pub async fn post(&self, viewer: &str, post_id: &str) -> Result<PostView> {
        let post = self.find(post_id).await?;
        let stats = self.store.post_stats(post_id, viewer).await?;
        Ok(PostView { post, stats })
    }

    /// Only the author may delete a post
    pub async fn delete_post(&self, user: &str, post_id: &str) -> Result<()> {
        let post = self.find(post_id).await?;
        if post.author != user {
            return Err(Error::Forbidden(
                "You can only delete your own posts".to_string(),
            ));
        }
        self.store.delete_post(post_id).await?;
        info!("{} deleted post {}", user, post_id);
        Ok(())
    }

    /// Like the post, or remove an existing like
    pub async fn toggle_like(&self, user: &str, post_id: &str) -> Result<LikeOutcome> {
        let liked = self.store.toggle_like(post_id, user).await?;
        let stats = self.store.post_stats(post_id, user).await?;
        Ok(LikeOutcome {
            liked,
            likes_count: stats.likes_count,
        })
    }

    pub async fn add_comment(
        &self,
        user: &str,
        post_id: &str,
        content: &str,
    ) -> Result<PostComment> {
        let content = require_content(content, "Comment content is required")?;

        let now = Utc::now();
        let comment = PostComment {
            id: Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            author: user.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.add_comment(comment.clone()).await?;
        Ok(comment)
    }

    /// Comments of a post, oldest first
    pub async fn comments(&self, post_id: &str) -> Result<Vec<PostComment>> {
        self.find(post_id).await?;
        self.store.comments(post_id).await
    }

    async fn find(&self, post_id: &str) -> Result<CommunityPost> {
        self.store
            .get_post(post_id)
            .await?
            .ok_or_else(|| Error::PostNotFound(post_id.to_string()))
    }
}

fn require_content<'a>(content: &'a str, msg: &str) -> Result<&'a str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::InvalidRequest(msg.to_string()));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> CommunityService {
        CommunityService::new(Arc::new(MemoryStore::new()))
    }

    fn new_post(content: &str) -> NewPost {
        NewPost {
            content: content.to_string(),
            tags: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_and_feed_newest_first() {
        let service = service();
        let first = service
            .create_post("ama", new_post("Rains came early"))
            .await
            .unwrap();
        let second = service
            .create_post(
                "kwame",
                NewPost {
                    content: "  Anyone tried drip irrigation? ".to_string(),
                    tags: vec![" water ".into(), "".into(), "water".into(), "tools".into()],
                },
            )
            .await
            .unwrap();

        assert_eq!(second.post.content, "Anyone tried drip irrigation?");
        assert_eq!(second.post.tags, vec!["water", "tools"]);

        let feed = service.feed("ama", None).await.unwrap();
        let ids: Vec<_> = feed.iter().map(|v| v.post.id.as_str()).collect();
        assert_eq!(ids, [second.post.id.as_str(), first.post.id.as_str()]);

        assert_eq!(service.feed("ama", Some(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_like_toggles_and_counts() {
        let service = service();
        let post = service
            .create_post("ama", new_post("Harvest day"))
            .await
            .unwrap();
        let id = &post.post.id;

        let liked = service.toggle_like("kwame", id).await.unwrap();
        assert_eq!(
            liked,
            LikeOutcome {
                liked: true,
                likes_count: 1,
            }
        );
        service.toggle_like("ama", id).await.unwrap();

        let view = service.post("kwame", id).await.unwrap();
        assert_eq!(view.stats.likes_count, 2);
        assert!(view.stats.is_liked);

        let unliked = service.toggle_like("kwame", id).await.unwrap();
        assert_eq!(
            unliked,
            LikeOutcome {
                liked: false,
                likes_count: 1,
            }
        );
        assert!(!service.post("kwame", id).await.unwrap().stats.is_liked);
    }

    #[tokio::test]
    async fn test_comments_in_order() {
        let service = service();
        let post = service
            .create_post("ama", new_post("Which maize seed?"))
            .await
            .unwrap();
        let id = &post.post.id;

        service.add_comment("kwame", id, "Obatanpa").await.unwrap();
        service.add_comment("esi", id, " Try hybrid ").await.unwrap();

        let comments = service.comments(id).await.unwrap();
        let texts: Vec<_> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, ["Obatanpa", "Try hybrid"]);
        assert_eq!(service.post("ama", id).await.unwrap().stats.comments_count, 2);

        assert!(matches!(
            service.add_comment("esi", id, "   ").await,
            Err(Error::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_post() {
        let service = service();
        assert!(matches!(
            service.post("ama", "nope").await,
            Err(Error::PostNotFound(_))
        ));
        assert!(matches!(
            service.toggle_like("ama", "nope").await,
            Err(Error::PostNotFound(_))
        ));
        assert!(matches!(
            service.add_comment("ama", "nope", "hi").await,
            Err(Error::PostNotFound(_))
        ));
        assert!(matches!(
            service.comments("nope").await,
            Err(Error::PostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_only_author_deletes() {
        let service = service();
        let post = service
            .create_post("ama", new_post("Selling seedlings"))
            .await
            .unwrap();
        let id = &post.post.id;
        service.add_comment("kwame", id, "How much?").await.unwrap();

        assert!(matches!(
            service.delete_post("kwame", id).await,
            Err(Error::Forbidden(_))
        ));
        service.delete_post("ama", id).await.unwrap();
        assert!(matches!(
            service.post("ama", id).await,
            Err(Error::PostNotFound(_))
        ));
        assert!(service.feed("ama", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_post_rejected() {
        assert!(matches!(
            service().create_post("ama", new_post(" ")).await,
            Err(Error::InvalidRequest(_))
        ));
    }
}
