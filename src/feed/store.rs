//! The feed store used by the ingestion cycle.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::repository::{FeedRepository, PostRepository};
use super::types::{Feed, NewPost, Post};
use crate::db::Database;
use crate::{GatorError, Result};

/// Failure to create a post.
#[derive(Error, Debug)]
pub enum CreatePostError {
    /// A post with this URL already exists.
    #[error("duplicate post URL: {0}")]
    DuplicateUrl(String),

    /// Any other store failure.
    #[error(transparent)]
    Store(#[from] GatorError),
}

/// Storage operations needed to ingest feeds.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// The feed with the oldest `last_fetched_at`, never-fetched feeds first.
    async fn get_least_recently_fetched_feed(&self) -> Result<Option<Feed>>;

    /// Advance the feed's `last_fetched_at` to now and return the updated feed.
    async fn mark_feed_fetched(&self, feed_id: Uuid) -> Result<Feed>;

    /// Store a new post. Fails with [`CreatePostError::DuplicateUrl`] if the URL is taken.
    async fn create_post(&self, post: &NewPost) -> std::result::Result<Post, CreatePostError>;
}

/// [`FeedStore`] backed by the SQLite database.
#[derive(Debug, Clone)]
pub struct SqlFeedStore {
    db: Database,
}

impl SqlFeedStore {
    /// Wrap a database handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FeedStore for SqlFeedStore {
    async fn get_least_recently_fetched_feed(&self) -> Result<Option<Feed>> {
        FeedRepository::new(self.db.pool())
            .get_least_recently_fetched()
            .await
    }

    async fn mark_feed_fetched(&self, feed_id: Uuid) -> Result<Feed> {
        FeedRepository::new(self.db.pool())
            .mark_fetched(feed_id)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("feed {}", feed_id)))
    }

    async fn create_post(&self, post: &NewPost) -> std::result::Result<Post, CreatePostError> {
        PostRepository::new(self.db.pool())
            .create_if_absent(post)
            .await?
            .ok_or_else(|| CreatePostError::DuplicateUrl(post.url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::feed::types::NewFeed;

    async fn setup() -> (SqlFeedStore, Feed) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("kahya"))
            .await
            .unwrap();
        let feed = FeedRepository::new(db.pool())
            .create(&NewFeed::new("Feed", "https://a.example/rss", user.id))
            .await
            .unwrap();
        (SqlFeedStore::new(db), feed)
    }

    #[tokio::test]
    async fn test_mark_feed_fetched() {
        let (store, feed) = setup().await;

        let first = store.mark_feed_fetched(feed.id).await.unwrap();
        let second = store.mark_feed_fetched(feed.id).await.unwrap();

        assert!(first.last_fetched_at.is_some());
        assert!(second.last_fetched_at >= first.last_fetched_at);
    }

    #[tokio::test]
    async fn test_mark_missing_feed_is_not_found() {
        let (store, _) = setup().await;

        let result = store.mark_feed_fetched(Uuid::new_v4()).await;
        assert!(matches!(result, Err(GatorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_post_duplicate_is_typed() {
        let (store, feed) = setup().await;

        let post = NewPost::new(feed.id, "Hello", "https://a.example/hello");
        store.create_post(&post).await.unwrap();

        let again = NewPost::new(feed.id, "Hello", "https://a.example/hello");
        match store.create_post(&again).await {
            Err(CreatePostError::DuplicateUrl(url)) => assert_eq!(url, "https://a.example/hello"),
            other => panic!("expected duplicate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_post_other_failure_is_store_error() {
        let (store, _) = setup().await;

        let orphan = NewPost::new(Uuid::new_v4(), "Orphan", "https://a.example/orphan");
        assert!(matches!(
            store.create_post(&orphan).await,
            Err(CreatePostError::Store(_))
        ));
    }
}
