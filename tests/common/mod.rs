//! Test helpers for integration tests.
//!
//! Provides an in-memory feed store with failure injection, a scripted feed
//! source, and database seeding helpers.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use gator::feed::{FeedFollowRepository, FeedRepository, NewFeed};
use gator::{
    CreatePostError, Database, Feed, FeedSource, FeedStore, FetchError, FetchedFeedDocument,
    FetchedItem, GatorError, NewPost, NewUser, Post, Result, User, UserRepository,
};

/// Publish date in the format sources are expected to use.
pub const VALID_PUB_DATE: &str = "Mon, 02 Jan 2006 15:04:05 -0700";

#[derive(Default)]
struct MemoryState {
    feeds: Vec<Feed>,
    posts: Vec<Post>,
    fail_select: bool,
    fail_mark: bool,
    failing_urls: HashSet<String>,
}

/// In-memory [`FeedStore`] whose operations can be made to fail.
#[derive(Clone, Default)]
pub struct MemoryFeedStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a never-fetched feed.
    pub fn add_feed(&self, name: &str, url: &str) -> Feed {
        let now = Utc::now();
        let feed = Feed {
            id: Uuid::new_v4(),
            name: name.to_string(),
            url: url.to_string(),
            user_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            last_fetched_at: None,
        };
        self.state.lock().unwrap().feeds.push(feed.clone());
        feed
    }

    pub fn feed(&self, id: Uuid) -> Option<Feed> {
        let state = self.state.lock().unwrap();
        state.feeds.iter().find(|f| f.id == id).cloned()
    }

    pub fn set_last_fetched(&self, id: Uuid, at: chrono::DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        if let Some(feed) = state.feeds.iter_mut().find(|f| f.id == id) {
            feed.last_fetched_at = Some(at);
        }
    }

    pub fn posts(&self) -> Vec<Post> {
        self.state.lock().unwrap().posts.clone()
    }

    pub fn fail_select(&self, fail: bool) {
        self.state.lock().unwrap().fail_select = fail;
    }

    pub fn fail_mark(&self, fail: bool) {
        self.state.lock().unwrap().fail_mark = fail;
    }

    /// Make `create_post` fail with a store error for this URL.
    pub fn fail_post(&self, url: &str) {
        self.state.lock().unwrap().failing_urls.insert(url.to_string());
    }
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn get_least_recently_fetched_feed(&self) -> Result<Option<Feed>> {
        let state = self.state.lock().unwrap();
        if state.fail_select {
            return Err(GatorError::Database("store unavailable".to_string()));
        }
        // None sorts before Some, matching NULLS FIRST.
        Ok(state.feeds.iter().min_by_key(|f| f.last_fetched_at).cloned())
    }

    async fn mark_feed_fetched(&self, feed_id: Uuid) -> Result<Feed> {
        let mut state = self.state.lock().unwrap();
        if state.fail_mark {
            return Err(GatorError::Database("store unavailable".to_string()));
        }
        let feed = state
            .feeds
            .iter_mut()
            .find(|f| f.id == feed_id)
            .ok_or_else(|| GatorError::NotFound(format!("feed {}", feed_id)))?;
        let now = Utc::now();
        feed.last_fetched_at = Some(feed.last_fetched_at.map_or(now, |prev| prev.max(now)));
        feed.updated_at = now;
        Ok(feed.clone())
    }

    async fn create_post(&self, post: &NewPost) -> std::result::Result<Post, CreatePostError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_urls.contains(&post.url) {
            return Err(GatorError::Database("disk I/O error".to_string()).into());
        }
        if state.posts.iter().any(|p| p.url == post.url) {
            return Err(CreatePostError::DuplicateUrl(post.url.clone()));
        }
        let now = Utc::now();
        let created = Post {
            id: post.id,
            feed_id: post.feed_id,
            title: post.title.clone(),
            url: post.url.clone(),
            description: post.description.clone(),
            published_at: post.published_at,
            created_at: now,
            updated_at: now,
        };
        state.posts.push(created.clone());
        Ok(created)
    }
}

/// [`FeedSource`] that replays scripted responses and records requested URLs.
///
/// Once the script is exhausted, the fallback response is returned.
#[derive(Clone)]
pub struct ScriptedSource {
    script: Arc<Mutex<VecDeque<std::result::Result<FetchedFeedDocument, FetchError>>>>,
    fallback: std::result::Result<FetchedFeedDocument, FetchError>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSource {
    /// Always return the given items.
    pub fn always(items: Vec<FetchedItem>) -> Self {
        Self::with_fallback(Ok(document(items)))
    }

    /// Always fail with a retrieval error.
    pub fn failing() -> Self {
        Self::with_fallback(Err(FetchError::Retrieval("connection refused".to_string())))
    }

    pub fn with_fallback(fallback: std::result::Result<FetchedFeedDocument, FetchError>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a response for the next fetch.
    pub fn push(&self, response: std::result::Result<FetchedFeedDocument, FetchError>) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedFeedDocument, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Build a document containing the given items.
pub fn document(items: Vec<FetchedItem>) -> FetchedFeedDocument {
    FetchedFeedDocument {
        title: "Test Feed".to_string(),
        description: "A feed used in tests".to_string(),
        items,
    }
}

/// An item with a valid publish date.
pub fn dated_item(link: &str) -> FetchedItem {
    FetchedItem::new(link, VALID_PUB_DATE).with_title(format!("Post at {}", link))
}

/// Create an in-memory database.
pub async fn setup_db() -> Database {
    Database::open_in_memory().await.unwrap()
}

/// Create a user.
pub async fn create_user(db: &Database, name: &str) -> User {
    UserRepository::new(db.pool())
        .create(&NewUser::new(name))
        .await
        .unwrap()
}

/// Create a feed owned and followed by `user`.
pub async fn create_feed(db: &Database, user: &User, name: &str, url: &str) -> Feed {
    let feed = FeedRepository::new(db.pool())
        .create(&NewFeed::new(name, url, user.id))
        .await
        .unwrap();
    FeedFollowRepository::new(db.pool())
        .create(user.id, feed.id)
        .await
        .unwrap();
    feed
}
