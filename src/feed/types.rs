//! Feed, follow and post types for Gator.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A followed syndication source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Feed ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Feed URL (unique).
    pub url: String,
    /// Owning user.
    pub user_id: Uuid,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed was last updated.
    pub updated_at: DateTime<Utc>,
    /// Last time the feed was picked by the ingestion cycle. `None` means never.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Owning user.
    pub user_id: Uuid,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

/// A feed together with its owner's name, for listings.
#[derive(Debug, Clone)]
pub struct FeedWithOwner {
    /// The feed.
    pub feed: Feed,
    /// Name of the owning user.
    pub owner_name: String,
}

/// A user following a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFollow {
    /// Follow ID.
    pub id: Uuid,
    /// Following user.
    pub user_id: Uuid,
    /// Followed feed.
    pub feed_id: Uuid,
    /// Name of the following user.
    pub user_name: String,
    /// Name of the followed feed.
    pub feed_name: String,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
    /// When the follow was last updated.
    pub updated_at: DateTime<Utc>,
}

/// One article ingested from a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Post ID.
    pub id: Uuid,
    /// Feed this post belongs to.
    pub feed_id: Uuid,
    /// Post title.
    pub title: String,
    /// Link to the article. Unique across all posts.
    pub url: String,
    /// Item description.
    pub description: Option<String>,
    /// Publish date, `None` if the source omitted or mis-formatted it.
    pub published_at: Option<DateTime<Utc>>,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
    /// When the post was last updated.
    pub updated_at: DateTime<Utc>,
}

/// New post for creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Post ID, generated by the caller.
    pub id: Uuid,
    /// Feed ID.
    pub feed_id: Uuid,
    /// Post title.
    pub title: String,
    /// Link to the article.
    pub url: String,
    /// Item description.
    pub description: Option<String>,
    /// Publish date.
    pub published_at: Option<DateTime<Utc>>,
}

impl NewPost {
    /// Create a new post with a fresh ID.
    pub fn new(feed_id: Uuid, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            feed_id,
            title: title.into(),
            url: url.into(),
            description: None,
            published_at: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the publish date.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

/// A post joined with the name of its feed, for browsing.
#[derive(Debug, Clone)]
pub struct PostWithFeed {
    /// The post.
    pub post: Post,
    /// Name of the feed the post came from.
    pub feed_name: String,
}

/// Parsed representation of one remote fetch.
///
/// Only lives for the duration of one ingestion cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedFeedDocument {
    /// Channel title.
    pub title: String,
    /// Channel description.
    pub description: String,
    /// Items in document order.
    pub items: Vec<FetchedItem>,
}

/// One item of a fetched document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedItem {
    /// Item title.
    pub title: String,
    /// Item link.
    pub link: String,
    /// Item description.
    pub description: String,
    /// Publish date exactly as supplied by the source.
    pub pub_date: String,
}

impl FetchedItem {
    /// Create an item with the given link and publish date.
    pub fn new(link: impl Into<String>, pub_date: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            pub_date: pub_date.into(),
            ..Default::default()
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
