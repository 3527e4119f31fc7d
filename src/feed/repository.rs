//! Feed, follow and post repositories for Gator.

use chrono::Utc;
use uuid::Uuid;

use super::types::{Feed, FeedFollow, FeedWithOwner, NewFeed, NewPost, Post, PostWithFeed};
use crate::datetime::{parse_db_timestamp, to_db_timestamp};
use crate::db::{parse_id, DbPool};
use crate::{GatorError, Result};

const FEED_COLUMNS: &str = "id, name, url, user_id, created_at, updated_at, last_fetched_at";

const POST_COLUMNS: &str =
    "id, feed_id, title, url, description, published_at, created_at, updated_at";

/// Row type for feeds from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: String,
    name: String,
    url: String,
    user_id: String,
    created_at: String,
    updated_at: String,
    last_fetched_at: Option<String>,
}

impl TryFrom<FeedRow> for Feed {
    type Error = GatorError;

    fn try_from(row: FeedRow) -> Result<Self> {
        Ok(Feed {
            id: parse_id(&row.id)?,
            name: row.name,
            url: row.url,
            user_id: parse_id(&row.user_id)?,
            created_at: parse_db_timestamp(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_db_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
            last_fetched_at: row.last_fetched_at.and_then(|s| parse_db_timestamp(&s)),
        })
    }
}

/// Row type for feeds joined with their owner.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedWithOwnerRow {
    id: String,
    name: String,
    url: String,
    user_id: String,
    created_at: String,
    updated_at: String,
    last_fetched_at: Option<String>,
    owner_name: String,
}

impl TryFrom<FeedWithOwnerRow> for FeedWithOwner {
    type Error = GatorError;

    fn try_from(row: FeedWithOwnerRow) -> Result<Self> {
        let feed = Feed::try_from(FeedRow {
            id: row.id,
            name: row.name,
            url: row.url,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_fetched_at: row.last_fetched_at,
        })?;
        Ok(FeedWithOwner {
            feed,
            owner_name: row.owner_name,
        })
    }
}

/// Row type for feed follows joined with user and feed names.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedFollowRow {
    id: String,
    user_id: String,
    feed_id: String,
    user_name: String,
    feed_name: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<FeedFollowRow> for FeedFollow {
    type Error = GatorError;

    fn try_from(row: FeedFollowRow) -> Result<Self> {
        Ok(FeedFollow {
            id: parse_id(&row.id)?,
            user_id: parse_id(&row.user_id)?,
            feed_id: parse_id(&row.feed_id)?,
            user_name: row.user_name,
            feed_name: row.feed_name,
            created_at: parse_db_timestamp(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_db_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
        })
    }
}

/// Row type for posts from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: String,
    feed_id: String,
    title: String,
    url: String,
    description: Option<String>,
    published_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<PostRow> for Post {
    type Error = GatorError;

    fn try_from(row: PostRow) -> Result<Self> {
        Ok(Post {
            id: parse_id(&row.id)?,
            feed_id: parse_id(&row.feed_id)?,
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: row.published_at.and_then(|s| parse_db_timestamp(&s)),
            created_at: parse_db_timestamp(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_db_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
        })
    }
}

/// Row type for posts joined with their feed name.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostWithFeedRow {
    id: String,
    feed_id: String,
    title: String,
    url: String,
    description: Option<String>,
    published_at: Option<String>,
    created_at: String,
    updated_at: String,
    feed_name: String,
}

impl TryFrom<PostWithFeedRow> for PostWithFeed {
    type Error = GatorError;

    fn try_from(row: PostWithFeedRow) -> Result<Self> {
        let post = Post::try_from(PostRow {
            id: row.id,
            feed_id: row.feed_id,
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })?;
        Ok(PostWithFeed {
            post,
            feed_name: row.feed_name,
        })
    }
}

/// Repository for feed operations.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new feed.
    ///
    /// Fails with a validation error if the URL is already registered.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        let id = Uuid::new_v4();
        let now = to_db_timestamp(&Utc::now());

        let query = format!(
            r#"
            INSERT INTO feeds (id, name, url, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            FEED_COLUMNS
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(id.to_string())
            .bind(&feed.name)
            .bind(&feed.url)
            .bind(feed.user_id.to_string())
            .bind(&now)
            .bind(&now)
            .fetch_one(self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    GatorError::Validation(format!("feed {} is already registered", feed.url))
                }
                other => GatorError::from(other),
            })?;

        Feed::try_from(row)
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Feed>> {
        let query = format!("SELECT {} FROM feeds WHERE id = $1", FEED_COLUMNS);
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await?;

        row.map(Feed::try_from).transpose()
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let query = format!("SELECT {} FROM feeds WHERE url = $1", FEED_COLUMNS);
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(url)
            .fetch_optional(self.pool)
            .await?;

        row.map(Feed::try_from).transpose()
    }

    /// List all feeds with their owner's name (ordered by creation).
    pub async fn list_with_owner(&self) -> Result<Vec<FeedWithOwner>> {
        let rows = sqlx::query_as::<_, FeedWithOwnerRow>(
            r#"
            SELECT f.id, f.name, f.url, f.user_id, f.created_at, f.updated_at,
                   f.last_fetched_at, u.name AS owner_name
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.created_at ASC, f.id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(FeedWithOwner::try_from).collect()
    }

    /// Get the feed with the oldest `last_fetched_at`, never-fetched feeds first.
    pub async fn get_least_recently_fetched(&self) -> Result<Option<Feed>> {
        let query = format!(
            r#"
            SELECT {}
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC, id ASC
            LIMIT 1
            "#,
            FEED_COLUMNS
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .fetch_optional(self.pool)
            .await?;

        row.map(Feed::try_from).transpose()
    }

    /// Advance `last_fetched_at` to now.
    ///
    /// The timestamp never moves backwards: if the stored value is already
    /// later than the local clock, it is kept. Returns `None` if the feed
    /// does not exist.
    pub async fn mark_fetched(&self, id: Uuid) -> Result<Option<Feed>> {
        let now = to_db_timestamp(&Utc::now());

        let query = format!(
            r#"
            UPDATE feeds
            SET last_fetched_at = CASE
                    WHEN last_fetched_at IS NULL OR last_fetched_at < $1 THEN $2
                    ELSE last_fetched_at
                END,
                updated_at = $3
            WHERE id = $4
            RETURNING {}
            "#,
            FEED_COLUMNS
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(&now)
            .bind(&now)
            .bind(&now)
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await?;

        row.map(Feed::try_from).transpose()
    }

    /// Count all feeds.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feeds")
            .fetch_one(self.pool)
            .await?;

        Ok(count.0)
    }
}

/// Repository for feed follow operations.
pub struct FeedFollowRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedFollowRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Follow a feed.
    ///
    /// Fails with a validation error if the user already follows it.
    pub async fn create(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollow> {
        let id = Uuid::new_v4();
        let now = to_db_timestamp(&Utc::now());

        sqlx::query(
            r#"
            INSERT INTO feed_follows (id, user_id, feed_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(feed_id.to_string())
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                GatorError::Validation("feed is already followed".to_string())
            }
            other => GatorError::from(other),
        })?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed follow".to_string()))
    }

    /// Get a follow by ID.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<FeedFollow>> {
        let row = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, u.name AS user_name, f.name AS feed_name,
                   ff.created_at, ff.updated_at
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await?;

        row.map(FeedFollow::try_from).transpose()
    }

    /// List the follows of a user (ordered by feed name).
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollow>> {
        let rows = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, u.name AS user_name, f.name AS feed_name,
                   ff.created_at, ff.updated_at
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.user_id = $1
            ORDER BY f.name ASC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(FeedFollow::try_from).collect()
    }

    /// Stop following a feed.
    pub async fn delete(&self, user_id: Uuid, feed_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = $1 AND feed_id = $2")
            .bind(user_id.to_string())
            .bind(feed_id.to_string())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Repository for post operations.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new post unless one with the same URL exists.
    ///
    /// Returns `None` when the URL is already taken.
    pub async fn create_if_absent(&self, post: &NewPost) -> Result<Option<Post>> {
        let now = to_db_timestamp(&Utc::now());
        let published_at = post.published_at.as_ref().map(to_db_timestamp);

        let query = format!(
            r#"
            INSERT INTO posts (id, feed_id, title, url, description, published_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT(url) DO NOTHING
            RETURNING {}
            "#,
            POST_COLUMNS
        );
        let row = sqlx::query_as::<_, PostRow>(&query)
            .bind(post.id.to_string())
            .bind(post.feed_id.to_string())
            .bind(&post.title)
            .bind(&post.url)
            .bind(&post.description)
            .bind(&published_at)
            .bind(&now)
            .bind(&now)
            .fetch_optional(self.pool)
            .await?;

        row.map(Post::try_from).transpose()
    }

    /// Get a post by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Post>> {
        let query = format!("SELECT {} FROM posts WHERE url = $1", POST_COLUMNS);
        let row = sqlx::query_as::<_, PostRow>(&query)
            .bind(url)
            .fetch_optional(self.pool)
            .await?;

        row.map(Post::try_from).transpose()
    }

    /// List the newest posts from the feeds a user follows.
    ///
    /// Posts without a publish date sort after dated ones.
    pub async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<PostWithFeed>> {
        let rows = sqlx::query_as::<_, PostWithFeedRow>(
            r#"
            SELECT p.id, p.feed_id, p.title, p.url, p.description, p.published_at,
                   p.created_at, p.updated_at, f.name AS feed_name
            FROM posts p
            JOIN feeds f ON f.id = p.feed_id
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = $1
            ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(PostWithFeed::try_from).collect()
    }

    /// Count posts for a feed.
    pub async fn count_by_feed(&self, feed_id: Uuid) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE feed_id = $1")
            .bind(feed_id.to_string())
            .fetch_one(self.pool)
            .await?;

        Ok(count.0)
    }

    /// Count all posts.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn create_test_user(db: &Database, name: &str) -> Uuid {
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new(name)).await.unwrap().id
    }

    #[tokio::test]
    async fn test_create_feed() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let repo = FeedRepository::new(db.pool());

        let feed = repo
            .create(&NewFeed::new("Hacker News", "https://news.ycombinator.com/rss", user_id))
            .await
            .unwrap();

        assert_eq!(feed.name, "Hacker News");
        assert_eq!(feed.user_id, user_id);
        assert!(feed.last_fetched_at.is_none());
    }

    #[tokio::test]
    async fn test_create_feed_duplicate_url() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let repo = FeedRepository::new(db.pool());

        let url = "https://blog.boot.dev/index.xml";
        repo.create(&NewFeed::new("Boot.dev", url, user_id)).await.unwrap();
        let result = repo.create(&NewFeed::new("Again", url, user_id)).await;

        assert!(matches!(result, Err(GatorError::Validation(_))));
    }

    #[tokio::test]
    async fn test_least_recently_fetched_prefers_never_fetched() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let repo = FeedRepository::new(db.pool());

        let first = repo
            .create(&NewFeed::new("First", "https://a.example/rss", user_id))
            .await
            .unwrap();
        let second = repo
            .create(&NewFeed::new("Second", "https://b.example/rss", user_id))
            .await
            .unwrap();

        assert_eq!(repo.get_least_recently_fetched().await.unwrap().unwrap().id, first.id);

        repo.mark_fetched(first.id).await.unwrap();
        assert_eq!(repo.get_least_recently_fetched().await.unwrap().unwrap().id, second.id);

        repo.mark_fetched(second.id).await.unwrap();
        assert_eq!(repo.get_least_recently_fetched().await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_least_recently_fetched_empty() {
        let db = setup_db().await;
        let repo = FeedRepository::new(db.pool());

        assert!(repo.get_least_recently_fetched().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_fetched_never_moves_backwards() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let repo = FeedRepository::new(db.pool());

        let feed = repo
            .create(&NewFeed::new("Feed", "https://a.example/rss", user_id))
            .await
            .unwrap();

        let future = Utc::now() + chrono::Duration::days(1);
        sqlx::query("UPDATE feeds SET last_fetched_at = $1 WHERE id = $2")
            .bind(to_db_timestamp(&future))
            .bind(feed.id.to_string())
            .execute(db.pool())
            .await
            .unwrap();

        let marked = repo.mark_fetched(feed.id).await.unwrap().unwrap();
        assert_eq!(
            marked.last_fetched_at.map(|t| to_db_timestamp(&t)),
            Some(to_db_timestamp(&future))
        );
    }

    #[tokio::test]
    async fn test_mark_fetched_missing_feed() {
        let db = setup_db().await;
        let repo = FeedRepository::new(db.pool());

        assert!(repo.mark_fetched(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_follow_and_unfollow() {
        let db = setup_db().await;
        let owner = create_test_user(&db, "kahya").await;
        let reader = create_test_user(&db, "holgith").await;
        let feed_repo = FeedRepository::new(db.pool());
        let follow_repo = FeedFollowRepository::new(db.pool());

        let feed = feed_repo
            .create(&NewFeed::new("TechCrunch", "https://techcrunch.com/feed/", owner))
            .await
            .unwrap();

        let follow = follow_repo.create(reader, feed.id).await.unwrap();
        assert_eq!(follow.user_name, "holgith");
        assert_eq!(follow.feed_name, "TechCrunch");

        let duplicate = follow_repo.create(reader, feed.id).await;
        assert!(matches!(duplicate, Err(GatorError::Validation(_))));

        assert_eq!(follow_repo.list_for_user(reader).await.unwrap().len(), 1);
        assert!(follow_repo.delete(reader, feed.id).await.unwrap());
        assert!(!follow_repo.delete(reader, feed.id).await.unwrap());
        assert!(follow_repo.list_for_user(reader).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_post_ignores_duplicate_url() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let feed = FeedRepository::new(db.pool())
            .create(&NewFeed::new("Feed", "https://a.example/rss", user_id))
            .await
            .unwrap();
        let repo = PostRepository::new(db.pool());

        let post = NewPost::new(feed.id, "Hello", "https://a.example/hello")
            .with_description("first post");
        let created = repo.create_if_absent(&post).await.unwrap().unwrap();
        assert_eq!(created.id, post.id);
        assert_eq!(created.description.as_deref(), Some("first post"));

        let again = NewPost::new(feed.id, "Hello again", "https://a.example/hello");
        assert!(repo.create_if_absent(&again).await.unwrap().is_none());

        assert_eq!(repo.count_by_feed(feed.id).await.unwrap(), 1);
        let stored = repo.get_by_url("https://a.example/hello").await.unwrap().unwrap();
        assert_eq!(stored.title, "Hello");
    }

    #[tokio::test]
    async fn test_create_post_requires_existing_feed() {
        let db = setup_db().await;
        let repo = PostRepository::new(db.pool());

        let post = NewPost::new(Uuid::new_v4(), "Orphan", "https://a.example/orphan");
        assert!(matches!(
            repo.create_if_absent(&post).await,
            Err(GatorError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_list_posts_for_user() {
        use chrono::TimeZone;

        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let other_id = create_test_user(&db, "holgith").await;
        let feed_repo = FeedRepository::new(db.pool());
        let follow_repo = FeedFollowRepository::new(db.pool());
        let post_repo = PostRepository::new(db.pool());

        let followed = feed_repo
            .create(&NewFeed::new("Followed", "https://a.example/rss", other_id))
            .await
            .unwrap();
        let ignored = feed_repo
            .create(&NewFeed::new("Ignored", "https://b.example/rss", other_id))
            .await
            .unwrap();
        follow_repo.create(user_id, followed.id).await.unwrap();

        let old = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        post_repo
            .create_if_absent(&NewPost::new(followed.id, "Old", "https://a.example/old").with_published_at(old))
            .await
            .unwrap();
        post_repo
            .create_if_absent(&NewPost::new(followed.id, "Undated", "https://a.example/undated"))
            .await
            .unwrap();
        post_repo
            .create_if_absent(&NewPost::new(followed.id, "New", "https://a.example/new").with_published_at(new))
            .await
            .unwrap();
        post_repo
            .create_if_absent(&NewPost::new(ignored.id, "Other", "https://b.example/other"))
            .await
            .unwrap();

        let posts = post_repo.list_for_user(user_id, 10).await.unwrap();
        let titles: Vec<&str> = posts.iter().map(|p| p.post.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Old", "Undated"]);
        assert!(posts.iter().all(|p| p.feed_name == "Followed"));

        let limited = post_repo.list_for_user(user_id, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].post.published_at, Some(new));
    }

    #[tokio::test]
    async fn test_deleting_owner_cascades_feeds_and_posts() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let feed_repo = FeedRepository::new(db.pool());
        let post_repo = PostRepository::new(db.pool());

        let feed = feed_repo
            .create(&NewFeed::new("Feed", "https://a.example/rss", user_id))
            .await
            .unwrap();
        post_repo
            .create_if_absent(&NewPost::new(feed.id, "Post", "https://a.example/1"))
            .await
            .unwrap();

        assert_eq!(feed_repo.count().await.unwrap(), 1);
        assert_eq!(post_repo.count().await.unwrap(), 1);

        UserRepository::new(db.pool()).delete_all().await.unwrap();
        assert_eq!(post_repo.count().await.unwrap(), 0);
        assert_eq!(feed_repo.count().await.unwrap(), 0);
    }
}
