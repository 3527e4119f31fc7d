//! One ingestion cycle: select a feed, fetch it, store its new posts.

use tracing::{debug, error, info, warn};

use super::fetcher::FeedSource;
use super::store::{CreatePostError, FeedStore};
use super::types::{Feed, FetchedItem, NewPost};
use crate::datetime::parse_pub_date;

/// Per-item counts of a completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Items found in the fetched document.
    pub seen: usize,
    /// Posts created.
    pub inserted: usize,
    /// Items skipped because their URL was already stored.
    pub duplicates: usize,
    /// Items skipped because of any other error.
    pub failed: usize,
    /// Items whose publish date was missing or mis-formatted.
    pub undated: usize,
}

/// How a cycle ended. Failures never escape the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The store has no feeds.
    NothingToFetch,
    /// Selecting or marking the feed failed; nothing was fetched.
    StoreUnavailable,
    /// The feed was marked fetched but retrieving or parsing it failed.
    FetchFailed,
    /// The feed was fetched and every item was processed.
    Completed(CycleReport),
}

/// Run one ingestion cycle.
///
/// The selected feed is marked fetched before the network call, so a feed
/// that keeps failing moves to the back of the queue instead of being
/// retried on every tick. Each post insert stands alone; there is no
/// transaction around the batch.
pub async fn run_cycle<S, F>(store: &S, source: &F) -> CycleOutcome
where
    S: FeedStore + ?Sized,
    F: FeedSource + ?Sized,
{
    let feed = match store.get_least_recently_fetched_feed().await {
        Ok(Some(feed)) => feed,
        Ok(None) => {
            info!("No feeds to fetch");
            return CycleOutcome::NothingToFetch;
        }
        Err(e) => {
            error!("Failed to select next feed: {}", e);
            return CycleOutcome::StoreUnavailable;
        }
    };

    let feed = match store.mark_feed_fetched(feed.id).await {
        Ok(feed) => feed,
        Err(e) => {
            error!("Failed to mark feed {} as fetched: {}", feed.name, e);
            return CycleOutcome::StoreUnavailable;
        }
    };

    info!("Fetching feed {} ({})", feed.name, feed.url);

    let document = match source.fetch(&feed.url).await {
        Ok(document) => document,
        Err(e) => {
            warn!("Failed to fetch feed {}: {}", feed.name, e);
            return CycleOutcome::FetchFailed;
        }
    };

    let mut report = CycleReport::default();
    for item in &document.items {
        report.seen += 1;
        store_item(store, &feed, item, &mut report).await;
    }

    info!(
        "Feed {} collected: {} item(s) seen, {} new post(s), {} duplicate(s), {} failed",
        feed.name, report.seen, report.inserted, report.duplicates, report.failed
    );

    CycleOutcome::Completed(report)
}

async fn store_item<S>(store: &S, feed: &Feed, item: &FetchedItem, report: &mut CycleReport)
where
    S: FeedStore + ?Sized,
{
    if item.link.is_empty() {
        warn!("Skipping item {:?} of feed {}: no link", item.title, feed.name);
        report.failed += 1;
        return;
    }

    let mut post = NewPost::new(feed.id, item.title.as_str(), item.link.as_str());
    if !item.description.is_empty() {
        post = post.with_description(item.description.as_str());
    }
    match parse_pub_date(&item.pub_date) {
        Some(published_at) => post = post.with_published_at(published_at),
        None => {
            debug!("Unparsable publish date {:?} for {}", item.pub_date, item.link);
            report.undated += 1;
        }
    }

    match store.create_post(&post).await {
        Ok(created) => {
            debug!("Stored post {}", created.url);
            report.inserted += 1;
        }
        Err(CreatePostError::DuplicateUrl(_)) => report.duplicates += 1,
        Err(CreatePostError::Store(e)) => {
            warn!("Failed to store post {}: {}", item.link, e);
            report.failed += 1;
        }
    }
}
