//! Feed ingestion for Gator.
//!
//! This module provides:
//! - Feed, follow and post storage
//! - The fetcher that retrieves and parses remote feeds
//! - The ingestion cycle and the scheduler that repeats it

mod fetcher;
mod ingest;
mod repository;
mod scheduler;
mod store;
mod types;

pub use fetcher::{parse_document, FeedFetcher, FeedSource, FetchError};
pub use ingest::{run_cycle, CycleOutcome, CycleReport};
pub use repository::{FeedFollowRepository, FeedRepository, PostRepository};
pub use scheduler::Scheduler;
pub use store::{CreatePostError, FeedStore, SqlFeedStore};
pub use types::{
    Feed, FeedFollow, FeedWithOwner, FetchedFeedDocument, FetchedItem, NewFeed, NewPost, Post,
    PostWithFeed,
};
