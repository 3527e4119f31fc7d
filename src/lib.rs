//! Gator - a personal blog/RSS aggregator.
//!
//! Users register, follow feeds, and a background loop polls the least
//! recently fetched feed and stores its new posts for browsing.

pub mod commands;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;

pub use commands::{Command, CommandContext};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{GatorError, Result};
pub use feed::{
    run_cycle, CreatePostError, CycleOutcome, CycleReport, Feed, FeedFetcher, FeedSource,
    FeedStore, FetchError, FetchedFeedDocument, FetchedItem, NewPost, Post, Scheduler,
    SqlFeedStore,
};
