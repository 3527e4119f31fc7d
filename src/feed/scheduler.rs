//! Periodic ingestion scheduler.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::fetcher::FeedSource;
use super::ingest::run_cycle;
use super::store::FeedStore;
use crate::datetime::parse_interval;
use crate::{GatorError, Result};

/// Runs an ingestion cycle immediately and then once per interval, forever.
pub struct Scheduler<S, F> {
    store: S,
    source: F,
    interval: Duration,
}

impl<S, F> Scheduler<S, F>
where
    S: FeedStore,
    F: FeedSource,
{
    /// Create a scheduler. The interval must be non-zero.
    pub fn new(store: S, source: F, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(GatorError::Config("interval must be positive".to_string()));
        }
        Ok(Self {
            store,
            source,
            interval,
        })
    }

    /// Create a scheduler from an interval string such as `1m` or `30s`.
    pub fn from_interval_str(store: S, source: F, interval: &str) -> Result<Self> {
        let interval = parse_interval(interval)?;
        Self::new(store, source, interval)
    }

    /// Delay between cycle starts.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run cycles until the process is stopped.
    ///
    /// A cycle always finishes before the next tick is awaited. A cycle that
    /// outlasts the interval pushes the following ticks back instead of
    /// triggering a burst.
    pub async fn run(&self) {
        info!("Collecting feeds every {:?}", self.interval);

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            let outcome = run_cycle(&self.store, &self.source).await;
            debug!("Cycle finished: {:?}", outcome);
        }
    }
}
