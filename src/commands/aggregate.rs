//! `agg <interval>`: collect feeds forever.

use std::io::Write;

use super::{Command, CommandContext};
use crate::feed::{FeedFetcher, Scheduler, SqlFeedStore};
use crate::Result;

/// Start the scheduler. Only returns on a bad interval or fetcher setup error.
pub async fn aggregate<W: Write>(
    ctx: &mut CommandContext,
    cmd: &Command,
    out: &mut W,
) -> Result<()> {
    cmd.expect_args(1, "<interval>")?;

    let store = SqlFeedStore::new(ctx.db.clone());
    let fetcher = FeedFetcher::new(&ctx.config.fetcher)?;
    let scheduler = Scheduler::from_interval_str(store, fetcher, &cmd.args[0])?;

    writeln!(out, "Collecting feeds every {:?}", scheduler.interval())?;
    out.flush()?;

    scheduler.run().await;
    Ok(())
}
