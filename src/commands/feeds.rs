//! Feed commands: addfeed, feeds, follow, following, unfollow.

use std::io::Write;

use tracing::info;

use super::{current_user, Command, CommandContext};
use crate::datetime::to_db_timestamp;
use crate::feed::{Feed, FeedFollow, FeedFollowRepository, FeedRepository, NewFeed};
use crate::{GatorError, Result};

/// Check that a feed URL is an absolute http(s) URL.
pub fn validate_feed_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| GatorError::Validation(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(GatorError::Validation(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(GatorError::Validation("URL has no host".to_string()));
    }

    Ok(())
}

/// `addfeed <name> <url>`: register a feed and follow it.
pub async fn add<W: Write>(ctx: &mut CommandContext, cmd: &Command, out: &mut W) -> Result<()> {
    let user = current_user(ctx).await?;
    cmd.expect_args(2, "<name> <url>")?;
    let (name, url) = (cmd.args[0].trim(), cmd.args[1].trim());
    if name.is_empty() {
        return Err(GatorError::Validation("feed name must not be empty".to_string()));
    }
    validate_feed_url(url)?;

    let feed = FeedRepository::new(ctx.db.pool())
        .create(&NewFeed::new(name, url, user.id))
        .await?;
    let follow = FeedFollowRepository::new(ctx.db.pool())
        .create(user.id, feed.id)
        .await?;
    info!("User {} added feed {} ({})", user.name, feed.name, feed.url);

    writeln!(out, "Feed created:")?;
    write_feed(out, &feed, &user.name)?;
    writeln!(out, "Feed followed:")?;
    write_follow(out, &follow)?;
    Ok(())
}

/// `feeds`: list every feed with its owner.
pub async fn list<W: Write>(ctx: &mut CommandContext, cmd: &Command, out: &mut W) -> Result<()> {
    cmd.expect_args(0, "")?;

    let feeds = FeedRepository::new(ctx.db.pool()).list_with_owner().await?;
    if feeds.is_empty() {
        writeln!(out, "No feeds found.")?;
        return Ok(());
    }

    writeln!(out, "Feeds found: {}", feeds.len())?;
    for entry in feeds {
        writeln!(out, "* {}", entry.feed.name)?;
        writeln!(out, "  URL:  {}", entry.feed.url)?;
        writeln!(out, "  User: {}", entry.owner_name)?;
    }
    Ok(())
}

/// `follow <url>`: follow an existing feed.
pub async fn follow<W: Write>(ctx: &mut CommandContext, cmd: &Command, out: &mut W) -> Result<()> {
    let user = current_user(ctx).await?;
    cmd.expect_args(1, "<url>")?;

    let feed = feed_by_url(ctx, &cmd.args[0]).await?;
    let follow = FeedFollowRepository::new(ctx.db.pool())
        .create(user.id, feed.id)
        .await?;

    writeln!(out, "Feed followed:")?;
    write_follow(out, &follow)?;
    Ok(())
}

/// `following`: list the feeds the current user follows.
pub async fn following<W: Write>(
    ctx: &mut CommandContext,
    cmd: &Command,
    out: &mut W,
) -> Result<()> {
    let user = current_user(ctx).await?;
    cmd.expect_args(0, "")?;

    let follows = FeedFollowRepository::new(ctx.db.pool())
        .list_for_user(user.id)
        .await?;
    if follows.is_empty() {
        writeln!(out, "{} does not follow any feeds.", user.name)?;
        return Ok(());
    }

    writeln!(out, "Feeds followed by {}:", user.name)?;
    for follow in follows {
        writeln!(out, "* {}", follow.feed_name)?;
    }
    Ok(())
}

/// `unfollow <url>`: stop following a feed.
pub async fn unfollow<W: Write>(
    ctx: &mut CommandContext,
    cmd: &Command,
    out: &mut W,
) -> Result<()> {
    let user = current_user(ctx).await?;
    cmd.expect_args(1, "<url>")?;

    let feed = feed_by_url(ctx, &cmd.args[0]).await?;
    let removed = FeedFollowRepository::new(ctx.db.pool())
        .delete(user.id, feed.id)
        .await?;
    if !removed {
        return Err(GatorError::NotFound(format!(
            "follow of {} by {}",
            feed.name, user.name
        )));
    }

    writeln!(out, "Unfollowed {}", feed.name)?;
    Ok(())
}

async fn feed_by_url(ctx: &CommandContext, url: &str) -> Result<Feed> {
    FeedRepository::new(ctx.db.pool())
        .get_by_url(url)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("feed {}", url)))
}

fn write_feed<W: Write>(out: &mut W, feed: &Feed, owner: &str) -> Result<()> {
    writeln!(out, "* ID:            {}", feed.id)?;
    writeln!(out, "* Created:       {}", to_db_timestamp(&feed.created_at))?;
    writeln!(out, "* Name:          {}", feed.name)?;
    writeln!(out, "* URL:           {}", feed.url)?;
    writeln!(out, "* User:          {}", owner)?;
    let last_fetched = feed
        .last_fetched_at
        .as_ref()
        .map(to_db_timestamp)
        .unwrap_or_else(|| "never".to_string());
    writeln!(out, "* LastFetchedAt: {}", last_fetched)?;
    Ok(())
}

fn write_follow<W: Write>(out: &mut W, follow: &FeedFollow) -> Result<()> {
    writeln!(out, "* User:          {}", follow.user_name)?;
    writeln!(out, "* Feed:          {}", follow.feed_name)?;
    Ok(())
}
