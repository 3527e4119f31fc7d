//! `browse [limit]`: show the newest posts from followed feeds.

use std::io::Write;

use super::{current_user, Command, CommandContext};
use crate::datetime::format_utc_datetime;
use crate::feed::PostRepository;
use crate::{GatorError, Result};

/// Number of posts shown when no limit is given.
pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

/// `browse [limit]`: print the newest posts from the feeds the current user follows.
pub async fn browse<W: Write>(ctx: &mut CommandContext, cmd: &Command, out: &mut W) -> Result<()> {
    let user = current_user(ctx).await?;
    let limit = match cmd.args.as_slice() {
        [] => DEFAULT_BROWSE_LIMIT,
        [limit] => parse_limit(limit)?,
        _ => return Err(GatorError::Validation(format!("usage: {} [limit]", cmd.name))),
    };

    let posts = PostRepository::new(ctx.db.pool())
        .list_for_user(user.id, limit)
        .await?;

    let display = &ctx.config.display;
    writeln!(out, "Found {} posts for user {}:", posts.len(), user.name)?;
    for entry in posts {
        let date = entry
            .post
            .published_at
            .as_ref()
            .map(|dt| format_utc_datetime(dt, &display.timezone, &display.date_format))
            .unwrap_or_else(|| "undated".to_string());
        writeln!(out, "{} from {}", date, entry.feed_name)?;
        writeln!(out, "--- {} ---", entry.post.title)?;
        writeln!(out, "    {}", entry.post.description.as_deref().unwrap_or_default())?;
        writeln!(out, "Link: {}", entry.post.url)?;
        writeln!(out, "=====================================")?;
    }
    Ok(())
}

fn parse_limit(value: &str) -> Result<i64> {
    match value.parse::<i64>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(GatorError::Validation(format!(
            "invalid limit {:?}: expected a positive number",
            value
        ))),
    }
}
