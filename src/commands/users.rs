//! User commands: register, login, reset, users.

use std::io::Write;

use tracing::info;

use super::{Command, CommandContext};
use crate::db::{NewUser, UserRepository};
use crate::feed::{FeedRepository, PostRepository};
use crate::{GatorError, Result};

/// `register <name>`: create a user and log in as them.
pub async fn register<W: Write>(ctx: &mut CommandContext, cmd: &Command, out: &mut W) -> Result<()> {
    cmd.expect_args(1, "<name>")?;
    let name = cmd.args[0].trim();
    if name.is_empty() {
        return Err(GatorError::Validation("user name must not be empty".to_string()));
    }

    let user = UserRepository::new(ctx.db.pool())
        .create(&NewUser::new(name))
        .await?;
    ctx.config.set_current_user(&user.name, &ctx.config_path)?;
    info!("Registered user {}", user.name);

    writeln!(out, "Created user: {}", user.name)?;
    writeln!(out, "\t- ID:\t{}", user.id)?;
    writeln!(out, "\t- Name:\t{}", user.name)?;
    Ok(())
}

/// `login <name>`: switch the current user.
pub async fn login<W: Write>(ctx: &mut CommandContext, cmd: &Command, out: &mut W) -> Result<()> {
    cmd.expect_args(1, "<name>")?;
    let name = &cmd.args[0];

    let user = UserRepository::new(ctx.db.pool())
        .get_by_name(name)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("user {:?}", name)))?;
    ctx.config.set_current_user(&user.name, &ctx.config_path)?;

    writeln!(out, "Logged in as {}", user.name)?;
    Ok(())
}

/// `reset`: delete every user along with their feeds, follows and posts.
pub async fn reset<W: Write>(ctx: &mut CommandContext, cmd: &Command, out: &mut W) -> Result<()> {
    cmd.expect_args(0, "")?;

    let feeds = FeedRepository::new(ctx.db.pool()).count().await?;
    let posts = PostRepository::new(ctx.db.pool()).count().await?;
    let users = UserRepository::new(ctx.db.pool()).delete_all().await?;
    info!(
        "Reset database: {} user(s), {} feed(s), {} post(s) deleted",
        users, feeds, posts
    );

    writeln!(
        out,
        "Reset complete: {} user(s), {} feed(s), {} post(s) deleted",
        users, feeds, posts
    )?;
    Ok(())
}

/// `users`: list users, marking the current one.
pub async fn list<W: Write>(ctx: &mut CommandContext, cmd: &Command, out: &mut W) -> Result<()> {
    cmd.expect_args(0, "")?;

    let current = ctx.config.session.current_user_name.as_deref();
    for user in UserRepository::new(ctx.db.pool()).list().await? {
        if Some(user.name.as_str()) == current {
            writeln!(out, "* {} (current)", user.name)?;
        } else {
            writeln!(out, "* {}", user.name)?;
        }
    }
    Ok(())
}
