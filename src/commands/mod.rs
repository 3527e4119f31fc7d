//! Operator commands for Gator.
//!
//! Every handler receives an explicit [`CommandContext`] and writes its
//! output to the given writer. Nothing is kept in process-wide state.

mod aggregate;
mod browse;
mod feeds;
mod users;

use std::io::Write;
use std::path::PathBuf;

use crate::config::Config;
use crate::db::{Database, User, UserRepository};
use crate::{GatorError, Result};

/// Everything a command needs: the database, the loaded configuration and
/// where to persist it.
#[derive(Debug)]
pub struct CommandContext {
    /// Database handle.
    pub db: Database,
    /// Loaded configuration.
    pub config: Config,
    /// Path the configuration is saved to.
    pub config_path: PathBuf,
}

impl CommandContext {
    /// Create a new context.
    pub fn new(db: Database, config: Config, config_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            config,
            config_path: config_path.into(),
        }
    }
}

/// A command name with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name.
    pub name: String,
    /// Positional arguments.
    pub args: Vec<String>,
}

impl Command {
    /// Create a command.
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Build a command from process arguments, excluding the program name.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let name = args
            .next()
            .ok_or_else(|| GatorError::Validation("usage: gator <command> [args...]".to_string()))?;
        Ok(Self::new(name, args.collect()))
    }

    /// Fail with a usage error unless exactly `count` arguments were given.
    pub(crate) fn expect_args(&self, count: usize, usage: &str) -> Result<()> {
        if self.args.len() != count {
            let usage = format!("usage: {} {}", self.name, usage);
            return Err(GatorError::Validation(usage.trim_end().to_string()));
        }
        Ok(())
    }
}

/// Run a command.
pub async fn run<W: Write>(ctx: &mut CommandContext, cmd: &Command, out: &mut W) -> Result<()> {
    match cmd.name.as_str() {
        "register" => users::register(ctx, cmd, out).await,
        "login" => users::login(ctx, cmd, out).await,
        "reset" => users::reset(ctx, cmd, out).await,
        "users" => users::list(ctx, cmd, out).await,
        "addfeed" => feeds::add(ctx, cmd, out).await,
        "feeds" => feeds::list(ctx, cmd, out).await,
        "follow" => feeds::follow(ctx, cmd, out).await,
        "following" => feeds::following(ctx, cmd, out).await,
        "unfollow" => feeds::unfollow(ctx, cmd, out).await,
        "browse" => browse::browse(ctx, cmd, out).await,
        "agg" => aggregate::aggregate(ctx, cmd, out).await,
        other => Err(GatorError::Validation(format!("unknown command: {}", other))),
    }
}

/// Resolve the logged-in user.
pub(crate) async fn current_user(ctx: &CommandContext) -> Result<User> {
    let name = ctx.config.session.current_user_name.as_deref().ok_or_else(|| {
        GatorError::Validation("not logged in; run `login <name>` first".to_string())
    })?;

    UserRepository::new(ctx.db.pool())
        .get_by_name(name)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("user {:?}", name)))
}
