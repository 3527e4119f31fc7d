//! Tracing setup.
//!
//! Diagnostics go to stderr; stdout is reserved for command output. The
//! `[logging]` level is the baseline and `RUST_LOG` directives refine it.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Map a `[logging] level` value to a tracing level. Unknown names mean `info`.
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(parse_level(level).into())
}

/// Open `path` for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(File::options().create(true).append(true).open(path)?)
}

/// Install the global subscriber.
///
/// With `logging.file` set, every event is written to both stderr and the
/// file (without ANSI colors). Fails only if the file cannot be opened, in
/// which case nothing has been installed yet.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let Some(path) = config.file.as_deref() else {
        init_console_only(&config.level);
        return Ok(());
    };

    let log_file = Arc::new(open_log_file(Path::new(path))?);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr.and(log_file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(layer)
        .with(build_filter(&config.level))
        .init();

    Ok(())
}

/// Install a stderr-only subscriber. Used directly when no log file is
/// configured and as the fallback when the file cannot be opened.
pub fn init_console_only(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(build_filter(level))
        .init();
}
