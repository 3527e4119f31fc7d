use std::process::ExitCode;

use tracing::{debug, error};

use gator::{commands, Command, CommandContext, Config, Database};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = Config::default_path();
    let config = match Config::load_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", config_path.display());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = gator::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        gator::logging::init_console_only(&config.logging.level);
    }

    let cmd = match Command::from_args(std::env::args().skip(1)) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {e}");
            return ExitCode::FAILURE;
        }
    };

    debug!("Running command {}", cmd.name);
    let mut ctx = CommandContext::new(db, config, config_path);
    let mut stdout = std::io::stdout().lock();
    match commands::run(&mut ctx, &cmd, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} failed: {e}", cmd.name);
            ExitCode::FAILURE
        }
    }
}
