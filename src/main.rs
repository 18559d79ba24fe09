//! bundlesync - versioned bundle cache
//!
//! Command line front end for the sync engine: sync the cache to a server
//! update time, resolve bundles, and inspect or clear the cache.

use clap::Parser;

mod cli;
mod commands;
mod progress;

use bundlesync::config::Config;
use bundlesync::error::{Result, fs::io_error};
use bundlesync::logging;

use cli::{Cli, Commands};

fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(&cli.overrides())?;

    // Cache management never needs the engine
    if let Commands::Cache(args) = cli.command {
        return commands::cache::run(&config, args);
    }

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| io_error(format!("Failed to start async runtime: {e}")))?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Sync(args) => commands::sync::run(config, args).await,
            Commands::Load(args) => commands::load::run(config, args).await,
            Commands::List(args) => commands::list::run(config, args).await,
            Commands::Status => commands::status::run(config).await,
            Commands::Cache(_) => Ok(()),
        }
    })
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
