//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - sync: Sync command arguments
//! - load: Load command arguments
//! - list: List command arguments
//! - cache: Cache command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use bundlesync::config::Overrides;

pub mod cache;
pub mod list;
pub mod load;
pub mod sync;

pub use cache::{CacheArgs, CacheSubcommand};
pub use list::ListArgs;
pub use load::LoadArgs;
pub use sync::SyncArgs;

/// bundlesync - versioned bundle cache
///
/// Keep a local cache of resource bundles in sync with a remote manifest.
#[derive(Parser, Debug)]
#[command(
    name = "bundlesync",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Keep a local bundle cache in sync with a remote manifest",
    long_about = "bundlesync maintains a cache of named, versioned resource bundles, \
                  downloads what the remote manifest publishes when the server reports \
                  a new update time, and resolves bundles from the cache.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  bundlesync sync --timestamp 1718000000        \x1b[90m# Sync to a server update time\x1b[0m\n   \
                  bundlesync sync --timestamp 1718000000 --force \x1b[90m# Re-download everything\x1b[0m\n   \
                  bundlesync load onboarding                    \x1b[90m# Resolve a bundle\x1b[0m\n   \
                  bundlesync list                               \x1b[90m# List local bundles\x1b[0m\n   \
                  bundlesync cache clear --only onboarding      \x1b[90m# Drop one bundle from cache\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Configuration file (defaults to <config dir>/bundlesync/config.yaml)
    #[arg(long, short = 'c', global = true, env = "BUNDLESYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache directory
    #[arg(long, global = true, env = "BUNDLESYNC_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory of bundles shipped with the application
    #[arg(long, global = true, env = "BUNDLESYNC_PREPACKAGED_DIR")]
    pub prepackaged_dir: Option<PathBuf>,

    /// Manifest location (path or file:// URL)
    #[arg(long, short = 'm', global = true, env = "BUNDLESYNC_MANIFEST")]
    pub manifest: Option<String>,

    /// Keep older versions after installing a new one
    #[arg(long, global = true)]
    pub no_evict: bool,

    /// Enable verbose output (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Settings given on the command line, for layering over the config file
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            cache_dir: self.cache_dir.clone(),
            prepackaged_dir: self.prepackaged_dir.clone(),
            manifest: self.manifest.clone(),
            no_evict: self.no_evict,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync the cache to a server update time
    Sync(SyncArgs),

    /// Resolve a bundle from the cache
    Load(LoadArgs),

    /// List local bundles
    List(ListArgs),

    /// Show engine status
    Status,

    /// Manage cache directory
    #[command(name = "cache")]
    Cache(CacheArgs),
}
