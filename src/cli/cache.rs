use clap::{Parser, Subcommand};

/// Arguments for cache command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Show cache statistics:\n    bundlesync cache\n\n\
                  List cached bundles:\n    bundlesync cache list\n\n\
                  Clear all cached bundles:\n    bundlesync cache clear\n\n\
                  Remove specific bundle:\n    bundlesync cache clear --only onboarding")]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: Option<CacheSubcommand>,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheSubcommand {
    /// List cached bundles
    List,

    /// Clear cached bundles
    Clear(ClearCacheArgs),
}

/// Arguments for cache clear command
#[derive(Parser, Debug)]
pub struct ClearCacheArgs {
    /// Remove only specific bundle by name (e.g., onboarding)
    #[arg(long)]
    pub only: Option<String>,
}
