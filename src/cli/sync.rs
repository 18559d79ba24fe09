use clap::Parser;

/// Arguments for the sync command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Sync to a server update time:\n    bundlesync sync --timestamp 1718000000\n\n\
                  Re-download every published bundle:\n    bundlesync sync --timestamp 1718000000 --force")]
pub struct SyncArgs {
    /// Server update time (seconds since epoch)
    #[arg(long, short = 't')]
    pub timestamp: u64,

    /// Download every published bundle, even when the local version matches
    #[arg(long)]
    pub force: bool,
}
