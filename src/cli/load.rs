use clap::Parser;

/// Arguments for the load command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Resolve against the last synced server time:\n    bundlesync load onboarding\n\n\
                  Sync first if the server reports a newer time:\n    bundlesync load onboarding --timestamp 1718000000")]
pub struct LoadArgs {
    /// Bundle name
    pub name: String,

    /// Server update time (seconds since epoch); defaults to the last persisted one
    #[arg(long, short = 't')]
    pub timestamp: Option<u64>,
}
