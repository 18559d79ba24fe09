use clap::Parser;

/// Arguments for the list command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  List local bundles:\n    bundlesync list\n\n\
                  Include package files:\n    bundlesync list --detailed")]
pub struct ListArgs {
    /// Show the files of each bundle
    #[arg(long)]
    pub detailed: bool,
}
