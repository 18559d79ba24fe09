//! Sync command implementation

use console::Style;

use bundlesync::config::Config;
use bundlesync::error::Result;
use bundlesync::{CycleReport, Trigger};

use crate::cli::SyncArgs;
use crate::progress::SyncProgress;

use super::helpers::start_engine;

/// Run sync command
pub async fn run(config: Config, args: SyncArgs) -> Result<()> {
    config.require_manifest()?;
    let engine = start_engine(&config).await?;

    let progress = SyncProgress::new();
    let tracker = progress.track(engine.subscribe());

    let outcome = if args.force {
        match engine.fetch_manifest().await {
            Ok(_) => engine.sync_downloads(true, args.timestamp).await.map(Some),
            Err(e) => Err(e),
        }
    } else {
        match engine.on_server_timestamp(args.timestamp).await? {
            Trigger::Started(handle) => handle.wait().await.map(Some),
            Trigger::AlreadyFresh | Trigger::Dropped => Ok(None),
        }
    };

    tracker.abort();
    match outcome {
        Ok(report) => {
            progress.finish();
            print_outcome(args.timestamp, report.as_ref());
            Ok(())
        }
        Err(e) => {
            progress.abandon();
            Err(e)
        }
    }
}

fn print_outcome(timestamp: u64, report: Option<&CycleReport>) {
    let Some(report) = report else {
        println!("Bundles are up to date (server time {timestamp}).");
        return;
    };

    if report.installed.is_empty() {
        println!("Nothing to download (server time {timestamp}).");
        return;
    }

    println!(
        "Synced to server time {} ({} bundle{} installed):",
        timestamp,
        report.installed.len(),
        if report.installed.len() == 1 { "" } else { "s" }
    );
    for name in &report.installed {
        println!("  {}", Style::new().bold().yellow().apply_to(name));
    }
}
