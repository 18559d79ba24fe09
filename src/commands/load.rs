//! Load command implementation
//!
//! Brings the cache up to the given server time first (when it differs from the
//! marker), then resolves the bundle the way an embedding application would.

use console::Style;

use bundlesync::config::Config;
use bundlesync::error::{BundleSyncError, Result};
use bundlesync::{LoadedBundle, Trigger};

use crate::cli::LoadArgs;

use super::helpers::{start_engine, tier_label};

/// Run load command
pub async fn run(config: Config, args: LoadArgs) -> Result<()> {
    let engine = start_engine(&config).await?;

    let timestamp = match args.timestamp {
        Some(timestamp) => timestamp,
        None => engine
            .status()
            .await?
            .local_timestamp
            .ok_or(BundleSyncError::NoServerTimestamp)?,
    };

    // The lookup is queued before the trigger is handled, so whatever the cycle
    // does (fresh, finished or aborted) flushes it
    let (loaded, trigger) = tokio::join!(
        engine.load(&args.name),
        engine.on_server_timestamp(timestamp)
    );

    if let Trigger::Started(handle) = trigger? {
        if let Err(e) = handle.wait().await {
            eprintln!("{} {}", Style::new().yellow().apply_to("Warning: sync failed:"), e);
        }
    }

    display_bundle(&loaded?);
    Ok(())
}

fn display_bundle(bundle: &LoadedBundle) {
    println!(
        "{} {} ({})",
        Style::new().bold().yellow().apply_to(bundle.name()),
        bundle.version(),
        tier_label(bundle.descriptor.tier)
    );
    println!("  {} {}", Style::new().bold().apply_to("Path:"), bundle.path.display());

    let total = bundle.files.len();
    println!(
        "  {} ({} {})",
        Style::new().bold().apply_to("Files:"),
        total,
        if total == 1 { "file" } else { "files" }
    );
    for file in &bundle.files {
        println!("    {}", Style::new().dim().apply_to(file.display()));
    }
}
