//! List command implementation
//!
//! Lists the local inventory as scanned at startup: cached and prepackaged
//! bundles with their version, provenance and location.

use console::Style;

use bundlesync::config::Config;
use bundlesync::error::Result;
use bundlesync::{BundleDescriptor, LoadedBundle};

use crate::cli::ListArgs;

use super::helpers::{start_engine, tier_label, timestamp_label};

/// Run list command
pub async fn run(config: Config, args: ListArgs) -> Result<()> {
    let engine = start_engine(&config).await?;
    let status = engine.status().await?;
    let snapshot = engine.inventory().await?;

    println!(
        "{} {}",
        Style::new().bold().apply_to("Last server update:"),
        timestamp_label(status.local_timestamp)
    );

    if snapshot.local.is_empty() {
        println!("No bundles available.");
        return Ok(());
    }

    println!("Local bundles ({}):", snapshot.local.len());
    println!();

    for descriptor in snapshot.local.iter() {
        display_descriptor(descriptor);
        if args.detailed {
            let descriptor = descriptor.clone();
            let opened = tokio::task::spawn_blocking(move || LoadedBundle::open(&descriptor))
                .await
                .map_err(|e| bundlesync::error::fs::io_error(e.to_string()))?;
            match opened {
                Ok(bundle) => {
                    for file in &bundle.files {
                        println!("      {}", Style::new().dim().apply_to(file.display()));
                    }
                }
                Err(e) => println!("      {}", Style::new().red().apply_to(e)),
            }
        }
        println!();
    }

    Ok(())
}

fn display_descriptor(descriptor: &BundleDescriptor) {
    println!("  {}", Style::new().bold().yellow().apply_to(&descriptor.name));
    println!(
        "    {} {}",
        Style::new().bold().apply_to("Version:"),
        descriptor.version
    );
    println!(
        "    {} {}",
        Style::new().bold().apply_to("Tier:"),
        tier_label(descriptor.tier)
    );
    println!(
        "    {} {}",
        Style::new().bold().apply_to("Location:"),
        descriptor.location
    );
}
