//! Status command implementation

use console::Style;

use bundlesync::config::Config;
use bundlesync::error::Result;

use super::helpers::{start_engine, timestamp_label};

/// Run status command
pub async fn run(config: Config) -> Result<()> {
    let engine = start_engine(&config).await?;
    let status = engine.status().await?;
    let label = |text: &str| Style::new().bold().apply_to(text.to_string());

    println!("Engine Status:");
    println!("  {} {}", label("Cache:"), config.cache_dir.display());
    println!(
        "  {} {}",
        label("Manifest:"),
        config.manifest.as_deref().unwrap_or("not configured")
    );
    println!("  {} {}", label("State:"), status.state);
    println!(
        "  {} {}",
        label("Last server update:"),
        timestamp_label(status.local_timestamp)
    );
    println!("  {} {}", label("Local bundles:"), status.local_bundles);
    println!(
        "  {} {}",
        label("Eviction:"),
        if config.evict_old_versions { "on" } else { "off" }
    );

    Ok(())
}
