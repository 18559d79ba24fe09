//! Cache command implementation

use bundlesync::cache::CacheStore;
use bundlesync::config::Config;
use bundlesync::error::Result;

use crate::cli::{CacheArgs, CacheSubcommand};

pub fn run(config: &Config, args: CacheArgs) -> Result<()> {
    let store = CacheStore::new(&config.cache_dir);

    // Handle subcommands
    if let Some(command) = args.command {
        match command {
            CacheSubcommand::List => {
                list_cached_bundles(&store)?;
                return Ok(());
            }
            CacheSubcommand::Clear(clear_args) => {
                if let Some(name) = clear_args.only {
                    clean_specific_bundle(&store, &name)?;
                } else {
                    clean_all_cache(&store)?;
                }
                return Ok(());
            }
        }
    }

    // Default: show only cache statistics
    show_cache_stats(&store)?;

    Ok(())
}

fn print_stats_header(store: &CacheStore) -> Result<usize> {
    let stats = store.stats()?;

    println!("Cache Statistics:");
    println!("  Location: {}", store.root().display());
    println!("  Bundles: {}", stats.bundles);
    println!("  Versions: {}", stats.versions);
    println!("  Size: {}", stats.formatted_size());
    match store.read_marker() {
        Some(timestamp) => println!("  Last server update: {timestamp}"),
        None => println!("  Last server update: never"),
    }

    Ok(stats.bundles)
}

fn show_cache_stats(store: &CacheStore) -> Result<()> {
    let bundles = print_stats_header(store)?;

    if bundles == 0 {
        println!("\nCache is empty.");
    } else {
        println!("\nRun 'bundlesync cache list' to list cached bundles.");
        println!("Run 'bundlesync cache clear' to remove everything from cache.");
        println!("Run 'bundlesync cache clear --only <name>' to remove a specific bundle.");
    }

    Ok(())
}

fn list_cached_bundles(store: &CacheStore) -> Result<()> {
    // Same statistics header as `bundlesync cache` before listing
    print_stats_header(store)?;
    println!();

    let bundles = store.list_cached_bundles()?;

    if bundles.is_empty() {
        println!("No cached bundles.");
        return Ok(());
    }

    println!("Cached bundles ({}):", bundles.len());
    for bundle in &bundles {
        println!(
            "  {} ({} version{}, {})",
            bundle.name,
            bundle.versions.len(),
            if bundle.versions.len() == 1 { "" } else { "s" },
            bundle.formatted_size()
        );
        println!("    Versions: {}", bundle.versions.join(", "));
    }

    Ok(())
}

fn clean_all_cache(store: &CacheStore) -> Result<()> {
    store.clear()?;
    println!("Cache cleared successfully.");
    Ok(())
}

fn clean_specific_bundle(store: &CacheStore, name: &str) -> Result<()> {
    store.remove_cached_bundle(name)?;
    println!("Removed cached bundle: {}", name);
    Ok(())
}
