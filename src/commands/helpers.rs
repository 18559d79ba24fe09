//! Command helper utilities

use std::sync::Arc;

use console::Style;

use bundlesync::config::Config;
use bundlesync::error::Result;
use bundlesync::extract::TarExtractor;
use bundlesync::transport::FileTransport;
use bundlesync::{BundleSync, ProvenanceTier};

/// Start an engine over the configured cache, manifest and filesystem transport
pub async fn start_engine(config: &Config) -> Result<BundleSync> {
    BundleSync::start(
        config.engine_config(),
        config.manifest_fetcher()?,
        Arc::new(FileTransport::new()),
        Arc::new(TarExtractor::new()),
    )
    .await
}

/// Colored provenance label
pub fn tier_label(tier: ProvenanceTier) -> String {
    let style = match tier {
        ProvenanceTier::Newest => Style::new().green(),
        ProvenanceTier::LocalCache => Style::new().yellow(),
        ProvenanceTier::Prepackaged => Style::new().cyan(),
    };
    style.apply_to(tier.to_string()).to_string()
}

/// "never" for a missing server time
pub fn timestamp_label(timestamp: Option<u64>) -> String {
    match timestamp {
        Some(timestamp) => timestamp.to_string(),
        None => "never".to_string(),
    }
}
