//! Manifest read from the local filesystem
//!
//! Accepts a plain path or a `file://` URL to a JSON [`ManifestDocument`]. Relative
//! bundle URLs resolve against the manifest's directory, so a manifest and its
//! packages can be published side by side.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::BundleDescriptor;
use crate::error::{
    Result,
    download::unsupported_address,
    manifest::{fetch_failed, parse_failed},
};
use crate::transport::local_path_for;

use super::{ManifestDocument, ManifestFetcher};

/// Reads a JSON manifest from disk
#[derive(Debug, Clone)]
pub struct FileManifestFetcher {
    path: PathBuf,
}

impl FileManifestFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Build from a path or `file://` URL
    pub fn from_location(location: &str) -> Result<Self> {
        local_path_for(location)
            .map(Self::new)
            .ok_or_else(|| unsupported_address(location))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.trim().is_empty() || url.contains("://") || Path::new(url).is_absolute() {
            return url.to_string();
        }
        let base = self.path.parent().unwrap_or_else(|| Path::new("."));
        base.join(url).display().to_string()
    }
}

#[async_trait]
impl ManifestFetcher for FileManifestFetcher {
    async fn fetch(&self) -> Result<Vec<BundleDescriptor>> {
        let manifest_path = self.path.display().to_string();
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| fetch_failed(format!("{manifest_path}: {e}")))?;

        let document: ManifestDocument = serde_json::from_str(&content)
            .map_err(|e| parse_failed(&manifest_path, e.to_string()))?;

        debug!(manifest = %manifest_path, entries = document.bundles.len(), "Manifest read");

        Ok(document
            .bundles
            .into_iter()
            .map(|mut entry| {
                entry.url = entry.url.map(|url| self.resolve_url(&url));
                entry.into_descriptor()
            })
            .collect())
    }
}
