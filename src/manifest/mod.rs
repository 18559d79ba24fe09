//! Remote manifest collaborator
//!
//! A [`ManifestFetcher`] returns the currently published bundle descriptors. The
//! engine invokes at most one fetch at a time.

pub mod file;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::BundleDescriptor;
use crate::error::{BundleSyncError, Result};

pub use file::FileManifestFetcher;

/// Source of the remote, authoritative bundle list
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    /// Fetch the published descriptors (all or nothing)
    async fn fetch(&self) -> Result<Vec<BundleDescriptor>>;
}

/// Stand-in used when no manifest location is configured
///
/// Every fetch fails, so sync cycles abort and lookups are served from whatever
/// is already cached.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredManifest;

#[async_trait]
impl ManifestFetcher for UnconfiguredManifest {
    async fn fetch(&self) -> Result<Vec<BundleDescriptor>> {
        Err(BundleSyncError::ManifestNotConfigured)
    }
}

/// Manifest document as serialized on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(default)]
    pub bundles: Vec<ManifestEntry>,
}

/// One published bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub version: String,
    /// Download address; entries without one cannot be downloaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ManifestEntry {
    pub fn into_descriptor(self) -> BundleDescriptor {
        BundleDescriptor::remote(self.name, self.version, self.url.unwrap_or_default())
    }
}
