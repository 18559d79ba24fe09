//! Bundle domain types
//!
//! A [`BundleDescriptor`] identifies one version of one named bundle, either as
//! found on disk or as published by the remote manifest.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::{Result, bundle::invalid_name};

/// Where a descriptor came from, ordered by how far it can be trusted as "latest"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceTier {
    /// Shipped read-only with the host application
    Prepackaged,
    /// Found in the writable cache directory, not yet confirmed by the manifest
    LocalCache,
    /// Confirmed to match the remote manifest, or freshly downloaded
    Newest,
}

impl fmt::Display for ProvenanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvenanceTier::Prepackaged => write!(f, "prepackaged"),
            ProvenanceTier::LocalCache => write!(f, "local-cache"),
            ProvenanceTier::Newest => write!(f, "newest"),
        }
    }
}

/// Location of a bundle's package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleLocation {
    /// Installed artifact on the local filesystem
    Local(PathBuf),
    /// Address the package can be downloaded from
    Remote(String),
}

impl BundleLocation {
    /// The download address, if this location is a non-blank remote address
    pub fn remote_address(&self) -> Option<&str> {
        match self {
            BundleLocation::Remote(address) if !address.trim().is_empty() => Some(address.trim()),
            _ => None,
        }
    }

    /// The local artifact path, if this location is on disk
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            BundleLocation::Local(path) => Some(path),
            BundleLocation::Remote(_) => None,
        }
    }
}

impl fmt::Display for BundleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleLocation::Local(path) => write!(f, "{}", path.display()),
            BundleLocation::Remote(address) => write!(f, "{address}"),
        }
    }
}

/// One version of one named bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleDescriptor {
    /// Unique key in an inventory
    pub name: String,
    /// Opaque version, compared for equality only
    pub version: String,
    pub location: BundleLocation,
    /// Tie-break among several cached versions of the same name
    pub created_at: SystemTime,
    pub tier: ProvenanceTier,
}

impl BundleDescriptor {
    /// Descriptor for a bundle published by the remote manifest
    pub fn remote(
        name: impl Into<String>,
        version: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            location: BundleLocation::Remote(address.into()),
            created_at: SystemTime::UNIX_EPOCH,
            tier: ProvenanceTier::Newest,
        }
    }

    /// Descriptor for an artifact on the local filesystem
    pub fn local(
        name: impl Into<String>,
        version: impl Into<String>,
        path: impl Into<PathBuf>,
        created_at: SystemTime,
        tier: ProvenanceTier,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            location: BundleLocation::Local(path.into()),
            created_at,
            tier,
        }
    }

    /// Whether the manifest has confirmed this entry (or it was just downloaded)
    pub fn is_newest(&self) -> bool {
        self.tier == ProvenanceTier::Newest
    }

    /// Rejects names or versions that cannot be used as a single cache directory
    pub fn validate(&self) -> Result<()> {
        if !is_valid_component(&self.name) {
            return Err(invalid_name(&self.name));
        }
        if !is_valid_component(&self.version) {
            return Err(invalid_name(format!("{}@{}", self.name, self.version)));
        }
        Ok(())
    }
}

/// Whether `value` can be used verbatim as one directory name in the cache layout
///
/// Hidden names are reserved for the cache's own files (marker, temp files).
pub fn is_valid_component(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('.')
        && !value.contains(['/', '\\', '\0'])
        && value.trim() == value
}
