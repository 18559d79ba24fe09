//! Local inventory scan
//!
//! Builds the local inventory from two sources, in order:
//!
//! 1. the read-only prepackaged area (`<name>/<version>/<artifact>`), tier `Prepackaged`
//! 2. the writable cache (`<name>/<version>/<artifact>`), tier `LocalCache`
//!
//! Cache entries override prepackaged ones for the same name. Unreadable names or
//! versions are skipped; the scan itself never fails.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::cache::CacheStore;
use crate::domain::{BundleDescriptor, ProvenanceTier, is_valid_component};

use super::LocalInventory;

/// Result of a local scan
#[derive(Debug, Clone, Default)]
pub struct LocalScan {
    pub inventory: LocalInventory,
    /// Persisted server timestamp; `None` means no freshness baseline
    pub last_updated: Option<u64>,
}

/// A version directory found during the scan
#[derive(Debug)]
struct VersionCandidate {
    version: String,
    artifact: PathBuf,
    created_at: SystemTime,
}

/// Scan prepackaged assets and the cache directory
///
/// Blocking.
pub fn rebuild(prepackaged_dir: Option<&Path>, store: &CacheStore) -> LocalScan {
    let mut inventory = LocalInventory::new();

    if let Some(dir) = prepackaged_dir {
        for (name, candidates) in scan_bundle_root(dir) {
            // Version directories come sorted, so the first one is the lexicographically smallest
            if candidates.len() > 1 {
                warn!(
                    bundle = %name,
                    versions = candidates.len(),
                    "Several prepackaged versions found, using the lowest sorting one"
                );
            }
            if let Some(candidate) = candidates.into_iter().next() {
                inventory.insert(candidate.into_descriptor(&name, ProvenanceTier::Prepackaged));
            }
        }
    }

    for (name, candidates) in scan_bundle_root(store.root()) {
        if let Some(candidate) = newest_candidate(candidates) {
            inventory.insert(candidate.into_descriptor(&name, ProvenanceTier::LocalCache));
        }
    }

    let last_updated = store.read_marker();
    debug!(
        bundles = inventory.len(),
        last_updated = ?last_updated,
        "Local inventory rebuilt"
    );

    LocalScan {
        inventory,
        last_updated,
    }
}

/// Latest created candidate; ties keep the earlier one in sorted order
fn newest_candidate(candidates: Vec<VersionCandidate>) -> Option<VersionCandidate> {
    let mut newest: Option<VersionCandidate> = None;
    for candidate in candidates {
        match &newest {
            Some(current) if candidate.created_at <= current.created_at => {}
            _ => newest = Some(candidate),
        }
    }
    newest
}

/// Enumerate `<root>/<name>/<version>/` in sorted order, skipping empty versions
fn scan_bundle_root(root: &Path) -> Vec<(String, Vec<VersionCandidate>)> {
    if !root.is_dir() {
        debug!(root = %root.display(), "Bundle root does not exist, skipping");
        return Vec::new();
    }

    let mut bundles = Vec::new();
    for (name, name_dir) in child_dirs(root) {
        let mut candidates = Vec::new();
        for (version, version_dir) in child_dirs(&name_dir) {
            match first_artifact(&version_dir) {
                Some(artifact) => candidates.push(VersionCandidate {
                    version,
                    artifact,
                    created_at: created_at(&version_dir),
                }),
                None => debug!(
                    bundle = %name,
                    version = %version,
                    "Skipping empty version directory"
                ),
            }
        }
        if !candidates.is_empty() {
            bundles.push((name, candidates));
        }
    }
    bundles
}

/// Sorted subdirectories of `dir` whose names are usable bundle names/versions
fn child_dirs(dir: &Path) -> Vec<(String, PathBuf)> {
    let mut children = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable cache entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if is_valid_component(name) {
            children.push((name.to_string(), entry.into_path()));
        }
    }
    children
}

/// First non-hidden entry of a version directory in sorted order
///
/// Installs pick their artifact with the same rule, so a rescan finds the same one.
pub(crate) fn first_artifact(version_dir: &Path) -> Option<PathBuf> {
    WalkDir::new(version_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .find(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(walkdir::DirEntry::into_path)
}

fn created_at(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|metadata| metadata.created().or_else(|_| metadata.modified()))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

impl VersionCandidate {
    fn into_descriptor(self, name: &str, tier: ProvenanceTier) -> BundleDescriptor {
        BundleDescriptor::local(name, self.version, self.artifact, self.created_at, tier)
    }
}
