//! Bundle cache directory store
//!
//! Owns the on-disk layout of the writable cache:
//!
//! ```text
//! <cache root>/
//! └── <bundle name>/
//!     └── <version>/
//!         └── <artifact>
//! ```
//!
//! plus the timestamp marker recording which server state the cache was last
//! confirmed against, and the `CACHEDIR.TAG` that keeps backup tools out.
//! The layout must stay stable across sessions and releases.

pub mod marker;
pub mod paths;
pub mod stats;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, cache::operation_failed};

pub use paths::{CACHEDIR_TAG_FILE, MARKER_FILE, default_cache_dir};
pub use stats::{CacheStats, CachedBundle};

/// Handle to the cache directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

/// Outcome of removing stale sibling versions of one bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Version directories removed
    pub removed: Vec<String>,
    /// Version directories that could not be removed, with the reason
    pub failed: Vec<(String, String)>,
}

impl CacheStore {
    /// Handle to a cache rooted at `root`, without touching the filesystem
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the cache root if needed and mark it as excluded from backups
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        fs::create_dir_all(&store.root).map_err(|e| {
            operation_failed(format!(
                "Failed to create cache directory {}: {e}",
                store.root.display()
            ))
        })?;
        store.exclude_from_backup()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<name>`
    pub fn bundle_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// `<root>/<name>/<version>`
    pub fn version_dir(&self, name: &str, version: &str) -> PathBuf {
        self.bundle_dir(name).join(version)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.root.join(MARKER_FILE)
    }

    /// Last confirmed server update time, if one was ever persisted
    pub fn read_marker(&self) -> Option<u64> {
        marker::read_marker(&self.marker_path())
    }

    /// Persist a server-issued update time as the new local baseline
    pub fn write_marker(&self, timestamp: u64) -> Result<()> {
        marker::write_marker(&self.marker_path(), timestamp)
    }

    /// Write a `CACHEDIR.TAG` so backup tools skip the cache
    pub fn exclude_from_backup(&self) -> Result<()> {
        let tag = self.root.join(CACHEDIR_TAG_FILE);
        if tag.exists() {
            return Ok(());
        }

        let content = format!(
            "{}\n# This file is a cache directory tag created by bundlesync.\n\
             # For information about cache directory tags see https://bford.info/cachedir/\n",
            paths::CACHEDIR_TAG_SIGNATURE
        );
        fs::write(&tag, content).map_err(|e| {
            operation_failed(format!("Failed to write {}: {e}", tag.display()))
        })
    }

    /// Whether backup exclusion is in place
    pub fn is_excluded_from_backup(&self) -> bool {
        fs::read_to_string(self.root.join(CACHEDIR_TAG_FILE))
            .is_ok_and(|content| content.starts_with(paths::CACHEDIR_TAG_SIGNATURE))
    }

    /// Remove every version directory of `name` except `keep_version`
    ///
    /// Blocking. Failures are logged and reported, never returned as errors.
    pub fn evict_siblings(&self, name: &str, keep_version: &str) -> EvictionReport {
        let mut report = EvictionReport::default();
        let bundle_dir = self.bundle_dir(name);

        let entries = match fs::read_dir(&bundle_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    bundle = name,
                    dir = %bundle_dir.display(),
                    error = %e,
                    "Cannot enumerate versions for eviction"
                );
                return report;
            }
        };

        for entry in entries.flatten() {
            let version = entry.file_name().to_string_lossy().to_string();
            if version == keep_version || !entry.path().is_dir() {
                continue;
            }

            match fs::remove_dir_all(entry.path()) {
                Ok(()) => {
                    debug!(bundle = name, version = %version, "Evicted stale version");
                    report.removed.push(version);
                }
                Err(e) => {
                    warn!(
                        bundle = name,
                        version = %version,
                        error = %e,
                        "Failed to evict stale version"
                    );
                    report.failed.push((version, e.to_string()));
                }
            }
        }

        report.removed.sort();
        report
    }
}
