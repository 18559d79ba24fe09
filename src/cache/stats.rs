//! Cache statistics and management
//!
//! Listing, removing, and sizing cached bundles for the `cache` command.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::domain::is_valid_component;
use crate::error::{Result, cache::operation_failed};

use super::CacheStore;

/// Cached bundle information (by bundle name)
#[derive(Debug, Clone)]
pub struct CachedBundle {
    /// Bundle name
    pub name: String,
    /// Cached version directories, sorted
    pub versions: Vec<String>,
    /// Total size in bytes
    pub size: u64,
}

impl CachedBundle {
    /// Format size as human-readable string
    pub fn formatted_size(&self) -> String {
        format_size(self.size)
    }
}

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Number of bundle names cached
    pub bundles: usize,
    /// Number of cached versions (version directories)
    pub versions: usize,
    /// Total size in bytes
    pub total_size: u64,
}

impl CacheStats {
    /// Format total size as human-readable string
    pub fn formatted_size(&self) -> String {
        format_size(self.total_size)
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    let size = bytes as f64;
    if size < 1024.0 {
        format!("{bytes} B")
    } else if size < 1024.0 * 1024.0 {
        format!("{:.1} KB", size / 1024.0)
    } else if size < 1024.0 * 1024.0 * 1024.0 {
        format!("{:.1} MB", size / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", size / (1024.0 * 1024.0 * 1024.0))
    }
}

impl CacheStore {
    /// List all cached bundles with their version directories
    pub fn list_cached_bundles(&self) -> Result<Vec<CachedBundle>> {
        if !self.root().exists() {
            return Ok(Vec::new());
        }

        let mut bundles = Vec::new();

        for entry in WalkDir::new(self.root())
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry =
                entry.map_err(|e| operation_failed(format!("Failed to read cache entry: {e}")))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !entry.file_type().is_dir() || !is_valid_component(&name) {
                continue;
            }

            let mut versions = Vec::new();
            let mut size = 0u64;
            for version in WalkDir::new(entry.path())
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(std::result::Result::ok)
            {
                let version_name = version.file_name().to_string_lossy().to_string();
                if version.file_type().is_dir() && is_valid_component(&version_name) {
                    size += dir_size(version.path())?;
                    versions.push(version_name);
                }
            }

            bundles.push(CachedBundle {
                name,
                versions,
                size,
            });
        }

        Ok(bundles)
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let bundles = self.list_cached_bundles()?;
        Ok(CacheStats {
            bundles: bundles.len(),
            versions: bundles.iter().map(|b| b.versions.len()).sum(),
            total_size: bundles.iter().map(|b| b.size).sum(),
        })
    }

    /// Remove every cached version of one bundle
    pub fn remove_cached_bundle(&self, name: &str) -> Result<()> {
        if !is_valid_component(name) {
            return Err(crate::error::bundle::invalid_name(name));
        }

        let path = self.bundle_dir(name);
        if !path.exists() {
            return Err(operation_failed(format!("Bundle not found in cache: {name}")));
        }

        fs::remove_dir_all(&path)
            .map_err(|e| operation_failed(format!("Failed to remove cached bundle: {e}")))
    }

    /// Remove every cached bundle and the timestamp marker
    ///
    /// The marker goes too: an empty cache must not claim to match a server state.
    pub fn clear(&self) -> Result<()> {
        for bundle in self.list_cached_bundles()? {
            self.remove_cached_bundle(&bundle.name)?;
        }

        let marker = self.marker_path();
        if marker.exists() {
            fs::remove_file(&marker)
                .map_err(|e| operation_failed(format!("Failed to remove timestamp marker: {e}")))?;
        }
        Ok(())
    }
}

/// Calculate directory size recursively
fn dir_size(path: &Path) -> Result<u64> {
    let mut size = 0u64;
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        if entry.file_type().is_file() {
            size += entry
                .metadata()
                .map_err(|e| operation_failed(format!("Failed to get metadata: {e}")))?
                .len();
        }
    }
    Ok(size)
}
