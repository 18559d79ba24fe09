//! Single bundle fetch-and-install
//!
//! Downloads one remote descriptor into `<cache>/<name>/<version>`. Packages are
//! staged in a hidden sibling directory and renamed into place, so a failed attempt
//! never leaves a partial version directory behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{CacheStore, EvictionReport};
use crate::domain::BundleDescriptor;
use crate::error::{
    BundleSyncError, Result,
    download::{extraction_failed, failed as download_failed},
};
use crate::extract::{Extractor, is_archive};
use crate::inventory::builder::first_artifact;
use crate::transport::{Transport, remote_file_name};

/// Everything a download worker needs, cheap to clone into each task
#[derive(Clone)]
pub struct Installer {
    pub store: CacheStore,
    pub transport: Arc<dyn Transport>,
    pub extractor: Arc<dyn Extractor>,
    pub evict_old_versions: bool,
}

impl Installer {
    /// Fetch and install `descriptor`, returning the installed artifact path
    ///
    /// Evicts sibling versions afterwards when enabled. Every error is a download
    /// error for this bundle.
    pub async fn fetch_and_install(&self, descriptor: &BundleDescriptor) -> Result<PathBuf> {
        let name = descriptor.name.clone();
        let address = descriptor
            .location
            .remote_address()
            .ok_or_else(|| download_failed(&name, "no download address"))?
            .to_string();

        debug!(bundle = %name, version = %descriptor.version, address = %address, "Downloading bundle");
        let fetched = self
            .transport
            .download(&address)
            .await
            .map_err(|e| as_download_error(&name, e))?;

        let store = self.store.clone();
        let extractor = Arc::clone(&self.extractor);
        let version = descriptor.version.clone();
        let artifact = tokio::task::spawn_blocking({
            let name = name.clone();
            move || {
                install_package(
                    &store,
                    extractor.as_ref(),
                    &name,
                    &version,
                    &address,
                    fetched.path(),
                )
            }
        })
        .await
        .map_err(|e| download_failed(&name, e.to_string()))??;

        info!(bundle = %name, version = %descriptor.version, "Bundle installed");

        if self.evict_old_versions {
            let store = self.store.clone();
            let version = descriptor.version.clone();
            let evicted = tokio::task::spawn_blocking({
                let name = name.clone();
                move || store.evict_siblings(&name, &version)
            })
            .await
            .unwrap_or_else(|e| {
                warn!(bundle = %name, error = %e, "Eviction task failed");
                EvictionReport::default()
            });
            if !evicted.removed.is_empty() {
                debug!(bundle = %name, removed = ?evicted.removed, "Evicted stale versions");
            }
        }

        Ok(artifact)
    }
}

fn as_download_error(name: &str, error: BundleSyncError) -> BundleSyncError {
    if error.is_download_error() {
        error
    } else {
        download_failed(name, error.to_string())
    }
}

/// Stage the fetched file and move it to `<cache>/<name>/<version>`
///
/// Blocking.
fn install_package(
    store: &CacheStore,
    extractor: &dyn Extractor,
    name: &str,
    version: &str,
    address: &str,
    fetched: &Path,
) -> Result<PathBuf> {
    let bundle_dir = store.bundle_dir(name);
    std::fs::create_dir_all(&bundle_dir).map_err(|e| download_failed(name, e.to_string()))?;

    let staging = crate::temp::staging_dir_in(&bundle_dir)
        .map_err(|e| download_failed(name, e.to_string()))?;

    let staged_artifact = if is_archive(address) {
        extractor
            .extract(fetched, staging.path())
            .map_err(|e| extraction_failed(name, e.to_string()))?;
        first_artifact(staging.path())
            .ok_or_else(|| extraction_failed(name, "archive produced no files"))?
    } else {
        let file_name = remote_file_name(address).unwrap_or(name);
        let target = staging.path().join(file_name);
        std::fs::copy(fetched, &target).map_err(|e| download_failed(name, e.to_string()))?;
        target
    };

    let relative = staged_artifact
        .strip_prefix(staging.path())
        .map(Path::to_path_buf)
        .map_err(|e| extraction_failed(name, e.to_string()))?;

    let destination = store.version_dir(name, version);
    if destination.exists() {
        // Forced re-download of an installed version
        std::fs::remove_dir_all(&destination).map_err(|e| download_failed(name, e.to_string()))?;
    }
    std::fs::rename(staging.path(), &destination)
        .map_err(|e| download_failed(name, e.to_string()))?;

    Ok(destination.join(relative))
}
