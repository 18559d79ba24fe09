//! Configuration for bundlesync
//!
//! Settings are resolved in layers, later ones winning:
//!
//! 1. built-in defaults (platform cache directory, eviction on)
//! 2. the YAML file from `--config` / `BUNDLESYNC_CONFIG`, or
//!    `<config dir>/bundlesync/config.yaml` when it exists
//! 3. command line flags and their environment variables

pub mod file;

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::default_cache_dir;
use crate::engine::EngineConfig;
use crate::error::{BundleSyncError, Result, config::invalid};
use crate::manifest::{FileManifestFetcher, ManifestFetcher, UnconfiguredManifest};

pub use file::{CONFIG_ENV, CONFIG_FILE_NAME, ConfigFile, default_config_path};

/// Values supplied on the command line (or through their environment variables)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub prepackaged_dir: Option<PathBuf>,
    pub manifest: Option<String>,
    pub no_evict: bool,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub prepackaged_dir: Option<PathBuf>,
    pub manifest: Option<String>,
    pub evict_old_versions: bool,
}

impl Config {
    /// Resolve defaults, the configuration file and overrides
    ///
    /// An explicitly named file must exist; the default location is optional.
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let file = match &overrides.config {
            Some(path) => ConfigFile::load(path)?,
            None => match default_config_path().filter(|path| path.is_file()) {
                Some(path) => ConfigFile::load(&path)?,
                None => ConfigFile::default(),
            },
        };

        Self::merge(file, overrides)
    }

    fn merge(file: ConfigFile, overrides: &Overrides) -> Result<Self> {
        let cache_dir = match overrides.cache_dir.clone().or(file.cache_dir) {
            Some(dir) => dir,
            None => default_cache_dir()?,
        };
        if cache_dir.as_os_str().is_empty() {
            return Err(invalid("cache_dir must not be empty"));
        }

        let manifest = overrides
            .manifest
            .clone()
            .or(file.manifest)
            .filter(|location| !location.trim().is_empty());

        Ok(Self {
            cache_dir,
            prepackaged_dir: overrides.prepackaged_dir.clone().or(file.prepackaged_dir),
            manifest,
            evict_old_versions: !overrides.no_evict && file.evict_old_versions.unwrap_or(true),
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            cache_dir: self.cache_dir.clone(),
            prepackaged_dir: self.prepackaged_dir.clone(),
            evict_old_versions: self.evict_old_versions,
        }
    }

    /// Manifest fetcher for the configured location
    ///
    /// Without a manifest, every fetch fails with [`BundleSyncError::ManifestNotConfigured`].
    pub fn manifest_fetcher(&self) -> Result<Arc<dyn ManifestFetcher>> {
        match &self.manifest {
            Some(location) => Ok(Arc::new(FileManifestFetcher::from_location(location)?)),
            None => Ok(Arc::new(UnconfiguredManifest)),
        }
    }

    /// Fail early for commands that cannot work without a manifest
    pub fn require_manifest(&self) -> Result<&str> {
        self.manifest
            .as_deref()
            .ok_or(BundleSyncError::ManifestNotConfigured)
    }
}
