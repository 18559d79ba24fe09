//! YAML configuration file (`config.yaml`)
//!
//! ```yaml
//! cache_dir: /var/cache/bundlesync
//! prepackaged_dir: /opt/app/bundles
//! manifest: file:///srv/bundles/manifest.json
//! evict_old_versions: true
//! ```
//!
//! Every field is optional. Relative paths are resolved against the directory
//! holding the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{
    Result,
    config::{not_found, parse_failed},
    fs::read_failed,
};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "BUNDLESYNC_CONFIG";

/// File name looked up under the user's configuration directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepackaged_dir: Option<PathBuf>,
    /// Manifest location: a path or a `file://` URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evict_old_versions: Option<bool>,
}

impl ConfigFile {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Read and parse a configuration file, resolving relative paths against it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                not_found(path.display().to_string())
            } else {
                read_failed(path.display().to_string(), e.to_string())
            }
        })?;

        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| parse_failed(path.display().to_string(), e.to_string()))?
        };

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.relative_to(base))
    }

    fn relative_to(self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        Self {
            cache_dir: self.cache_dir.map(resolve),
            prepackaged_dir: self.prepackaged_dir.map(resolve),
            manifest: self.manifest.map(|location| {
                let is_relative_path = !location.contains("://") && Path::new(&location).is_relative();
                if is_relative_path {
                    base.join(location).display().to_string()
                } else {
                    location
                }
            }),
            evict_old_versions: self.evict_old_versions,
        }
    }

    /// Serialize configuration to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// `<config dir>/bundlesync/config.yaml`, when the platform has a config directory
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bundlesync").join(CONFIG_FILE_NAME))
}
