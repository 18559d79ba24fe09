//! Cache path utilities and constants
//!
//! ```text
//! <cache root>/
//! ├── .bundles_last_updated      last confirmed server update time (decimal seconds)
//! ├── CACHEDIR.TAG               backup exclusion
//! └── <bundle name>/
//!     └── <version>/
//!         └── <artifact>
//! ```

use std::path::PathBuf;

use crate::error::{Result, cache::operation_failed};

/// Default cache directory name under user's cache directory
const CACHE_DIR: &str = "bundlesync";

/// Environment variable overriding the cache directory
pub const CACHE_DIR_ENV: &str = "BUNDLESYNC_CACHE_DIR";

/// Marker file holding the last confirmed server update time
pub const MARKER_FILE: &str = ".bundles_last_updated";

/// Cache directory tag recognized by backup tools
pub const CACHEDIR_TAG_FILE: &str = "CACHEDIR.TAG";

/// Required first line of a `CACHEDIR.TAG` file
pub const CACHEDIR_TAG_SIGNATURE: &str = "Signature: 8a477f597d28d172789f06886806bc55";

/// Get the default cache directory path
///
/// Uses the platform's standard cache location (e.g. XDG on Linux, Library/Caches on macOS)
/// with a `bundlesync` subdirectory. Can be overridden with the `BUNDLESYNC_CACHE_DIR`
/// environment variable.
pub fn default_cache_dir() -> Result<PathBuf> {
    if let Ok(cache_dir) = std::env::var(CACHE_DIR_ENV) {
        if !cache_dir.trim().is_empty() {
            return Ok(PathBuf::from(cache_dir));
        }
    }

    let base = dirs::cache_dir()
        .ok_or_else(|| operation_failed("Could not determine cache directory"))?;

    Ok(base.join(CACHE_DIR))
}
