//! Temporary file placement for downloads and staging
//!
//! Temp files never land under the current working directory (e.g. when
//! TMPDIR=tmp or TMPDIR=./tmp).

use std::env;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};

use crate::error::{Result, fs::write_failed};

/// Prefix for every temp file or directory bundlesync creates
pub const TEMP_PREFIX: &str = ".bundlesync-";

/// Returns an absolute directory suitable for temporary files.
pub fn temp_dir_base() -> PathBuf {
    let t = env::temp_dir();
    if t.is_absolute() {
        t
    } else {
        #[cfg(windows)]
        {
            env::var("TEMP")
                .or_else(|_| env::var("TMP"))
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("C:\\Windows\\Temp"))
        }
        #[cfg(not(windows))]
        {
            PathBuf::from("/tmp")
        }
    }
}

/// Fresh temp file for a package download, removed on drop
pub fn download_temp_file() -> Result<NamedTempFile> {
    let base = temp_dir_base();
    tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".download")
        .tempfile_in(&base)
        .map_err(|e| write_failed(base.display().to_string(), e.to_string()))
}

/// Staging directory next to `destination`, so the final rename stays on one filesystem
///
/// The name starts with '.', so inventory scans never pick it up.
pub fn staging_dir_in(parent: &Path) -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempdir_in(parent)
        .map_err(|e| write_failed(parent.display().to_string(), e.to_string()))
}
