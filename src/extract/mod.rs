//! Archive extraction collaborator

pub mod tar;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::transport::remote_file_name;

pub use self::tar::TarExtractor;

/// File name suffixes treated as archives, matched case-insensitively
pub const ARCHIVE_EXTENSIONS: &[&str] = &[".tar.gz", ".tgz", ".tar"];

/// Unpacks a downloaded package into a destination directory
pub trait Extractor: Send + Sync {
    /// Extract `source` into `destination`
    ///
    /// Blocking. Returns the top-level entries produced, in archive order.
    fn extract(&self, source: &Path, destination: &Path) -> Result<Vec<PathBuf>>;
}

/// Whether the final path segment of `address` names an archive
pub fn is_archive(address: &str) -> bool {
    remote_file_name(address).is_some_and(|file_name| {
        let file_name = file_name.to_ascii_lowercase();
        ARCHIVE_EXTENSIONS
            .iter()
            .any(|extension| file_name.ends_with(extension) && file_name.len() > extension.len())
    })
}
