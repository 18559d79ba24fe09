//! Transport collaborator
//!
//! A [`Transport`] fetches one remote address into a local temporary file. The
//! temp file is deleted when dropped, so installers copy or extract out of it.

pub mod file;

use std::path::PathBuf;

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::error::Result;

pub use file::FileTransport;

/// Downloads bundle packages
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `address` into a fresh temporary file
    async fn download(&self, address: &str) -> Result<NamedTempFile>;
}

/// Filesystem path behind a `file://` URL or a plain path; `None` for other schemes
pub fn local_path_for(address: &str) -> Option<PathBuf> {
    let address = address.trim();
    if address.is_empty() {
        return None;
    }
    if let Some(rest) = address.strip_prefix("file://") {
        let rest = rest.strip_prefix("localhost").unwrap_or(rest);
        return Some(PathBuf::from(rest));
    }
    if address.contains("://") {
        return None;
    }
    Some(PathBuf::from(address))
}

/// Last path segment of an address, ignoring any query or fragment
///
/// `None` when the address has no path segment to name a file after, such as a
/// bare scheme or host.
pub fn remote_file_name(address: &str) -> Option<&str> {
    let path = match address.split_once("://") {
        Some((_, rest)) => &rest[rest.find('/')?..],
        None => address,
    };
    path.split(['?', '#'])
        .next()
        .unwrap_or(path)
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|segment| !segment.is_empty() && !segment.ends_with(':'))
}
