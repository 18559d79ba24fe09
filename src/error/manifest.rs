//! Remote manifest errors

use super::BundleSyncError;

/// Creates a manifest fetch failed error
pub fn fetch_failed(reason: impl Into<String>) -> BundleSyncError {
    BundleSyncError::ManifestFetchFailed {
        reason: reason.into(),
    }
}

/// Creates a manifest parse failed error
pub fn parse_failed(path: impl Into<String>, reason: impl Into<String>) -> BundleSyncError {
    BundleSyncError::ManifestParseFailed {
        path: path.into(),
        reason: reason.into(),
    }
}
