//! Bundle lookup and naming errors

use super::BundleSyncError;

/// Creates a bundle not found error
pub fn not_found(name: impl Into<String>) -> BundleSyncError {
    BundleSyncError::BundleNotFound { name: name.into() }
}

/// Creates a bundle load failed error
pub fn load_failed(
    name: impl Into<String>,
    path: impl Into<String>,
    reason: impl Into<String>,
) -> BundleSyncError {
    BundleSyncError::BundleLoadFailed {
        name: name.into(),
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates an invalid bundle name error
pub fn invalid_name(name: impl Into<String>) -> BundleSyncError {
    BundleSyncError::InvalidBundleName { name: name.into() }
}
