//! Configuration errors

use super::BundleSyncError;

/// Creates a config not found error
pub fn not_found(path: impl Into<String>) -> BundleSyncError {
    BundleSyncError::ConfigNotFound { path: path.into() }
}

/// Creates a config parse failed error
pub fn parse_failed(path: impl Into<String>, reason: impl Into<String>) -> BundleSyncError {
    BundleSyncError::ConfigParseFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates an invalid config error
pub fn invalid(message: impl Into<String>) -> BundleSyncError {
    BundleSyncError::ConfigInvalid {
        message: message.into(),
    }
}
