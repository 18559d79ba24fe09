//! Cache errors

use super::BundleSyncError;

/// Creates a cache operation failed error
pub fn operation_failed(message: impl Into<String>) -> BundleSyncError {
    BundleSyncError::CacheOperationFailed {
        message: message.into(),
    }
}
