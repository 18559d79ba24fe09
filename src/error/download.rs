//! Per-bundle download errors

use super::BundleSyncError;

/// Creates a download failed error
pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> BundleSyncError {
    BundleSyncError::DownloadFailed {
        name: name.into(),
        reason: reason.into(),
    }
}

/// Creates an extraction failed error
pub fn extraction_failed(name: impl Into<String>, reason: impl Into<String>) -> BundleSyncError {
    BundleSyncError::ExtractionFailed {
        name: name.into(),
        reason: reason.into(),
    }
}

/// Creates an unsupported address error
pub fn unsupported_address(address: impl Into<String>) -> BundleSyncError {
    BundleSyncError::UnsupportedAddress {
        address: address.into(),
    }
}
