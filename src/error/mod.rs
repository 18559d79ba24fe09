//! Error types and handling for bundlesync
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`bundle`]: Bundle lookup and naming errors
//! - [`manifest`]: Remote manifest errors
//! - [`download`]: Per-bundle download and extraction errors
//! - [`cache`]: Cache directory errors
//! - [`fs`]: File system errors
//! - [`config`]: Configuration errors
//!
//! Every variant carries owned strings only, so errors are `Clone`: one failure
//! is handed to every queued lookup and every event subscriber.

pub mod bundle;
pub mod cache;
pub mod config;
pub mod download;
pub mod fs;
pub mod manifest;


use miette::Diagnostic;
use thiserror::Error;

/// Main error type for bundlesync operations
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum BundleSyncError {
    // Bundle errors
    #[error("Bundle '{name}' not found")]
    #[diagnostic(
        code(bundlesync::bundle::not_found),
        help("The bundle is neither cached locally nor published in the remote manifest")
    )]
    BundleNotFound { name: String },

    #[error("Failed to load bundle '{name}' from {path}: {reason}")]
    #[diagnostic(code(bundlesync::bundle::load_failed))]
    BundleLoadFailed {
        name: String,
        path: String,
        reason: String,
    },

    #[error("Invalid bundle name: {name}")]
    #[diagnostic(
        code(bundlesync::bundle::invalid_name),
        help("Bundle names and versions must be single path components without a leading '.'")
    )]
    InvalidBundleName { name: String },

    // Manifest errors
    #[error("Failed to fetch manifest: {reason}")]
    #[diagnostic(code(bundlesync::manifest::fetch_failed))]
    ManifestFetchFailed { reason: String },

    #[error("Failed to parse manifest: {path}: {reason}")]
    #[diagnostic(code(bundlesync::manifest::parse_failed))]
    ManifestParseFailed { path: String, reason: String },

    #[error("A manifest fetch is already in progress")]
    #[diagnostic(code(bundlesync::manifest::in_progress))]
    ManifestFetchInProgress,

    #[error("No manifest source configured")]
    #[diagnostic(
        code(bundlesync::manifest::not_configured),
        help("Pass --manifest <path> or set BUNDLESYNC_MANIFEST")
    )]
    ManifestNotConfigured,

    // Download errors
    #[error("Failed to download bundle '{name}': {reason}")]
    #[diagnostic(code(bundlesync::download::failed))]
    DownloadFailed { name: String, reason: String },

    #[error("Failed to extract bundle '{name}': {reason}")]
    #[diagnostic(code(bundlesync::download::extraction_failed))]
    ExtractionFailed { name: String, reason: String },

    #[error("Unsupported download address: {address}")]
    #[diagnostic(
        code(bundlesync::download::unsupported_address),
        help("The file transport accepts file:// URLs and plain filesystem paths")
    )]
    UnsupportedAddress { address: String },

    // Sync state errors
    #[error("A sync cycle is already in progress")]
    #[diagnostic(code(bundlesync::sync::in_progress))]
    SyncInProgress,

    #[error("The sync engine has stopped")]
    #[diagnostic(code(bundlesync::sync::stopped))]
    EngineStopped,

    #[error("No server timestamp known")]
    #[diagnostic(
        code(bundlesync::sync::no_timestamp),
        help("Run 'bundlesync sync --timestamp <secs>' first or pass --timestamp")
    )]
    NoServerTimestamp,

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    #[diagnostic(code(bundlesync::config::not_found))]
    ConfigNotFound { path: String },

    #[error("Failed to parse configuration file: {path}: {reason}")]
    #[diagnostic(code(bundlesync::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(bundlesync::config::invalid))]
    ConfigInvalid { message: String },

    // File system errors
    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(bundlesync::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}: {reason}")]
    #[diagnostic(code(bundlesync::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(bundlesync::fs::io_error))]
    IoError { message: String },

    // Cache errors
    #[error("Cache operation failed: {message}")]
    #[diagnostic(code(bundlesync::cache::operation_failed))]
    CacheOperationFailed { message: String },
}

impl BundleSyncError {
    /// Whether this error belongs to a single bundle's download (extraction included)
    pub fn is_download_error(&self) -> bool {
        matches!(
            self,
            BundleSyncError::DownloadFailed { .. }
                | BundleSyncError::ExtractionFailed { .. }
                | BundleSyncError::UnsupportedAddress { .. }
        )
    }
}

impl From<std::io::Error> for BundleSyncError {
    fn from(err: std::io::Error) -> Self {
        BundleSyncError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for BundleSyncError {
    fn from(err: serde_yaml::Error) -> Self {
        BundleSyncError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BundleSyncError {
    fn from(err: serde_json::Error) -> Self {
        BundleSyncError::ManifestParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, BundleSyncError>;
