//! Sync completion signals
//!
//! Broadcast to every [`subscribe`](super::BundleSync::subscribe)r. Slow receivers
//! may lag and miss events; the engine never waits on them.

use tokio::sync::broadcast;

use crate::error::BundleSyncError;

/// Capacity of the event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Observable sync progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A manifest fetch finished; `Ok` carries the size of the new remote inventory
    ManifestRetrieved {
        result: Result<usize, BundleSyncError>,
    },
    /// One download cycle is about to fetch `total` bundles
    DownloadsStarted { timestamp: u64, total: usize },
    BundleInstalled { name: String, version: String },
    BundleFailed {
        name: String,
        error: BundleSyncError,
    },
    /// A download cycle completed; `error` is the first per-bundle failure
    DownloadsFinished {
        timestamp: u64,
        error: Option<BundleSyncError>,
    },
}

pub(crate) fn channel() -> broadcast::Sender<SyncEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

/// Send without caring whether anyone listens
pub(crate) fn emit(events: &broadcast::Sender<SyncEvent>, event: SyncEvent) {
    let _ = events.send(event);
}
