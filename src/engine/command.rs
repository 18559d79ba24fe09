//! Messages into the coordinator task
//!
//! ```text
//! BundleSync handles ──► Request ────┐
//!                                    ├──► coordinator (owns inventories + queue)
//! worker tasks ────────► Completion ─┘
//! ```
//!
//! Every request carries a oneshot sender for its reply.

use std::path::PathBuf;

use tokio::sync::oneshot;

use crate::domain::{BundleDescriptor, LoadedBundle};
use crate::error::Result;
use crate::inventory::RemoteInventory;

use super::{CycleReport, InventorySnapshot, SyncStatus, Trigger};

pub(crate) type Reply<T> = oneshot::Sender<T>;

/// Caller requests
pub(crate) enum Request {
    ServerTimestamp {
        timestamp: u64,
        reply: Reply<Trigger>,
    },
    Load {
        name: String,
        reply: Reply<Result<LoadedBundle>>,
    },
    FetchManifest {
        reply: Reply<Result<RemoteInventory>>,
    },
    SyncDownloads {
        force: bool,
        timestamp: u64,
        reply: Reply<Result<CycleReport>>,
    },
    Status {
        reply: Reply<SyncStatus>,
    },
    Inventory {
        reply: Reply<InventorySnapshot>,
    },
}

/// Worker task results
pub(crate) enum Completion {
    ManifestFetched {
        result: Result<Vec<BundleDescriptor>>,
    },
    BundleFinished {
        descriptor: BundleDescriptor,
        result: Result<PathBuf>,
    },
}
