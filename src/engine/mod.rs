//! Bundle sync engine
//!
//! [`BundleSync`] is a cheap, cloneable handle onto one coordinator task that owns
//! the local and remote inventories, the freshness flags and the queue of pending
//! lookups. Handles talk to it over a channel and wait for replies on oneshots;
//! download workers report back over a second channel. Nothing else touches the
//! inventories, so no locks are involved.
//!
//! # Sync cycle
//!
//! ```text
//! on_server_timestamp(ts)
//!   ├─ ts == persisted marker ──► Synced, flush queued lookups
//!   ├─ cycle already in flight ─► ts dropped
//!   └─ otherwise ───────────────► Syncing(Manifest) ─► Syncing(Download) ─► Synced
//!                                   (fetch manifest)    (fan out installs)   (write marker, flush)
//! ```
//!
//! A timestamp dropped while a cycle is in flight is not lost for good: the
//! running cycle persists its own timestamp, so the next timestamp the host
//! delivers differs from the marker and starts a corrective cycle.

mod command;
mod coordinator;
pub mod dispatcher;
pub mod events;
pub mod install;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::cache::CacheStore;
use crate::domain::{LoadedBundle, is_valid_component};
use crate::error::{BundleSyncError, Result, bundle::invalid_name};
use crate::extract::Extractor;
use crate::inventory::{LocalInventory, RemoteInventory, rebuild};
use crate::manifest::ManifestFetcher;
use crate::transport::Transport;

use command::{Reply, Request};
use coordinator::Coordinator;
use install::Installer;

pub use dispatcher::Route;
pub use events::SyncEvent;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Writable cache root
    pub cache_dir: PathBuf,
    /// Read-only bundles shipped with the application
    pub prepackaged_dir: Option<PathBuf>,
    /// Remove older version directories after installing a new version
    pub evict_old_versions: bool,
}

impl EngineConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            prepackaged_dir: None,
            evict_old_versions: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Manifest,
    Download,
}

/// Coordinator state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Unsynced,
    Syncing(SyncPhase),
    /// The local inventory is known to match the last server timestamp seen
    Synced,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Unsynced => write!(f, "unsynced"),
            SyncState::Syncing(SyncPhase::Manifest) => write!(f, "syncing (manifest)"),
            SyncState::Syncing(SyncPhase::Download) => write!(f, "syncing (downloads)"),
            SyncState::Synced => write!(f, "synced"),
        }
    }
}

/// What a server timestamp caused
#[derive(Debug)]
pub enum Trigger {
    /// The timestamp matches the marker; nothing to fetch
    AlreadyFresh,
    /// A new cycle is running towards this timestamp
    Started(CycleHandle),
    /// Another cycle was already in flight, the timestamp was ignored
    Dropped,
}

/// Waits for the outcome of one sync cycle
#[derive(Debug)]
pub struct CycleHandle {
    timestamp: u64,
    outcome: oneshot::Receiver<Result<CycleReport>>,
}

impl CycleHandle {
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Resolves when the cycle completes
    ///
    /// Fails with the manifest error when the manifest fetch failed, or with the
    /// first per-bundle error when any download failed.
    pub async fn wait(self) -> Result<CycleReport> {
        self.outcome
            .await
            .map_err(|_| BundleSyncError::EngineStopped)?
    }
}

/// Summary of a successful download cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub timestamp: u64,
    /// Names installed, in completion order
    pub installed: Vec<String>,
}

/// Point-in-time view of the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub state: SyncState,
    pub manifest_retrieved: bool,
    /// Last download cycle completed without errors
    pub downloaded: bool,
    pub local_timestamp: Option<u64>,
    pub local_bundles: usize,
    pub remote_bundles: usize,
    pub pending_requests: usize,
}

/// Copy of both inventories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySnapshot {
    pub local: LocalInventory,
    pub remote: RemoteInventory,
}

/// Handle to a running sync engine
#[derive(Clone)]
pub struct BundleSync {
    requests: mpsc::UnboundedSender<Request>,
    events: broadcast::Sender<SyncEvent>,
}

impl BundleSync {
    /// Scan the local inventory and start the coordinator task
    ///
    /// Must be called inside a tokio runtime. The coordinator stops once every
    /// handle is dropped and no work is in flight.
    pub async fn start(
        config: EngineConfig,
        fetcher: Arc<dyn ManifestFetcher>,
        transport: Arc<dyn Transport>,
        extractor: Arc<dyn Extractor>,
    ) -> Result<Self> {
        let EngineConfig {
            cache_dir,
            prepackaged_dir,
            evict_old_versions,
        } = config;

        let (store, scan) = tokio::task::spawn_blocking(move || {
            let store = CacheStore::open(cache_dir)?;
            let scan = rebuild(prepackaged_dir.as_deref(), &store);
            Ok::<_, BundleSyncError>((store, scan))
        })
        .await
        .map_err(|e| crate::error::fs::io_error(e.to_string()))??;

        debug!(
            cache = %store.root().display(),
            bundles = scan.inventory.len(),
            "Starting sync engine"
        );

        let installer = Installer {
            store: store.clone(),
            transport,
            extractor,
            evict_old_versions,
        };

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let events = events::channel();

        let coordinator = Coordinator::new(
            store,
            installer,
            fetcher,
            events.clone(),
            completion_tx,
            scan,
        );
        tokio::spawn(coordinator.run(request_rx, completion_rx));

        Ok(Self {
            requests: request_tx,
            events,
        })
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Request) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(make(reply))
            .map_err(|_| BundleSyncError::EngineStopped)?;
        response.await.map_err(|_| BundleSyncError::EngineStopped)
    }

    /// Report the server's "bundles last updated" time
    pub async fn on_server_timestamp(&self, timestamp: u64) -> Result<Trigger> {
        self.call(|reply| Request::ServerTimestamp { timestamp, reply })
            .await
    }

    /// Look up a bundle, waiting for an in-flight sync when the inventory is not yet fresh
    pub async fn load(&self, name: &str) -> Result<LoadedBundle> {
        if !is_valid_component(name) {
            return Err(invalid_name(name));
        }
        let name = name.to_string();
        self.call(|reply| Request::Load { name, reply }).await?
    }

    /// Fetch the manifest and reconcile it, without downloading
    pub async fn fetch_manifest(&self) -> Result<RemoteInventory> {
        self.call(|reply| Request::FetchManifest { reply }).await?
    }

    /// Download everything the current remote inventory has that the local one lacks
    ///
    /// `timestamp` is persisted as the new marker when the cycle completes.
    pub async fn sync_downloads(&self, force: bool, timestamp: u64) -> Result<CycleReport> {
        self.call(|reply| Request::SyncDownloads {
            force,
            timestamp,
            reply,
        })
        .await?
    }

    pub async fn status(&self) -> Result<SyncStatus> {
        self.call(|reply| Request::Status { reply }).await
    }

    pub async fn inventory(&self) -> Result<InventorySnapshot> {
        self.call(|reply| Request::Inventory { reply }).await
    }

    /// Receive sync events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }
}

impl fmt::Debug for BundleSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleSync")
            .field("closed", &self.requests.is_closed())
            .finish()
    }
}
