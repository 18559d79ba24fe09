//! Coordinator task
//!
//! Single owner of the inventories, flags and pending lookups. Requests and worker
//! completions are handled one at a time, so every reader sees a whole map.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::domain::{BundleDescriptor, LoadedBundle, ProvenanceTier};
use crate::error::{
    BundleSyncError, Result, bundle::not_found, download::failed as download_failed,
    manifest::fetch_failed,
};
use crate::inventory::{
    LocalInventory, LocalScan, RemoteInventory, reconcile, select_for_download, select_forced,
};
use crate::manifest::ManifestFetcher;

use super::command::{Completion, Reply, Request};
use super::dispatcher::{self, PendingRequests, Route};
use super::events::{self, SyncEvent};
use super::install::Installer;
use super::{CycleHandle, CycleReport, InventorySnapshot, SyncPhase, SyncState, SyncStatus, Trigger};

/// Who is waiting for the outstanding manifest fetch
enum ManifestOwner {
    Caller(Reply<Result<RemoteInventory>>),
    Cycle,
}

/// The sync cycle in flight
struct ActiveCycle {
    timestamp: u64,
    force: bool,
    /// State to restore when the cycle is aborted
    prior_state: SyncState,
    waiters: Vec<Reply<Result<CycleReport>>>,
    outstanding: usize,
    installed: Vec<String>,
    failed: Vec<(String, BundleSyncError)>,
}

pub(crate) struct Coordinator {
    store: CacheStore,
    installer: Installer,
    fetcher: Arc<dyn ManifestFetcher>,
    events: broadcast::Sender<SyncEvent>,
    completions: mpsc::UnboundedSender<Completion>,

    local: LocalInventory,
    remote: RemoteInventory,
    /// Manifest entries whose version matched a local bundle
    confirmed: RemoteInventory,
    local_timestamp: Option<u64>,
    state: SyncState,
    manifest_retrieved: bool,
    downloaded: bool,

    manifest_fetch: Option<ManifestOwner>,
    cycle: Option<ActiveCycle>,
    pending: PendingRequests,
}

impl Coordinator {
    pub(crate) fn new(
        store: CacheStore,
        installer: Installer,
        fetcher: Arc<dyn ManifestFetcher>,
        events: broadcast::Sender<SyncEvent>,
        completions: mpsc::UnboundedSender<Completion>,
        scan: LocalScan,
    ) -> Self {
        Self {
            store,
            installer,
            fetcher,
            events,
            completions,
            local: scan.inventory,
            remote: RemoteInventory::new(),
            confirmed: RemoteInventory::new(),
            local_timestamp: scan.last_updated,
            state: SyncState::Unsynced,
            manifest_retrieved: false,
            downloaded: false,
            manifest_fetch: None,
            cycle: None,
            pending: PendingRequests::new(),
        }
    }

    pub(crate) async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        let mut requests_open = true;

        loop {
            if !requests_open && self.is_idle() {
                break;
            }

            tokio::select! {
                request = requests.recv(), if requests_open => match request {
                    Some(request) => self.handle_request(request).await,
                    None => {
                        debug!("All engine handles dropped");
                        requests_open = false;
                    }
                },
                Some(completion) = completions.recv() => self.handle_completion(completion).await,
            }
        }

        debug!(
            abandoned_lookups = self.pending.len(),
            "Sync coordinator stopped"
        );
    }

    fn is_idle(&self) -> bool {
        self.manifest_fetch.is_none() && self.cycle.is_none()
    }

    /// Lookups can be served without waiting
    fn is_fresh(&self) -> bool {
        self.state == SyncState::Synced && self.is_idle()
    }

    async fn handle_request(&mut self, request: Request) {
        match request {
            Request::ServerTimestamp { timestamp, reply } => {
                let trigger = self.on_server_timestamp(timestamp).await;
                let _ = reply.send(trigger);
            }
            Request::Load { name, reply } => self.load(name, reply),
            Request::FetchManifest { reply } => {
                if self.manifest_fetch.is_some() {
                    let _ = reply.send(Err(BundleSyncError::ManifestFetchInProgress));
                } else {
                    self.spawn_manifest_fetch(ManifestOwner::Caller(reply));
                }
            }
            Request::SyncDownloads {
                force,
                timestamp,
                reply,
            } => {
                if self.is_idle() {
                    self.begin_cycle(timestamp, force, reply, SyncPhase::Download);
                    self.start_downloads().await;
                } else {
                    let _ = reply.send(Err(BundleSyncError::SyncInProgress));
                }
            }
            Request::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Request::Inventory { reply } => {
                let _ = reply.send(InventorySnapshot {
                    local: self.local.clone(),
                    remote: self.remote.clone(),
                });
            }
        }
    }

    async fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::ManifestFetched { result } => self.manifest_fetched(result).await,
            Completion::BundleFinished { descriptor, result } => {
                self.bundle_finished(descriptor, result).await;
            }
        }
    }

    fn status(&self) -> SyncStatus {
        SyncStatus {
            state: self.state,
            manifest_retrieved: self.manifest_retrieved,
            downloaded: self.downloaded,
            local_timestamp: self.local_timestamp,
            local_bundles: self.local.len(),
            remote_bundles: self.remote.len(),
            pending_requests: self.pending.len(),
        }
    }

    // ---------------------------------------------------------------------
    // Trigger
    // ---------------------------------------------------------------------

    async fn on_server_timestamp(&mut self, timestamp: u64) -> Trigger {
        if self.cycle.is_some() {
            info!(timestamp, "Sync already in flight, dropping server timestamp");
            return Trigger::Dropped;
        }

        self.local_timestamp = self.read_marker().await;
        if self.local_timestamp == Some(timestamp) {
            info!(timestamp, "Bundles already match server timestamp");
            self.state = SyncState::Synced;
            self.notify_pending();
            return Trigger::AlreadyFresh;
        }

        if !self.is_idle() {
            info!(timestamp, "Manifest fetch in flight, dropping server timestamp");
            return Trigger::Dropped;
        }

        let (reply, outcome) = tokio::sync::oneshot::channel();
        self.begin_cycle(timestamp, false, reply, SyncPhase::Manifest);
        self.spawn_manifest_fetch(ManifestOwner::Cycle);

        Trigger::Started(CycleHandle { timestamp, outcome })
    }

    async fn read_marker(&self) -> Option<u64> {
        let store = self.store.clone();
        let fallback = self.local_timestamp;
        tokio::task::spawn_blocking(move || store.read_marker())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Marker read task failed, using last known timestamp");
                fallback
            })
    }

    fn begin_cycle(
        &mut self,
        timestamp: u64,
        force: bool,
        waiter: Reply<Result<CycleReport>>,
        phase: SyncPhase,
    ) {
        info!(
            timestamp,
            force,
            previous = ?self.local_timestamp,
            "Sync cycle started"
        );
        self.cycle = Some(ActiveCycle {
            timestamp,
            force,
            prior_state: self.state,
            waiters: vec![waiter],
            outstanding: 0,
            installed: Vec::new(),
            failed: Vec::new(),
        });
        self.state = SyncState::Syncing(phase);
    }

    // ---------------------------------------------------------------------
    // Manifest
    // ---------------------------------------------------------------------

    fn spawn_manifest_fetch(&mut self, owner: ManifestOwner) {
        self.manifest_fetch = Some(owner);

        let fetcher = Arc::clone(&self.fetcher);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = match tokio::spawn(async move { fetcher.fetch().await }).await {
                Ok(result) => result,
                Err(e) => Err(fetch_failed(e.to_string())),
            };
            let _ = completions.send(Completion::ManifestFetched { result });
        });
    }

    async fn manifest_fetched(&mut self, result: Result<Vec<BundleDescriptor>>) {
        let owner = self.manifest_fetch.take();

        match result {
            Ok(descriptors) => {
                let reconciled = reconcile(&mut self.local, descriptors);
                info!(
                    remote = reconciled.remote.len(),
                    confirmed = reconciled.upgraded.len(),
                    skipped = reconciled.skipped.len(),
                    "Manifest retrieved"
                );
                self.remote = reconciled.remote;
                self.confirmed = reconciled.confirmed;
                self.manifest_retrieved = true;
                events::emit(
                    &self.events,
                    SyncEvent::ManifestRetrieved {
                        result: Ok(self.remote.len()),
                    },
                );

                match owner {
                    Some(ManifestOwner::Cycle) => self.start_downloads().await,
                    Some(ManifestOwner::Caller(reply)) => {
                        let _ = reply.send(Ok(self.remote.clone()));
                        self.flush_if_fresh();
                    }
                    None => {}
                }
            }
            Err(error) => {
                warn!(error = %error, "Manifest fetch failed");
                events::emit(
                    &self.events,
                    SyncEvent::ManifestRetrieved {
                        result: Err(error.clone()),
                    },
                );

                match owner {
                    Some(ManifestOwner::Cycle) => self.abort_cycle(error),
                    Some(ManifestOwner::Caller(reply)) => {
                        let _ = reply.send(Err(error));
                        self.flush_if_fresh();
                    }
                    None => {}
                }
            }
        }
    }

    /// Manifest failure ends the cycle without touching the marker
    fn abort_cycle(&mut self, error: BundleSyncError) {
        let Some(cycle) = self.cycle.take() else {
            return;
        };
        info!(timestamp = cycle.timestamp, "Sync cycle aborted");
        self.state = cycle.prior_state;
        self.notify_pending();
        for waiter in cycle.waiters {
            let _ = waiter.send(Err(error.clone()));
        }
    }

    // ---------------------------------------------------------------------
    // Downloads
    // ---------------------------------------------------------------------

    async fn start_downloads(&mut self) {
        let Some(force) = self.cycle.as_ref().map(|cycle| cycle.force) else {
            return;
        };
        self.state = SyncState::Syncing(SyncPhase::Download);

        let selected = if force {
            select_forced(&self.remote, &self.confirmed)
        } else {
            select_for_download(&self.local, &self.remote, false)
        };
        let timestamp = match self.cycle.as_mut() {
            Some(cycle) => {
                cycle.outstanding = selected.len();
                cycle.timestamp
            }
            None => return,
        };

        info!(timestamp, bundles = selected.len(), "Downloading bundles");
        events::emit(
            &self.events,
            SyncEvent::DownloadsStarted {
                timestamp,
                total: selected.len(),
            },
        );

        if selected.is_empty() {
            self.finish_cycle().await;
            return;
        }

        for descriptor in selected {
            self.spawn_install(descriptor);
        }
    }

    fn spawn_install(&self, descriptor: BundleDescriptor) {
        let installer = self.installer.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let name = descriptor.name.clone();
            let work = {
                let descriptor = descriptor.clone();
                tokio::spawn(async move { installer.fetch_and_install(&descriptor).await })
            };
            let result = match work.await {
                Ok(result) => result,
                Err(e) => Err(download_failed(name, e.to_string())),
            };
            let _ = completions.send(Completion::BundleFinished { descriptor, result });
        });
    }

    async fn bundle_finished(
        &mut self,
        descriptor: BundleDescriptor,
        result: Result<PathBuf>,
    ) {
        let Some(cycle) = self.cycle.as_mut() else {
            warn!(bundle = %descriptor.name, "Download finished outside a sync cycle");
            return;
        };

        match result {
            Ok(artifact) => {
                self.local.insert(BundleDescriptor::local(
                    &descriptor.name,
                    &descriptor.version,
                    artifact,
                    SystemTime::now(),
                    ProvenanceTier::Newest,
                ));
                cycle.installed.push(descriptor.name.clone());
                events::emit(
                    &self.events,
                    SyncEvent::BundleInstalled {
                        name: descriptor.name,
                        version: descriptor.version,
                    },
                );
            }
            Err(error) => {
                warn!(
                    bundle = %descriptor.name,
                    version = %descriptor.version,
                    error = %error,
                    "Bundle download failed"
                );
                cycle.failed.push((descriptor.name.clone(), error.clone()));
                events::emit(
                    &self.events,
                    SyncEvent::BundleFailed {
                        name: descriptor.name,
                        error,
                    },
                );
            }
        }

        cycle.outstanding = cycle.outstanding.saturating_sub(1);
        if cycle.outstanding == 0 {
            self.finish_cycle().await;
        }
    }

    async fn finish_cycle(&mut self) {
        let Some(cycle) = self.cycle.take() else {
            return;
        };

        self.downloaded = cycle.failed.is_empty();

        let store = self.store.clone();
        let timestamp = cycle.timestamp;
        let written = tokio::task::spawn_blocking(move || store.write_marker(timestamp))
            .await
            .unwrap_or_else(|e| Err(crate::error::fs::io_error(e.to_string())));
        if let Err(e) = written {
            warn!(timestamp, error = %e, "Failed to persist sync timestamp");
        }
        self.local_timestamp = Some(timestamp);
        self.state = SyncState::Synced;

        info!(
            timestamp,
            installed = cycle.installed.len(),
            failed = cycle.failed.len(),
            "Sync cycle finished"
        );

        self.notify_pending();

        let first_error = cycle.failed.first().map(|(_, error)| error.clone());
        events::emit(
            &self.events,
            SyncEvent::DownloadsFinished {
                timestamp,
                error: first_error.clone(),
            },
        );

        let outcome = match first_error {
            Some(error) => Err(error),
            None => Ok(CycleReport {
                timestamp,
                installed: cycle.installed,
            }),
        };
        for waiter in cycle.waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    // ---------------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------------

    fn load(&mut self, name: String, reply: Reply<Result<LoadedBundle>>) {
        match dispatcher::route(
            self.manifest_retrieved,
            self.is_fresh(),
            self.local.contains(&name),
        ) {
            Route::NotFound => {
                debug!(bundle = %name, "Bundle absent from manifest and cache");
                let _ = reply.send(Err(not_found(&name)));
            }
            Route::Queue => {
                debug!(bundle = %name, state = %self.state, "Queueing lookup until sync completes");
                self.pending.push(name, reply);
            }
            Route::Serve => {
                let descriptor = self.local.get(&name).cloned();
                tokio::task::spawn_blocking(move || {
                    dispatcher::resolve_and_reply(&name, descriptor, vec![reply]);
                });
            }
        }
    }

    fn flush_if_fresh(&mut self) {
        if self.is_fresh() {
            self.notify_pending();
        }
    }

    /// Answer every queued lookup from the current local inventory
    fn notify_pending(&mut self) {
        let drained = self.pending.drain();
        if drained.is_empty() {
            return;
        }
        debug!(bundles = drained.len(), "Flushing queued lookups");

        for (name, waiters) in drained {
            let descriptor = self.local.get(&name).cloned();
            tokio::task::spawn_blocking(move || {
                dispatcher::resolve_and_reply(&name, descriptor, waiters);
            });
        }
    }
}
