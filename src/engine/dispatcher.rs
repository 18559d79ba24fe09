//! Load request dispatcher
//!
//! Lookups are served straight from the local inventory once it is known to be
//! fresh. Until then they wait in a per-name queue that is drained exactly once
//! per flush, with every waiter of one name receiving the same outcome.

use std::collections::BTreeMap;

use tokio::sync::oneshot;
use tracing::debug;

use crate::domain::{BundleDescriptor, LoadedBundle};
use crate::error::{Result, bundle::not_found};

/// Where a lookup goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The manifest is authoritative and the bundle is not local
    NotFound,
    /// Wait for the next flush
    Queue,
    /// Resolve from the local inventory now
    Serve,
}

/// Routing policy, checked in order
pub fn route(manifest_retrieved: bool, fresh: bool, has_local: bool) -> Route {
    if manifest_retrieved && !has_local {
        Route::NotFound
    } else if !fresh {
        Route::Queue
    } else {
        Route::Serve
    }
}

/// Lookups waiting for the inventory to become fresh
#[derive(Debug, Default)]
pub struct PendingRequests {
    waiting: BTreeMap<String, Vec<oneshot::Sender<Result<LoadedBundle>>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a waiter behind earlier waiters for the same name
    pub fn push(&mut self, name: impl Into<String>, waiter: oneshot::Sender<Result<LoadedBundle>>) {
        self.waiting.entry(name.into()).or_default().push(waiter);
    }

    /// Total number of queued waiters
    pub fn len(&self) -> usize {
        self.waiting.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    /// Take the whole queue, leaving it empty
    pub fn drain(&mut self) -> BTreeMap<String, Vec<oneshot::Sender<Result<LoadedBundle>>>> {
        std::mem::take(&mut self.waiting)
    }
}

/// Resolve one name against a descriptor snapshot and answer every waiter
///
/// Runs on a blocking worker: opening the artifact walks the package.
pub fn resolve_and_reply(
    name: &str,
    descriptor: Option<BundleDescriptor>,
    waiters: Vec<oneshot::Sender<Result<LoadedBundle>>>,
) {
    let outcome = resolve(name, descriptor.as_ref());
    debug!(
        bundle = name,
        waiters = waiters.len(),
        found = outcome.is_ok(),
        "Answering queued lookups"
    );
    for waiter in waiters {
        // A dropped receiver means the caller gave up
        let _ = waiter.send(outcome.clone());
    }
}

/// Resolve a lookup from a local descriptor
pub fn resolve(name: &str, descriptor: Option<&BundleDescriptor>) -> Result<LoadedBundle> {
    match descriptor {
        Some(descriptor) => LoadedBundle::open(descriptor),
        None => Err(not_found(name)),
    }
}
