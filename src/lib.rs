//! bundlesync - keeps a local cache of versioned resource bundles in sync with a
//! remote manifest
//!
//! The engine ([`engine::BundleSync`]) scans what is already on disk, reconciles
//! it with the manifest when the server reports a new update time, downloads what
//! changed and serves lookups that stay consistent while a sync is running.

pub mod cache;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod extract;
pub mod inventory;
pub mod logging;
pub mod manifest;
pub mod temp;
pub mod transport;

pub use domain::{BundleDescriptor, BundleLocation, LoadedBundle, ProvenanceTier};
pub use engine::{
    BundleSync, CycleHandle, CycleReport, EngineConfig, InventorySnapshot, SyncEvent, SyncPhase,
    SyncState, SyncStatus, Trigger,
};
pub use error::{BundleSyncError, Result};
