//! In-memory bundle inventories
//!
//! - [`LocalInventory`]: bundles available on this machine (prepackaged or cached)
//! - [`RemoteInventory`]: manifest entries that still need a download
//!
//! Both are keyed by bundle name, so each holds at most one descriptor per name.

pub mod builder;
pub mod diff;
pub mod reconcile;

use std::collections::BTreeMap;

use crate::domain::{BundleDescriptor, ProvenanceTier};

pub use builder::{LocalScan, rebuild};
pub use diff::{select_for_download, select_forced};
pub use reconcile::{Reconciliation, reconcile};

/// Bundles available locally, one descriptor per name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalInventory {
    bundles: BTreeMap<String, BundleDescriptor>,
}

impl LocalInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&BundleDescriptor> {
        self.bundles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bundles.contains_key(name)
    }

    /// Install a descriptor, replacing any previous entry for the same name
    pub fn insert(&mut self, descriptor: BundleDescriptor) -> Option<BundleDescriptor> {
        self.bundles.insert(descriptor.name.clone(), descriptor)
    }

    /// Mark the entry for `name` as confirmed by the manifest
    ///
    /// Returns false when there is no such entry.
    pub fn upgrade_to_newest(&mut self, name: &str) -> bool {
        match self.bundles.get_mut(name) {
            Some(descriptor) => {
                descriptor.tier = ProvenanceTier::Newest;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BundleDescriptor> {
        self.bundles.values()
    }
}

impl FromIterator<BundleDescriptor> for LocalInventory {
    fn from_iter<I: IntoIterator<Item = BundleDescriptor>>(iter: I) -> Self {
        let mut inventory = Self::new();
        for descriptor in iter {
            inventory.insert(descriptor);
        }
        inventory
    }
}

/// Manifest entries not already satisfied locally, one descriptor per name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteInventory {
    bundles: BTreeMap<String, BundleDescriptor>,
}

impl RemoteInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&BundleDescriptor> {
        self.bundles.get(name)
    }

    pub fn insert(&mut self, descriptor: BundleDescriptor) -> Option<BundleDescriptor> {
        self.bundles.insert(descriptor.name.clone(), descriptor)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BundleDescriptor> {
        self.bundles.values()
    }
}

impl FromIterator<BundleDescriptor> for RemoteInventory {
    fn from_iter<I: IntoIterator<Item = BundleDescriptor>>(iter: I) -> Self {
        let mut inventory = Self::new();
        for descriptor in iter {
            inventory.insert(descriptor);
        }
        inventory
    }
}
