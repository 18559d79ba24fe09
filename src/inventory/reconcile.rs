//! Manifest reconciliation
//!
//! Merges a freshly fetched manifest into the inventories: local entries whose
//! version the manifest confirms are upgraded to `Newest` in place, everything
//! else that can be downloaded becomes the new remote inventory.

use tracing::{debug, warn};

use crate::domain::BundleDescriptor;

use super::{LocalInventory, RemoteInventory};

/// What one reconciliation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Replacement remote inventory
    pub remote: RemoteInventory,
    /// Local entries confirmed by the manifest
    pub upgraded: Vec<String>,
    /// Downloadable manifest entries behind the confirmed local ones, for forced cycles
    pub confirmed: RemoteInventory,
    /// Manifest entries ignored (no download address, or unusable name/version)
    pub skipped: Vec<String>,
}

/// Reconcile manifest descriptors against the local inventory
pub fn reconcile(local: &mut LocalInventory, descriptors: Vec<BundleDescriptor>) -> Reconciliation {
    let mut outcome = Reconciliation::default();

    for descriptor in descriptors {
        let confirmed = local
            .get(&descriptor.name)
            .is_some_and(|existing| existing.version == descriptor.version);
        if confirmed {
            local.upgrade_to_newest(&descriptor.name);
            outcome.upgraded.push(descriptor.name.clone());
            if descriptor.location.remote_address().is_some() && descriptor.validate().is_ok() {
                outcome.confirmed.insert(descriptor);
            }
            continue;
        }

        if descriptor.location.remote_address().is_none() {
            debug!(bundle = %descriptor.name, "Manifest entry has no download address, skipping");
            outcome.skipped.push(descriptor.name);
            continue;
        }

        if let Err(e) = descriptor.validate() {
            warn!(bundle = %descriptor.name, error = %e, "Skipping manifest entry");
            outcome.skipped.push(descriptor.name);
            continue;
        }

        outcome.remote.insert(descriptor);
    }

    outcome
}
