//! Download selection
//!
//! Selects remote entries to download: every entry when forced, otherwise those
//! with no local counterpart or a different local version. Names present only
//! locally are never selected for deletion. A forced cycle also reinstalls the
//! manifest entries that confirmed a local bundle.

use crate::domain::BundleDescriptor;

use super::{LocalInventory, RemoteInventory};

/// Remote descriptors a download cycle has to fetch, in name order
pub fn select_for_download(
    local: &LocalInventory,
    remote: &RemoteInventory,
    force: bool,
) -> Vec<BundleDescriptor> {
    remote
        .iter()
        .filter(|descriptor| {
            force
                || local
                    .get(&descriptor.name)
                    .is_none_or(|existing| existing.version != descriptor.version)
        })
        .cloned()
        .collect()
}

/// Everything a forced cycle reinstalls: the remote inventory plus the manifest
/// entries that confirmed a local bundle, in name order
pub fn select_forced(
    remote: &RemoteInventory,
    confirmed: &RemoteInventory,
) -> Vec<BundleDescriptor> {
    let mut selected: Vec<BundleDescriptor> =
        remote.iter().chain(confirmed.iter()).cloned().collect();
    selected.sort_by(|a, b| a.name.cmp(&b.name));
    selected.dedup_by(|a, b| a.name == b.name);
    selected
}
