//! Domain models for bundlesync
//!
//! This module contains pure domain objects: bundle descriptors, their provenance,
//! and the artifacts handed back to callers by a lookup.

pub mod artifact;
pub mod bundle;

pub use artifact::LoadedBundle;
pub use bundle::{BundleDescriptor, BundleLocation, ProvenanceTier, is_valid_component};
