//! Command implementations for bundlesync CLI

pub mod cache;
pub mod helpers;
pub mod list;
pub mod load;
pub mod status;
pub mod sync;
