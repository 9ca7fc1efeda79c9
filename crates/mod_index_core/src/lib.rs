//! Mod index reconciliation and soft-delete sweep primitives.
//!
//! This crate owns the cursor-driven enumeration engine, the partition
//! reconciler, the record resolver, the listing stage and the grace-period
//! sweep. It intentionally excludes AWS SDK and Lambda runtime concerns; stores
//! are reached only through the traits in [`store`].

pub mod keys;
pub mod listing;
#[cfg(feature = "test-helpers")]
pub mod memory;
pub mod pagination;
pub mod reconcile;
pub mod record;
pub mod resolve;
pub mod store;
pub mod sweep;
