//! AWS-oriented adapters and handlers for the mod index.
//!
//! This crate owns runtime integration details (Lambda handlers, S3-backed
//! stores, environment configuration and log setup) and exposes a single
//! runtime module boundary for the core reconciliation and sweep primitives.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod runtime;
