//! HTTP client for regcache.
//!
//! This crate provides the network half of the cache synchronization
//! pipeline: a bounded, credentialed fetch of the upstream register document.

pub mod fetch;

pub use fetch::{FetchConfig, RegisterClient};
