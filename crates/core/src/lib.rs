//! Core types and shared functionality for regcache.
//!
//! This crate provides:
//! - The in-memory registry store with atomic snapshot replacement
//! - The record normalizer for the upstream XML register
//! - The disk mirror that lets the cache survive restarts
//! - The refresh coordinator and the shared error taxonomy
//! - Configuration structures

pub mod config;
pub mod error;
pub mod fetcher;
pub mod registry;

pub use config::AppConfig;
pub use error::FetchError;
pub use fetcher::SnapshotFetcher;
pub use registry::{Record, RegistryStore, Snapshot};
