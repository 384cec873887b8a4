//! The seam between the refresh coordinator and the network.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

/// Retrieves one complete upstream register document.
///
/// Implementations perform the network call with bounded size and time and
/// surface a typed failure. No partial state is kept across calls, which lets
/// the coordinator apply retry policy uniformly.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// Fetch the raw register document.
    async fn fetch(&self) -> Result<Bytes, FetchError>;
}
