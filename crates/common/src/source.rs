use async_trait::async_trait;

use crate::{BookSnapshot, Result};

/// A single-producer stream of snapshots in non-decreasing timestamp order.
///
/// `PacedReplay` implements this for recorded logs.
/// `LiveFeed` implements this for the exchange depth stream.
///
/// The pipeline performs no reordering or deduplication, so implementations
/// must hand snapshots over one at a time in arrival order.
#[async_trait]
pub trait SnapshotSource: Send {
    /// Next snapshot, or `None` once the stream is exhausted.
    async fn next_snapshot(&mut self) -> Result<Option<BookSnapshot>>;
}
