use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::StorageError;

use super::event::{QueryEvent, VisitEvent};

/// Persists visit events and counts them per domain.
///
/// Every operation takes a [`CancellationToken`]. Implementations must stop
/// work and return [`StorageError::Cancelled`] once it fires, without leaving
/// a partially applied write behind.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Append an event to its domain's shard.
    async fn write(
        &self,
        event: &VisitEvent,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError>;

    /// Count stored events whose domain equals `query.domain` exactly.
    ///
    /// Returns [`StorageError::EmptyDomain`] for an empty domain.
    async fn count(&self, query: &QueryEvent, cancel: &CancellationToken)
        -> Result<u64, StorageError>;
}
