//! Bounded write queue.
//!
//! Request handlers record visits by enqueueing them here; a single worker
//! task persists them to the [`EventStore`]. Request latency therefore never
//! depends on store latency:
//!
//! ```text
//!  request ──enqueue──▶ ┌──────────────────────┐      ┌─────────────┐
//!  request ──enqueue──▶ │ mpsc (capacity 100)  │ ───▶ │   Worker    │ ──write──▶ EventStore
//!  request ──enqueue──▶ └──────────────────────┘      └─────────────┘
//! ```
//!
//! # Delivery
//!
//! Best effort. An enqueue that cannot find room within the enqueue timeout
//! drops the event. A write that fails or times out is logged and the event
//! is dropped. There is no retry and no dead-letter path.

mod worker;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::store::{EventStore, VisitEvent};

use worker::{Progress, Worker};

/// Default number of events the queue can hold.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default bound on how long an enqueue may wait for room.
pub const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(100);

/// Default bound on a single store write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of an enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The event is queued and will be written by the worker
    Accepted,

    /// The queue was full or shut down; the event was discarded
    Dropped,
}

/// Counters describing what happened to enqueued events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Accepted and not yet settled
    pub pending: usize,

    /// Committed by the store
    pub written: u64,

    /// Rejected by a full or closed queue, or by a failed write
    pub dropped: u64,
}

/// Write queue settings.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of queued events
    pub capacity: usize,

    /// How long an enqueue may wait for room before dropping
    pub enqueue_timeout: Duration,

    /// How long the worker waits for a single write
    pub write_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            enqueue_timeout: DEFAULT_ENQUEUE_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// Bounded queue with a dedicated worker task writing to an [`EventStore`].
pub struct WriteQueue {
    sender: mpsc::Sender<VisitEvent>,
    pending: Arc<Progress>,
    enqueue_timeout: Duration,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WriteQueue {
    /// Create the queue and spawn its worker on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime or with a zero capacity.
    pub fn spawn<S: EventStore>(store: Arc<S>, config: QueueConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.capacity);
        let pending = Arc::new(Progress::default());
        let shutdown = CancellationToken::new();

        let worker = Worker {
            store,
            receiver,
            pending: Arc::clone(&pending),
            write_timeout: config.write_timeout,
            shutdown: shutdown.clone(),
        };
        let handle = tokio::spawn(worker.run());

        Self {
            sender,
            pending,
            enqueue_timeout: config.enqueue_timeout,
            shutdown,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Queue an event for persistence.
    ///
    /// Waits at most the configured enqueue timeout for room.
    pub async fn enqueue(&self, event: VisitEvent) -> Enqueued {
        self.pending.begin();

        match self.sender.send_timeout(event, self.enqueue_timeout).await {
            Ok(()) => Enqueued::Accepted,
            Err(SendTimeoutError::Timeout(event)) => {
                self.pending.record(false);
                self.pending.finish();
                warn!(
                    domain = %event.domain,
                    capacity = self.capacity(),
                    "Write queue full, dropping visit event"
                );
                Enqueued::Dropped
            }
            Err(SendTimeoutError::Closed(event)) => {
                self.pending.record(false);
                self.pending.finish();
                warn!(
                    domain = %event.domain,
                    "Write queue closed, dropping visit event"
                );
                Enqueued::Dropped
            }
        }
    }

    /// Number of accepted events the worker has not finished with.
    pub fn pending(&self) -> usize {
        self.pending.get()
    }

    /// Snapshot of queue activity since it was spawned.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.pending.get(),
            written: self.pending.written(),
            dropped: self.pending.dropped(),
        }
    }

    /// Maximum number of queued events.
    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Wait until every accepted event has been written or dropped.
    pub async fn wait_idle(&self) {
        self.pending.wait_idle().await;
    }

    /// Stop accepting events, drain the queue and wait for the worker to exit.
    ///
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Write worker terminated abnormally");
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
