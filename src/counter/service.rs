//! Visit counter service.
//!
//! [`VisitCounter`] is what the HTTP layer talks to. It ties together:
//! - validation and enqueueing of visits ([`VisitCounter::add`])
//! - timeout-bounded counting with a zero fallback ([`VisitCounter::count`])
//! - image composition ([`VisitCounter::render`], [`VisitCounter::render_png`])
//!
//! # Consistency
//!
//! `add` only enqueues; the write happens later on the queue's worker. A
//! `count` issued right after `add` in the same request will usually not
//! include that visit. Read-after-write is not guaranteed.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         VisitCounter                            │
//! │                                                                 │
//! │   add ──▶ WriteQueue ──▶ worker ──┐                             │
//! │                                   ▼                             │
//! │   count ─────────────────────▶ EventStore                       │
//! │                                                                 │
//! │   render ──▶ Renderer ──▶ ThemeRegistry                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use image::RgbaImage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{RenderError, ValidationError};
use crate::queue::{Enqueued, QueueConfig, QueueStats, WriteQueue};
use crate::render::{encode_png, RenderOptions, Renderer};
use crate::store::{EventStore, QueryEvent, VisitEvent};
use crate::theme::ThemeRegistry;

/// Default bound on request-scoped operations (enqueue wait, count).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(100);

/// Settings for a [`VisitCounter`].
#[derive(Debug, Clone)]
pub struct CounterConfig {
    /// Write queue settings
    pub queue: QueueConfig,

    /// Upper bound on a count; on expiry the count reads as 0
    pub request_timeout: Duration,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Records visits and renders per-domain counts.
///
/// # Type Parameters
///
/// * `S` - The event store backend (e.g. [`crate::store::RedbEventStore`])
pub struct VisitCounter<S: EventStore> {
    store: Arc<S>,
    queue: WriteQueue,
    renderer: Renderer,
    request_timeout: Duration,
}

impl<S: EventStore> VisitCounter<S> {
    /// Create a counter with default settings.
    ///
    /// Spawns the write worker, so this must run inside a Tokio runtime.
    pub fn new(store: S, registry: Arc<ThemeRegistry>) -> Self {
        Self::with_config(Arc::new(store), registry, CounterConfig::default())
    }

    /// Create a counter with a shared store and custom settings.
    pub fn with_config(store: Arc<S>, registry: Arc<ThemeRegistry>, config: CounterConfig) -> Self {
        let queue = WriteQueue::spawn(Arc::clone(&store), config.queue);
        Self {
            store,
            queue,
            renderer: Renderer::new(registry),
            request_timeout: config.request_timeout,
        }
    }

    /// Validate a visit and queue it for persistence.
    ///
    /// Never waits on the store. Returns [`Enqueued::Dropped`] when the queue
    /// had no room; that is logged, not an error.
    pub async fn add(
        &self,
        source_address: Option<IpAddr>,
        domain: &str,
    ) -> Result<Enqueued, ValidationError> {
        if domain.trim().is_empty() {
            return Err(ValidationError::EmptyDomain);
        }
        let source_address = source_address.ok_or(ValidationError::MissingAddress)?;

        let outcome = self
            .queue
            .enqueue(VisitEvent::new(domain, source_address))
            .await;
        debug!(domain, %source_address, ?outcome, "Visit queued");
        Ok(outcome)
    }

    /// Number of stored visits for `domain`.
    ///
    /// Returns 0 for an empty or blank domain, on any store error, and when
    /// the request timeout elapses. Never fails.
    pub async fn count(&self, domain: &str) -> u64 {
        if domain.trim().is_empty() {
            return 0;
        }

        // Fires when we return, so an abandoned scan stops early.
        let cancel = CancellationToken::new();
        let _cancel_on_exit = cancel.clone().drop_guard();

        let query = QueryEvent::new(domain);
        match tokio::time::timeout(self.request_timeout, self.store.count(&query, &cancel)).await
        {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => {
                warn!(domain, error = %e, "Unable to retrieve count from store");
                0
            }
            Err(_) => {
                warn!(
                    domain,
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "Count timed out"
                );
                0
            }
        }
    }

    /// Compose `number` into a counter image.
    pub fn render(&self, options: &RenderOptions, number: u64) -> Result<RgbaImage, RenderError> {
        self.renderer.render(options, number)
    }

    /// Compose `number` and encode it as PNG.
    pub fn render_png(&self, options: &RenderOptions, number: u64) -> Result<Bytes, RenderError> {
        let canvas = self.render(options, number)?;
        encode_png(&canvas)
    }

    /// Number of visits accepted but not yet written.
    pub fn pending_writes(&self) -> usize {
        self.queue.pending()
    }

    /// Written, dropped and pending visit totals.
    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Wait until every accepted visit has been written or dropped.
    pub async fn flush(&self) {
        self.queue.wait_idle().await;
    }

    /// Stop accepting visits and drain the write queue.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }

    /// The underlying event store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The renderer, for callers that only draw.
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }
}

// =============================================================================
// Tests
// =============================================================================
