use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::{EventStore, VisitEvent};

/// Events in flight between enqueue and the end of their write, plus the
/// running tally of how writes ended.
#[derive(Debug, Default)]
pub(super) struct Progress {
    count: AtomicUsize,
    idle: Notify,
    written: AtomicU64,
    dropped: AtomicU64,
}

impl Progress {
    pub(super) fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    pub(super) fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub(super) fn record(&self, committed: bool) {
        let tally = if committed { &self.written } else { &self.dropped };
        tally.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn written(&self) -> u64 {
        self.written.load(Ordering::SeqCst)
    }

    pub(super) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }

    pub(super) async fn wait_idle(&self) {
        loop {
            // Register before checking so a concurrent finish() can't be missed.
            let notified = self.idle.notified();
            if self.get() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// The single consumer of the write queue.
///
/// Events are written one at a time in arrival order. A write that outlives
/// `write_timeout` has its token cancelled and is still awaited, so the next
/// write never starts before it commits or aborts. Whatever the store reports
/// is logged; a failed write drops the event.
pub(super) struct Worker<S: EventStore> {
    pub(super) store: Arc<S>,
    pub(super) receiver: mpsc::Receiver<VisitEvent>,
    pub(super) pending: Arc<Progress>,
    pub(super) write_timeout: Duration,
    pub(super) shutdown: CancellationToken,
}

impl<S: EventStore> Worker<S> {
    pub(super) async fn run(mut self) {
        debug!("Write worker started");

        loop {
            tokio::select! {
                biased;

                event = self.receiver.recv() => match event {
                    Some(event) => self.persist(event).await,
                    None => break,
                },

                _ = self.shutdown.cancelled() => {
                    // Stop intake, then drain whatever was already accepted.
                    self.receiver.close();
                    let mut drained = 0usize;
                    while let Some(event) = self.receiver.recv().await {
                        self.persist(event).await;
                        drained += 1;
                    }
                    info!(drained, "Write queue drained on shutdown");
                    break;
                }
            }
        }

        debug!("Write worker stopped");
    }

    async fn persist(&self, event: VisitEvent) {
        let cancel = CancellationToken::new();
        let _cancel_on_exit = cancel.clone().drop_guard();

        let write = self.store.write(&event, &cancel);
        tokio::pin!(write);

        // A timed out write is cancelled, then awaited until it settles.
        let (result, timed_out) = match tokio::time::timeout(self.write_timeout, &mut write).await
        {
            Ok(result) => (result, false),
            Err(_) => {
                cancel.cancel();
                (write.await, true)
            }
        };

        self.pending.record(result.is_ok());

        match (result, timed_out) {
            (Ok(()), false) => {}
            (Ok(()), true) => {
                warn!(
                    domain = %event.domain,
                    source_address = %event.source_address,
                    timeout_ms = self.write_timeout.as_millis() as u64,
                    "Write exceeded timeout but committed"
                );
            }
            (Err(e), true) => {
                warn!(
                    domain = %event.domain,
                    source_address = %event.source_address,
                    timeout_ms = self.write_timeout.as_millis() as u64,
                    error = %e,
                    "Dropping visit event: write timed out"
                );
            }
            (Err(e), false) => {
                warn!(
                    domain = %event.domain,
                    source_address = %event.source_address,
                    error = %e,
                    "Dropping visit event: write failed"
                );
            }
        }

        self.pending.finish();
    }
}
