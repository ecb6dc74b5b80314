//! Per-request deadline and cancellation.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Deadline shared read-only between the handler task and the orchestrator.
///
/// Cancellation is cooperative: a handler may poll `is_cancelled` or await
/// `cancelled` to stop early, but nothing forces it to.
#[derive(Debug, Clone)]
pub struct RequestContext {
    deadline: Instant,
    cancelled: watch::Receiver<bool>,
}

/// Orchestrator side of a `RequestContext`. Dropping it also cancels.
#[derive(Debug)]
pub(crate) struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub(crate) fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl RequestContext {
    pub(crate) fn new(deadline: Instant) -> (Self, CancelHandle) {
        let (tx, cancelled) = watch::channel(false);
        (Self { deadline, cancelled }, CancelHandle { tx })
    }

    /// Instant at which the request times out.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Whether the request was resolved or abandoned.
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow() || self.cancelled.has_changed().is_err()
    }

    /// Wait until the request is resolved or abandoned.
    pub async fn cancelled(&self) {
        let mut rx = self.cancelled.clone();
        // Err means the handle was dropped, which counts as cancelled.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
