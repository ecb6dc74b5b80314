//! Timeout orchestrator.
//!
//! # Data Flow
//! ```text
//! serve(out, handler)
//!     → skip if `out` already committed
//!     → spawn handler task (writes into ResponseBuffer, panics recovered)
//!     → race: handler finished  vs  sleep_until(deadline)
//!     → ResponseBuffer::close(winner)   (arbiter CAS)
//!     → commit(out, winner)             (exactly one write sequence)
//!     → return; a straggling handler keeps running, its writes discarded
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use futures_util::FutureExt;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::Instrument;

use super::arbiter::Outcome;
use super::buffer::ResponseBuffer;
use super::commit::{commit, OutputChannel};
use super::context::RequestContext;
use crate::config::TimeoutConfig;
use crate::observability::metrics::{NoopSink, SharedMetrics};
use crate::resilience::recovery::Recovery;

/// Body sent with the 504 when no message is configured.
pub const DEFAULT_TIMEOUT_MESSAGE: &str = r#"{"status":"timeout","msg":"Gateway Timeout"}"#;

// Deadline used when `now + timeout` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Races a handler against a deadline and commits exactly one response.
#[derive(Clone)]
pub struct TimeoutMiddleware {
    timeout: Duration,
    message: Arc<str>,
    recovery: Recovery,
    metrics: SharedMetrics,
}

impl TimeoutMiddleware {
    pub fn new(timeout: Duration, message: impl Into<Arc<str>>) -> Self {
        Self {
            timeout,
            message: message.into(),
            recovery: Recovery::default(),
            metrics: Arc::new(NoopSink),
        }
    }

    pub fn from_config(config: &TimeoutConfig) -> Self {
        Self::new(Duration::from_millis(config.request_ms), config.message.as_str())
    }

    /// Replace the panic recovery policy.
    pub fn with_recovery(mut self, recovery: Recovery) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Run `handler` under the deadline and commit the winner to `out`.
    ///
    /// Returns `None` when `out` was already committed by an earlier stage and
    /// the race was not installed, otherwise the winning outcome.
    ///
    /// On that skip path `handler` is dropped without being polled: the
    /// earlier stage owns the response, so nothing the handler could write
    /// would reach the client.
    pub async fn serve<O, H, Fut>(&self, out: &mut O, handler: H) -> Option<Outcome>
    where
        O: OutputChannel + ?Sized,
        H: FnOnce(ResponseBuffer, RequestContext) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if out.written() || out.status() != StatusCode::OK {
            tracing::debug!(status = %out.status(), "Response already committed, skipping timeout");
            self.metrics.record_timeout_outcome("skipped");
            return None;
        }

        let now = Instant::now();
        let deadline = now
            .checked_add(self.timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let (ctx, cancel) = RequestContext::new(deadline);
        let buffer = ResponseBuffer::new();
        let (done_tx, done_rx) = oneshot::channel::<()>();

        let handler_buffer = buffer.clone();
        let panic_buffer = buffer.clone();
        let recovery = self.recovery.clone();
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            let run = AssertUnwindSafe(async move { handler(handler_buffer, ctx).await });
            if let Err(payload) = run.catch_unwind().await {
                metrics.record_handler_panic();
                recovery.recover(&panic_buffer, payload.as_ref());
            }
            let _ = done_tx.send(());
        }
        .instrument(tracing::Span::current()));

        // A dropped sender means the task is gone; that counts as finished.
        let outcome = tokio::select! {
            biased;
            _ = done_rx => Outcome::Completed,
            _ = tokio::time::sleep_until(deadline) => Outcome::TimedOut,
        };
        cancel.cancel();

        let parts = buffer.close(outcome)?;
        if outcome == Outcome::TimedOut {
            tracing::warn!(
                timeout_ms = self.timeout.as_millis() as u64,
                buffered_bytes = parts.body.len(),
                "Handler exceeded deadline, responding with 504"
            );
        }
        commit(out, outcome, parts, &self.message);
        self.metrics.record_timeout_outcome(outcome.as_str());
        Some(outcome)
    }
}

impl std::fmt::Debug for TimeoutMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutMiddleware")
            .field("timeout", &self.timeout)
            .field("message", &self.message)
            .field("recovery", &self.recovery)
            .finish_non_exhaustive()
    }
}
