//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the metrics capability components receive explicitly
//! - Back it with the `metrics` facade and a Prometheus exporter
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status
//! - `http_request_duration_seconds` (histogram): latency by method, status
//! - `http_response_size_bytes` (histogram): body size by method, when known
//! - `http_timeout_outcomes_total` (counter): completed / timed_out / skipped
//! - `http_handler_panics_total` (counter): panics caught by recovery
//!
//! # Design Decisions
//! - Components hold an `Arc<dyn MetricsSink>`; nothing calls the facade directly
//! - `NoopSink` is the default so tests and libraries need no recorder

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Capability for recording request-level metrics.
pub trait MetricsSink: Send + Sync + 'static {
    /// One finished request.
    fn record_request(&self, method: &Method, status: StatusCode, elapsed: Duration);

    /// Body size of one finished response.
    fn record_response_size(&self, method: &Method, bytes: u64);

    /// How the timeout race for one request ended.
    fn record_timeout_outcome(&self, outcome: &'static str);

    /// A handler panic caught by the recovery boundary.
    fn record_handler_panic(&self);
}

/// Shared handle type passed to components.
pub type SharedMetrics = Arc<dyn MetricsSink>;

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record_request(&self, _method: &Method, _status: StatusCode, _elapsed: Duration) {}

    fn record_response_size(&self, _method: &Method, _bytes: u64) {}

    fn record_timeout_outcome(&self, _outcome: &'static str) {}

    fn record_handler_panic(&self) {}
}

/// Sink forwarding to the installed `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusSink;

impl MetricsSink for PrometheusSink {
    fn record_request(&self, method: &Method, status: StatusCode, elapsed: Duration) {
        let method = method.to_string();
        let status = status.as_u16().to_string();
        metrics::counter!(
            "http_requests_total",
            "method" => method.clone(),
            "status" => status.clone()
        )
        .increment(1);
        metrics::histogram!(
            "http_request_duration_seconds",
            "method" => method,
            "status" => status
        )
        .record(elapsed.as_secs_f64());
    }

    fn record_response_size(&self, method: &Method, bytes: u64) {
        metrics::histogram!("http_response_size_bytes", "method" => method.to_string())
            .record(bytes as f64);
    }

    fn record_timeout_outcome(&self, outcome: &'static str) {
        metrics::counter!("http_timeout_outcomes_total", "outcome" => outcome).increment(1);
    }

    fn record_handler_panic(&self) {
        metrics::counter!("http_handler_panics_total").increment(1);
    }
}

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<SharedMetrics, BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(Arc::new(PrometheusSink))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Sink that remembers what it was told.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub requests: Mutex<Vec<(Method, StatusCode)>>,
        pub response_sizes: Mutex<Vec<u64>>,
        pub outcomes: Mutex<Vec<&'static str>>,
        pub panics: Mutex<usize>,
    }

    impl MetricsSink for RecordingSink {
        fn record_request(&self, method: &Method, status: StatusCode, _elapsed: Duration) {
            self.requests.lock().unwrap().push((method.clone(), status));
        }

        fn record_response_size(&self, _method: &Method, bytes: u64) {
            self.response_sizes.lock().unwrap().push(bytes);
        }

        fn record_timeout_outcome(&self, outcome: &'static str) {
            self.outcomes.lock().unwrap().push(outcome);
        }

        fn record_handler_panic(&self) {
            *self.panics.lock().unwrap() += 1;
        }
    }
}
