//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms through an injected MetricsSink)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every access log line
//! - Metrics sinks are passed to components, never looked up globally

pub mod logging;
pub mod metrics;

pub use metrics::{MetricsSink, NoopSink, PrometheusSink, SharedMetrics};
