//! Axum middleware functions installed by the server.

pub mod metrics;

pub use metrics::request_metrics;
