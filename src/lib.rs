//! Request-serving toolkit built on Tokio and Axum.
//!
//! The centrepiece is [`resilience::timeout`]: a middleware that guarantees
//! every request gets exactly one response within a bounded time, however
//! slow or broken the handler behind it is.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::timeout::{ResponseBuffer, RequestContext, TimeoutLayer, TimeoutMiddleware};
