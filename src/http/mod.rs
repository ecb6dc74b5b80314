//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID for logs and metrics)
//!     → middleware/ (request metrics)
//!     → resilience::timeout (deadline race, single commit)
//!     → application routes
//!     → response.rs (JSON envelope, errors, fallbacks)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{DefaultResponse, ErrorKind, HttpError};
pub use server::HttpServer;
