//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request:
//!     → timeout/ (stage handler output, race it against the deadline)
//!     → recovery.rs (turn a handler panic into a normal completion)
//!     → exactly one committed response
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every request has a deadline
//! - A handler failure never crashes the server or leaves a request hanging
//! - All resilience logic is composable tower middleware

pub mod recovery;
pub mod timeout;

pub use recovery::Recovery;
pub use timeout::{TimeoutLayer, TimeoutMiddleware};
