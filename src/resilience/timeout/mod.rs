//! Timeout-enforcing response multiplexer.
//!
//! # Responsibilities
//! - Bound the time a client waits for any single request
//! - Stage handler output so it can be discarded after a timeout
//! - Commit exactly one response per request
//!
//! # Design Decisions
//! - Timed-out requests return 504 Gateway Timeout with a configured body
//! - The deadline is dropped as soon as the handler wins the race
//! - Handlers are never aborted; only their output is detached
//! - Timeout is an outcome, not an error; nothing propagates to the caller

pub mod arbiter;
pub mod buffer;
pub mod commit;
pub mod context;
pub mod layer;
pub mod middleware;

pub use arbiter::{Arbiter, Outcome};
pub use buffer::{BufferedResponse, ResponseBuffer};
pub use commit::{OutputChannel, ResponseWriter};
pub use context::RequestContext;
pub use layer::{TimeoutLayer, TimeoutService};
pub use middleware::{TimeoutMiddleware, DEFAULT_TIMEOUT_MESSAGE};
