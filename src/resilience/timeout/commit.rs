//! Commit writer and the real output channel.
//!
//! # Responsibilities
//! - Define the single-writer sink a request's final response goes to
//! - Copy the winning outcome into it exactly once
//!
//! # Design Decisions
//! - Completed: headers, then status, then body, in that order
//! - TimedOut: fixed 504 + configured message, buffer bypassed
//! - The sink ignores a second status write rather than failing

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;

use super::arbiter::Outcome;
use super::buffer::BufferedResponse;

/// The downstream sink a committed response is written to.
pub trait OutputChannel {
    /// Merge headers into the pending response head.
    fn write_headers(&mut self, headers: HeaderMap);

    /// Commit the status line. Only the first call has an effect.
    fn write_header(&mut self, status: StatusCode);

    /// Append body bytes.
    fn write_body(&mut self, body: Bytes);

    /// Status the channel would send right now.
    fn status(&self) -> StatusCode;

    /// Whether a status was already committed.
    fn written(&self) -> bool;
}

/// `OutputChannel` that assembles an `axum` response.
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    written: bool,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            written: false,
        }
    }

    /// Finish into a response.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputChannel for ResponseWriter {
    fn write_headers(&mut self, headers: HeaderMap) {
        self.headers.extend(headers);
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.written {
            tracing::warn!(
                current = %self.status,
                ignored = %status,
                "superfluous write_header call"
            );
            return;
        }
        self.status = status;
        self.written = true;
    }

    fn write_body(&mut self, body: Bytes) {
        if !self.written {
            self.write_header(self.status);
        }
        self.body.extend_from_slice(&body);
    }

    fn status(&self) -> StatusCode {
        self.status
    }

    fn written(&self) -> bool {
        self.written
    }
}

/// Write the winning outcome to `out`.
///
/// `parts` is the buffered response taken by the winning `close` call; it is
/// only read on the `Completed` path.
pub fn commit<O>(out: &mut O, outcome: Outcome, parts: BufferedResponse, timeout_message: &str)
where
    O: OutputChannel + ?Sized,
{
    match outcome {
        Outcome::Completed => write_buffered(out, parts),
        Outcome::TimedOut => write_timeout(out, timeout_message),
        Outcome::Pending => {}
    }
}

fn write_buffered<O: OutputChannel + ?Sized>(out: &mut O, parts: BufferedResponse) {
    let BufferedResponse { status, headers, body } = parts;
    let status = status.unwrap_or_else(|| out.status());

    out.write_headers(headers);
    out.write_header(status);
    if !body.is_empty() {
        out.write_body(Bytes::from(body));
    }
}

fn write_timeout<O: OutputChannel + ?Sized>(out: &mut O, message: &str) {
    out.write_header(StatusCode::GATEWAY_TIMEOUT);
    out.write_body(Bytes::copy_from_slice(message.as_bytes()));
}
