//! Panic recovery around handler tasks.
//!
//! A panic inside a handler becomes a normal "handler finished" signal. What
//! the client then sees is decided here: by default a 500 JSON envelope if
//! the handler had not written a status yet, otherwise whatever it buffered.

use std::any::Any;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};

use crate::config::RecoveryConfig;
use crate::http::response::DefaultResponse;
use crate::resilience::timeout::ResponseBuffer;

/// Response policy applied after a handler panic.
#[derive(Debug, Clone)]
pub struct Recovery {
    response: Option<(StatusCode, Vec<u8>)>,
}

impl Recovery {
    /// Respond with `status` and an enveloped `message`.
    pub fn new(status: StatusCode, message: &str) -> Self {
        let body = serde_json::to_vec(&DefaultResponse::new(status, message)).unwrap_or_default();
        Self {
            response: Some((status, body)),
        }
    }

    /// Leave the buffer untouched; a panic before any write yields an empty 200.
    pub fn passthrough() -> Self {
        Self { response: None }
    }

    pub fn from_config(config: &RecoveryConfig) -> Self {
        if !config.enabled {
            return Self::passthrough();
        }
        let status =
            StatusCode::from_u16(config.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, &config.message)
    }

    /// Apply the policy to the buffer of a handler that panicked.
    pub fn recover(&self, buffer: &ResponseBuffer, payload: &(dyn Any + Send)) {
        tracing::error!(
            panic = %panic_message(payload),
            written = buffer.written(),
            closed = buffer.is_closed(),
            "Handler panicked"
        );

        let Some((status, body)) = &self.response else {
            return;
        };
        if buffer.written() {
            return;
        }
        buffer.set_status(status.as_u16());
        buffer.set_header(CONTENT_TYPE, [HeaderValue::from_static("application/json")]);
        buffer.append_body(body);
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
