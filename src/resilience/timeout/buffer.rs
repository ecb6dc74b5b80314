//! In-memory staging area for a handler's response.
//!
//! The handler writes status, headers and body here instead of to the real
//! output channel. Once the arbiter resolves, every mutator turns into a
//! silent no-op: a handler that is still running after its output was
//! abandoned never sees an error.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use super::arbiter::{Arbiter, Outcome};

/// Everything a handler produced, as handed to the commit writer.
#[derive(Debug, Clone, Default)]
pub struct BufferedResponse {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl BufferedResponse {
    fn write_status(&mut self, status: StatusCode) {
        match self.status {
            Some(current) => {
                tracing::warn!(
                    current = %current,
                    ignored = %status,
                    "superfluous set_status call"
                );
            }
            None => self.status = Some(status),
        }
    }
}

/// Handler-facing handle to the buffered response.
///
/// Cloning is cheap; all clones share one arbiter.
#[derive(Debug, Clone, Default)]
pub struct ResponseBuffer {
    shared: Arc<Arbiter<BufferedResponse>>,
}

impl ResponseBuffer {
    /// Create an empty, pending buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the status code. Only the first call takes effect.
    ///
    /// # Panics
    /// Panics if `code` is not a three-digit status (100..=999). This is a
    /// programming error, not a request error.
    pub fn set_status(&self, code: u16) {
        let status = StatusCode::from_u16(code)
            .unwrap_or_else(|_| panic!("invalid status code {code}"));
        self.shared.while_pending(|buffered| buffered.write_status(status));
    }

    /// Replace all values of `name`.
    pub fn set_header<I>(&self, name: HeaderName, values: I)
    where
        I: IntoIterator<Item = HeaderValue>,
    {
        self.shared.while_pending(|buffered| {
            buffered.headers.remove(&name);
            for value in values {
                buffered.headers.append(name.clone(), value);
            }
        });
    }

    /// Add one value to `name`, keeping existing ones.
    pub fn append_header(&self, name: HeaderName, value: HeaderValue) {
        self.shared.while_pending(|buffered| {
            buffered.headers.append(name, value);
        });
    }

    /// Merge a header map; keys present in `headers` replace existing values.
    pub fn extend_headers(&self, headers: HeaderMap) {
        self.shared.while_pending(|buffered| buffered.headers.extend(headers));
    }

    /// Append body bytes, defaulting the status to 200 on the first write.
    ///
    /// Returns the number of bytes accepted, which is 0 once the buffer closed.
    pub fn append_body(&self, bytes: &[u8]) -> usize {
        self.shared
            .while_pending(|buffered| {
                if buffered.status.is_none() {
                    buffered.status = Some(StatusCode::OK);
                }
                buffered.body.extend_from_slice(bytes);
                bytes.len()
            })
            .unwrap_or(0)
    }

    /// Recorded status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.shared.inspect(|buffered| buffered.status)
    }

    /// Number of body bytes buffered so far.
    pub fn size(&self) -> usize {
        self.shared.inspect(|buffered| buffered.body.len())
    }

    /// Whether a status was recorded, explicitly or by a body write.
    pub fn written(&self) -> bool {
        self.status().is_some()
    }

    /// Whether the arbiter already resolved and writes are discarded.
    pub fn is_closed(&self) -> bool {
        self.shared.outcome().is_resolved()
    }

    /// Resolve the arbiter. The winning call gets a copy of the buffered
    /// response; the original stays readable through `status` and `size`.
    pub(crate) fn close(&self, outcome: Outcome) -> Option<BufferedResponse> {
        self.shared.resolve_with(outcome, |buffered| buffered.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{CONTENT_TYPE, SET_COOKIE};

    #[test]
    fn test_implicit_ok_on_first_body_write() {
        let buffer = ResponseBuffer::new();
        assert!(!buffer.written());

        assert_eq!(buffer.append_body(b"hello"), 5);
        assert_eq!(buffer.status(), Some(StatusCode::OK));
        assert_eq!(buffer.size(), 5);
    }

    #[test]
    fn test_first_status_wins() {
        let buffer = ResponseBuffer::new();
        buffer.set_status(201);
        buffer.set_status(404);
        buffer.append_body(b"x");
        assert_eq!(buffer.status(), Some(StatusCode::CREATED));
    }

    #[test]
    #[should_panic(expected = "invalid status code 42")]
    fn test_invalid_status_panics() {
        ResponseBuffer::new().set_status(42);
    }

    #[test]
    fn test_invalid_status_does_not_poison_buffer() {
        let buffer = ResponseBuffer::new();
        let clone = buffer.clone();
        let result =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || clone.set_status(1000)));
        assert!(result.is_err());

        buffer.set_status(202);
        assert_eq!(buffer.status(), Some(StatusCode::ACCEPTED));
    }

    #[test]
    fn test_header_replace_and_append() {
        let buffer = ResponseBuffer::new();
        buffer.append_header(SET_COOKIE, HeaderValue::from_static("a=1"));
        buffer.append_header(SET_COOKIE, HeaderValue::from_static("b=2"));
        buffer.set_header(CONTENT_TYPE, [HeaderValue::from_static("text/plain")]);
        buffer.set_header(CONTENT_TYPE, [HeaderValue::from_static("application/json")]);

        let parts = buffer.close(Outcome::Completed).unwrap();
        assert_eq!(parts.headers.get_all(SET_COOKIE).iter().count(), 2);
        assert_eq!(parts.headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_status_and_size_survive_close() {
        let buffer = ResponseBuffer::new();
        buffer.set_status(201);
        buffer.append_body(b"ok");

        let parts = buffer.close(Outcome::Completed).unwrap();
        assert_eq!(parts.status, Some(StatusCode::CREATED));
        assert_eq!(parts.body, b"ok");
        assert!(buffer.written());
        assert_eq!(buffer.status(), Some(StatusCode::CREATED));
        assert_eq!(buffer.size(), 2);
    }

    #[test]
    fn test_writes_after_timeout_are_ignored() {
        let buffer = ResponseBuffer::new();
        buffer.append_body(b"partial");
        assert!(buffer.close(Outcome::TimedOut).is_some());
        assert!(buffer.is_closed());

        buffer.set_status(201);
        buffer.set_header(CONTENT_TYPE, [HeaderValue::from_static("text/plain")]);
        assert_eq!(buffer.append_body(b"late"), 0);
        assert_eq!(buffer.status(), Some(StatusCode::OK));
        assert_eq!(buffer.size(), 7);

        assert!(buffer.close(Outcome::Completed).is_none());
    }
}
