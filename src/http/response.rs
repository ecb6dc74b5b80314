//! JSON response envelope and HTTP errors.
//!
//! # Responsibilities
//! - Uniform `{status, message, data}` body for every JSON response
//! - Map error kinds to status codes
//!
//! # Design Decisions
//! - The envelope status mirrors the HTTP status line
//! - Errors render through the same envelope as successes

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default body of every JSON response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultResponse {
    /// HTTP status code.
    pub status: u16,
    /// Human readable message.
    pub message: String,
    /// Response payload.
    #[serde(default)]
    pub data: Option<Value>,
}

impl DefaultResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            data: None,
        }
    }

    /// Successful response carrying `data`.
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            data: serde_json::to_value(data).ok(),
            ..Self::new(StatusCode::OK, "ok")
        }
    }

    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for DefaultResponse {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// Category of an `HttpError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("Internal Server Error")]
    ServerError,
    #[error("Not Found")]
    NotFound,
    #[error("Forbidden")]
    Forbidden,
    #[error("Bad Request")]
    BadRequest,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        }
    }
}

/// Error a handler can return to produce an enveloped error response.
#[derive(Debug, Clone, thiserror::Error)]
#[error("message: {message}, error: {kind}")]
pub struct HttpError {
    kind: ErrorKind,
    message: String,
}

impl HttpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&HttpError> for DefaultResponse {
    fn from(err: &HttpError) -> Self {
        DefaultResponse::new(err.status(), err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.status(), error = %self, "Request failed");
        DefaultResponse::from(&self).into_response()
    }
}
