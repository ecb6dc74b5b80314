//! Request metrics middleware.

use std::time::Instant;

use axum::{
    body::HttpBody,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::http::request::request_id;
use crate::observability::metrics::SharedMetrics;

/// Record method, status, latency and, when the body length is known up
/// front, response size of every request.
pub async fn request_metrics(
    State(metrics): State<SharedMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let id = request_id(request.headers()).to_string();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    tracing::debug!(
        request_id = %id,
        method = %method,
        status = %response.status(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Request finished"
    );
    metrics.record_request(&method, response.status(), elapsed);
    if let Some(bytes) = response.body().size_hint().exact() {
        metrics.record_response_size(&method, bytes);
    }
    response
}
