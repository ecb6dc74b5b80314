//! Tower integration for the timeout orchestrator.
//!
//! `TimeoutLayer` wraps any infallible `Request -> Response` service: a whole
//! `Router` (middleware style) or a single `MethodRouter` (handler style).
//! The inner service runs as the handler task; its response is drained into
//! the `ResponseBuffer` and only reaches the client if it beat the deadline.

use std::convert::Infallible;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use super::buffer::ResponseBuffer;
use super::commit::ResponseWriter;
use super::context::RequestContext;
use super::middleware::TimeoutMiddleware;

/// Layer applying a `TimeoutMiddleware` to every request.
#[derive(Debug, Clone)]
pub struct TimeoutLayer {
    middleware: TimeoutMiddleware,
}

impl TimeoutLayer {
    pub fn new(timeout: Duration, message: &str) -> Self {
        Self::from_middleware(TimeoutMiddleware::new(timeout, message))
    }

    pub fn from_middleware(middleware: TimeoutMiddleware) -> Self {
        Self { middleware }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            middleware: self.middleware.clone(),
        }
    }
}

/// Service produced by `TimeoutLayer`.
#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
    middleware: TimeoutMiddleware,
}

impl<S> Service<Request> for TimeoutService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Keep the service that was driven to readiness.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let middleware = self.middleware.clone();

        Box::pin(async move {
            let mut writer = ResponseWriter::new();
            middleware
                .serve(&mut writer, move |buffer, ctx| forward(inner, request, buffer, ctx))
                .await;
            Ok(writer.into_response())
        })
    }
}

async fn forward<S>(mut inner: S, mut request: Request, buffer: ResponseBuffer, ctx: RequestContext)
where
    S: Service<Request, Response = Response, Error = Infallible>,
{
    request.extensions_mut().insert(ctx);
    let response = match inner.call(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let (parts, body) = response.into_parts();
    buffer.extend_headers(parts.headers);
    buffer.set_status(parts.status.as_u16());
    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            buffer.append_body(&bytes);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read handler response body");
        }
    }
}
