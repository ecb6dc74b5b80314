//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap application routes with the default middleware stack
//! - JSON fallbacks for unknown routes and unsupported methods
//! - Bind server to listener
//! - Graceful shutdown with a bounded drain
//!
//! # Middleware order (outermost first)
//! ```text
//! SetRequestId → Trace → PropagateRequestId → request_metrics → Timeout → routes
//! ```

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Request,
    http::{Method, StatusCode, Uri},
    middleware,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::middleware::request_metrics;
use crate::http::request::request_id;
use crate::http::response::DefaultResponse;
use crate::observability::metrics::{NoopSink, SharedMetrics};
use crate::resilience::{Recovery, TimeoutLayer, TimeoutMiddleware};

/// HTTP server wrapping application routes with the default stack.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and routes.
    pub fn new(config: ServerConfig, routes: Router) -> Self {
        Self::with_metrics(config, routes, Arc::new(NoopSink))
    }

    /// Same as `new`, recording metrics into `metrics`.
    pub fn with_metrics(config: ServerConfig, routes: Router, metrics: SharedMetrics) -> Self {
        let router = Self::build_router(&config, routes, metrics);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, routes: Router, metrics: SharedMetrics) -> Router {
        let timeout = TimeoutMiddleware::from_config(&config.timeouts)
            .with_recovery(Recovery::from_config(&config.recovery))
            .with_metrics(metrics.clone());

        routes
            .fallback(no_route_handler)
            .method_not_allowed_fallback(no_method_handler)
            .layer(TimeoutLayer::from_middleware(timeout))
            .layer(middleware::from_fn_with_state(metrics, request_metrics))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(request.headers()),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires, then drain for at most
    /// `timeouts.shutdown_secs`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_ms = self.config.timeouts.request_ms,
            "HTTP server starting"
        );

        let grace = Duration::from_secs(self.config.timeouts.shutdown_secs);
        let (draining_tx, draining_rx) = oneshot::channel::<()>();
        let app = self.router.into_make_service();
        let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received, draining connections");
            let _ = draining_tx.send(());
        })
        .into_future();

        tokio::select! {
            result = serve => result?,
            _ = drain_deadline(draining_rx, grace) => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Drain deadline elapsed, closing remaining connections"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

async fn drain_deadline(draining: oneshot::Receiver<()>, grace: Duration) {
    if draining.await.is_err() {
        // Server finished without a shutdown signal.
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}

async fn no_route_handler(method: Method, uri: Uri) -> DefaultResponse {
    DefaultResponse::new(
        StatusCode::NOT_FOUND,
        format!("No route to your request: {method} {uri}"),
    )
}

async fn no_method_handler(method: Method, uri: Uri) -> DefaultResponse {
    DefaultResponse::new(
        StatusCode::NOT_FOUND,
        format!("Not support Method to your request: {method} {uri}"),
    )
}
