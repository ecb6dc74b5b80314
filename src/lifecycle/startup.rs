//! Startup orchestration.
//!
//! # Order
//! ```text
//! validate config → logging → metrics exporter → bind → serve
//! ```
//!
//! Any startup error is fatal and returned to the caller.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::validation::validate_config;
use crate::config::{ServerConfig, ValidationError};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics::{init_metrics, NoopSink, SharedMetrics};
use crate::observability::logging;

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid configuration: {0:?}")]
    Config(Vec<ValidationError>),

    #[error("failed to initialise logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid address {0:?}")]
    Address(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Initialise every subsystem and serve `routes` until `shutdown` fires.
pub async fn start(
    config: ServerConfig,
    routes: Router,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    validate_config(&config).map_err(StartupError::Config)?;
    logging::init(&config.observability)?;

    let metrics: SharedMetrics = if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::Address(config.observability.metrics_address.clone()))?;
        init_metrics(addr)?
    } else {
        Arc::new(NoopSink)
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_ms = config.timeouts.request_ms,
        metrics_enabled = config.observability.metrics_enabled,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::with_metrics(config, routes, metrics);
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
