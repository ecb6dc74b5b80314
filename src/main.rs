//! serve-toolkit demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────────▶ SetRequestId ─▶ Trace ─▶ metrics ─▶ Timeout ─┬─▶ handler task
//!                                                                     │      (buffered)
//!                                                                     └─▶ deadline
//!     Client Response                                                 │
//!     ◀──────────────── exactly one of { buffered response, 504 } ◀───┘
//! ```
//!
//! Routes:
//! - `GET /healthz` → `{"status":200,"message":"ok","data":"healthy"}`
//! - `GET /sleep/{ms}` → responds after `ms` milliseconds (or times out)

use std::path::PathBuf;
use std::time::Duration;

use axum::{extract::Path, routing::get, Extension, Router};
use clap::Parser;

use serve_toolkit::config::{load_config, ServerConfig};
use serve_toolkit::http::DefaultResponse;
use serve_toolkit::lifecycle::{self, signals, Shutdown};
use serve_toolkit::RequestContext;

#[derive(Debug, Parser)]
#[command(name = "serve-toolkit", version, about = "Timeout-guarded HTTP server")]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    lifecycle::start(config, routes(), &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn routes() -> Router {
    Router::new()
        .route("/healthz", get(|| async { DefaultResponse::ok("healthy") }))
        .route("/sleep/{ms}", get(sleep))
}

async fn sleep(Path(ms): Path<u64>, Extension(ctx): Extension<RequestContext>) -> DefaultResponse {
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
        _ = ctx.cancelled() => {
            tracing::debug!(ms, "Sleep abandoned after timeout");
        }
    }
    DefaultResponse::ok(ms)
}
