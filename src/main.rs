//! Portfolio API server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id → trace → security headers → timeout → body limit
//!                                                                        │
//!                  ┌─────────────────────────────────────────────────────┘
//!                  ▼
//!          ┌──────────────┐   ┌────────────┐   ┌──────────┐   ┌──────────┐
//!          │ origin guard │──▶│ rate limit │──▶│ identity │──▶│ allowlist│
//!          └──────────────┘   └────────────┘   └──────────┘   └────┬─────┘
//!                                                                  ▼
//!          ┌──────────────┐   ┌────────────┐   ┌──────────────────────────┐
//!          │  PostStore   │◀──│  sanitize  │◀──│ schema validation (JSON) │
//!          └──────────────┘   └────────────┘   └──────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use portfolio_api::config::load_config;
use portfolio_api::http::{HttpServer, Services};
use portfolio_api::lifecycle::{wait_for_signal, Shutdown};
use portfolio_api::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "portfolio-api")]
#[command(about = "Blog, contact and admin API for the portfolio site", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "PORTFOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "portfolio-api starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        store = ?config.store.backend,
        request_timeout_secs = config.timeouts.request_secs,
        allowed_origins = config.security.allowed_origins.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let services = Services::from_config(&config);
    let server = HttpServer::new(config, services);

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
