//! Courier daemon: pipelined HTTP/1.x RPC transport engine.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────┐
//!     Client Request     │  ┌──────────┐     ┌──────────────┐   │
//!     ───────────────────┼─▶│   net    │────▶│   service    │   │
//!                        │  │ listener │     │   registry   │   │
//!                        │  └──────────┘     └──────┬───────┘   │
//!                        │        │                 │           │
//!                        │        ▼                 ▼           │
//!                        │  ┌──────────┐     ┌──────────────┐   │
//!                        │  │connection│◀────│   dispatch   │   │
//!                        │  │  writer  │     │     pool     │   │
//!     Client Response    │  └──────────┘     └──────────────┘   │
//!     ◀──────────────────┼───   responses leave in request      │
//!                        │      order, handlers finish in any   │
//!                        └──────────────────────────────────────┘
//! ```
//!
//! The daemon registers a single echo service and serves it until
//! interrupted. Libraries embedding the engine use `courier::Services`
//! directly and register their own handlers.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier::config::validation::validate_config;
use courier::config::{load_config, EngineConfig};
use courier::service::ServerRequest;
use courier::Services;

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Pipelined HTTP/1.x RPC transport daemon", long_about = None)]
struct Args {
    /// Path to a TOML config file (defaults apply when omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address (host:port).
    #[arg(short, long)]
    listen: Option<String>,

    /// Override workers.pool_size.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Override echo.path.
    #[arg(long)]
    path: Option<String>,
}

/// The built-in echo service: replies with the request payload
/// (query string if present, body otherwise).
async fn echo(request: ServerRequest) {
    let body = request.data().to_vec();
    request.send_reply(body, &[]);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };

    if let Some(listen) = args.listen {
        config.listener.bind_address = listen;
    }
    if let Some(workers) = args.workers {
        config.workers.pool_size = workers;
    }
    if let Some(path) = args.path {
        config.echo.path = path;
    }

    // Command-line overrides bypass the loader, so re-check here.
    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            eprintln!("config error: {error}");
        }
        return Err("invalid configuration".into());
    }

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("courier={}", config.observability.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("courier v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        workers = config.workers.pool_size,
        io_timeout_secs = config.timeouts.io_secs,
        "Configuration loaded"
    );

    let echo_address = format!("http://{}{}", config.listener.bind_address, config.echo.path);
    let mut services = Services::new();
    services.add(&echo_address, echo)?;

    let handle = services.serve(&config).await?;
    tracing::info!(address = %handle.local_addr(), path = %config.echo.path, "Echo service ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    handle.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
