//! Real client address proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                    REAL-IP                     │
//!   Client / proxy chain  │  ┌─────────┐   ┌────────────┐   ┌──────────┐  │
//!   ──────────────────────┼─▶│  http   │──▶│ retrieval  │──▶│ upstream │──┼──▶ Backend
//!   X-Forwarded-For: ...  │  │ server  │   │ strategy   │   │ or echo  │  │   X-Real-Ip: ...
//!                         │  └─────────┘   └────────────┘   └──────────┘  │
//!                         │                                               │
//!                         │  config (TOML, hot reload) · observability    │
//!                         │  lifecycle (signals, graceful shutdown)       │
//!                         └───────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use real_ip::config::{load_config, ConfigWatcher, RealIpConfig};
use real_ip::lifecycle::{wait_for_signal, Shutdown};
use real_ip::observability::{logging, metrics};
use real_ip::HttpServer;

#[derive(Parser)]
#[command(name = "real-ip")]
#[command(about = "Resolve the real client address of proxied requests", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not reload the configuration file when it changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => RealIpConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("real-ip v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        header = %config.retriever.header,
        strategy = %config.retriever.strategy,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (config_updates, _watcher) = match (&args.config, args.no_watch) {
        (Some(path), false) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        _ => (mpsc::unbounded_channel().1, None),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
