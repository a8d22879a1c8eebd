//! Resilience toggle service.
//!
//! # Architecture Overview
//!
//! ```text
//!     GET /api/external
//!     ───────────────────▶ http::external ──▶ ToggleGate ──┬── disabled ──▶ FaultInjector
//!                                                          │
//!                                                          └── enabled ───▶ PolicyChain
//!                                                                            breaker → limiter
//!                                                                            → bulkhead → retry
//!                                                                            → FaultInjector
//!
//!     /resilience/*, /mock/*  ──▶ admin ──▶ ConfigStore (read by the gate and the injector)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use resilience_toggle::config::loader::load_config;
use resilience_toggle::config::AppConfig;
use resilience_toggle::http::HttpServer;
use resilience_toggle::lifecycle::{signals, Shutdown};
use resilience_toggle::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "resilience-toggle")]
#[command(about = "Dependency caller with runtime-switchable resilience patterns", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability.log_level)?;
    tracing::info!("resilience-toggle v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        resilience_enabled = config.resilience.enabled,
        failure_rate = config.mock.failure_rate,
        delay_ms = config.mock.delay_ms,
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
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
