//! Storefront gate server.
//!
//! ```text
//!   Request ──▶ request id → trace → timeout → client ip
//!                                                  │
//!                          ├─ /api/*      → bearer token
//!                          └─ /webhooks/* → allow-list → HMAC
//!
//!   Side outputs: error.log, audit.log, /metrics
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use storefront_gate::config::GateConfig;
use storefront_gate::lifecycle::{reload_on_hangup, shutdown_signal, ConfigSource, Shutdown};
use storefront_gate::observability::{logging::init_tracing, metrics::init_metrics};
use storefront_gate::HttpServer;

#[derive(Parser)]
#[command(name = "storefront-gate")]
#[command(about = "Authentication and webhook integrity gate", long_about = None)]
struct Args {
    /// TOML configuration file. Without it, configuration comes from the environment.
    #[arg(short, long, env = "GATE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let source = match args.config {
        Some(path) => ConfigSource::File(path),
        None => ConfigSource::Environment,
    };

    let config = match source.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("storefront-gate: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config);
    tracing::info!("storefront-gate v{} starting", env!("CARGO_PKG_VERSION"));

    match run(config, source).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Gate stopped with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: GateConfig, source: ConfigSource) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        environment = ?config.environment,
        trust_proxy = config.trust_proxy,
        allowed_ips = config.webhook.allowed_ips.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;
    let shutdown = Shutdown::new();

    tokio::spawn(reload_on_hangup(server.state(), source, shutdown.subscribe()));

    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;
    Ok(())
}
