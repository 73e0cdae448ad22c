//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGTERM / SIGINT and trigger shutdown
//! - Turn SIGHUP into configuration reloads
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers config reload, not shutdown
//! - A failed reload keeps the previous configuration

use std::path::PathBuf;

use tokio::sync::broadcast;

use crate::config::{load_config, load_from_env, ConfigError, GateConfig};
use crate::http::GateState;

/// Resolves when the process is asked to stop.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Where reloads read configuration from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Environment,
}

impl ConfigSource {
    pub fn load(&self) -> Result<GateConfig, ConfigError> {
        match self {
            ConfigSource::File(path) => load_config(path),
            ConfigSource::Environment => load_from_env(),
        }
    }
}

/// Reload `state` from `source`. Errors are logged and the old context stays.
pub fn reload(state: &GateState, source: &ConfigSource) -> bool {
    match source.load().and_then(|config| state.reload(config)) {
        Ok(()) => true,
        Err(e) => {
            state.logger.error_with("Configuration reload failed", &e, None);
            false
        }
    }
}

/// Reload on every SIGHUP until shutdown.
#[cfg(unix)]
pub async fn reload_on_hangup(
    state: GateState,
    source: ConfigSource,
    mut shutdown: broadcast::Receiver<()>,
) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for SIGHUP, reload disabled");
            return;
        }
    };

    loop {
        tokio::select! {
            received = hangup.recv() => {
                if received.is_none() {
                    break;
                }
                tracing::info!("Received SIGHUP, reloading configuration");
                reload(&state, &source);
            }
            _ = shutdown.recv() => break,
        }
    }
}

#[cfg(not(unix))]
pub async fn reload_on_hangup(
    _state: GateState,
    _source: ConfigSource,
    mut shutdown: broadcast::Receiver<()>,
) {
    let _ = shutdown.recv().await;
}
