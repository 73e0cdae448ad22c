//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID, client IP)
//! - Guard webhook routes (allow-list, signature) and API routes (token)
//! - Bind server to listener with connect info
//! - Hold the swappable security context

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::paths::resolve_log_dir;
use crate::config::validation::validate_config;
use crate::config::{ConfigError, GateConfig};
use crate::http::handlers;
use crate::observability::{AuditLogger, SecureLogger};
use crate::security::{
    client_ip_middleware, ip_allowlist_middleware, require_auth, webhook_signature_middleware,
    TokenAuthenticator, WebhookVerifier,
};

/// Everything the security stages read per request, built from one
/// validated configuration.
pub struct SecurityContext {
    pub config: Arc<GateConfig>,
    pub tokens: TokenAuthenticator,
    pub webhook: WebhookVerifier,
}

impl SecurityContext {
    /// Validate `config` and derive keys from it.
    pub fn from_config(config: GateConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let tokens = TokenAuthenticator::from_config(&config.auth);
        let webhook = WebhookVerifier::new(config.webhook.secret.as_bytes());

        Ok(Self {
            config: Arc::new(config),
            tokens,
            webhook,
        })
    }
}

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct GateState {
    pub inner: Arc<ArcSwap<SecurityContext>>,
    pub logger: SecureLogger,
    pub audit: AuditLogger,
}

impl GateState {
    /// Build state with log files under the configured directories.
    pub fn new(config: GateConfig) -> Result<Self, ConfigError> {
        let error_dir = resolve_log_dir(&config.logging.app_root, config.logging.error_log_dir.as_deref());
        let audit_dir = resolve_log_dir(&config.logging.app_root, config.logging.audit_log_dir.as_deref());

        let context = SecurityContext::from_config(config)?;
        let logger = SecureLogger::init(&context.config, &error_dir);
        let audit = AuditLogger::init(&audit_dir, logger.clone());

        Ok(Self {
            inner: Arc::new(ArcSwap::from_pointee(context)),
            logger,
            audit,
        })
    }

    /// Current security context snapshot.
    pub fn security(&self) -> Arc<SecurityContext> {
        self.inner.load_full()
    }

    /// Validate `config` and atomically replace the security context.
    ///
    /// In-flight requests keep the snapshot they started with. Log
    /// directories are not reopened; that needs a restart.
    pub fn reload(&self, config: GateConfig) -> Result<(), ConfigError> {
        let context = SecurityContext::from_config(config)?;
        self.inner.store(Arc::new(context));
        tracing::info!("Security configuration reloaded");
        Ok(())
    }
}

/// HTTP server for the gate.
pub struct HttpServer {
    router: Router,
    state: GateState,
}

impl HttpServer {
    /// Create a new HTTP server. Fails fast on invalid configuration.
    pub fn new(config: GateConfig) -> Result<Self, ConfigError> {
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let state = GateState::new(config)?;
        let router = Self::build_router(request_timeout, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_timeout: Duration, state: GateState) -> Router {
        let api = Router::new()
            .route("/api/me", get(handlers::whoami))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

        // Layers run bottom-up: allow-list first, then signature.
        let webhooks = Router::new()
            .route("/webhooks/payments", post(handlers::payment_webhook))
            .route_layer(middleware::from_fn_with_state(state.clone(), webhook_signature_middleware))
            .route_layer(middleware::from_fn_with_state(state.clone(), ip_allowlist_middleware));

        Router::new()
            .route("/health", get(handlers::health))
            .merge(api)
            .merge(webhooks)
            .layer(middleware::from_fn_with_state(state.clone(), client_ip_middleware))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Shared state, e.g. for reloads and flushing logs.
    pub fn state(&self) -> GateState {
        self.state.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        self.state.audit.flush().await;
        self.state.logger.flush().await;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
