//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared state: config store, fault injector, policy chain, gate
//! - Create the Axum Router with the protected and admin handlers
//! - Wire up middleware (timeout, request ID, tracing)
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::chaos::FaultInjector;
use crate::config::{AppConfig, ConfigStore, ValidationError};
use crate::http::external::call_external;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::metrics::TOGGLE_STATE;
use crate::observability::MetricsSink;
use crate::resilience::{PolicyChain, ToggleGate};

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<ConfigStore>,
    pub gate: Arc<ToggleGate>,
    pub injector: FaultInjector,
    pub metrics: Arc<MetricsSink>,
}

impl AppState {
    /// Wire every component from one configuration.
    pub fn new(config: AppConfig) -> Result<Self, ValidationError> {
        let metrics = Arc::new(MetricsSink::new());
        let store = Arc::new(ConfigStore::from_config(&config)?);
        let chain = Arc::new(PolicyChain::new(&config.resilience, metrics.clone()));
        let gate = Arc::new(ToggleGate::new(store.clone(), chain, metrics.clone()));
        let injector = FaultInjector::new(store.clone(), metrics.clone());

        metrics.set_gauge(TOGGLE_STATE, if store.is_enabled() { 1.0 } else { 0.0 });

        Ok(Self {
            config: Arc::new(config),
            store,
            gate,
            injector,
            metrics,
        })
    }
}

/// HTTP server for the protected endpoint and its control surface.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Result<Self, ValidationError> {
        let state = AppState::new(config)?;
        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let request_timeout = Duration::from_secs(state.config.timeouts.request_secs);
        let admin = admin::setup_admin_router(state.clone());

        Router::new()
            .route("/api/external", get(call_external))
            .merge(admin.clone())
            .nest("/admin", admin)
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// A clone of the fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            resilience_enabled = self.state.store.is_enabled(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
