//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the logs and health handlers
//! - Wire up middleware (tracing, body limit, body idle timeout, request ID)
//! - Bind server to listener and stop when told to
//!
//! # Design Decisions
//! - The server keeps accepting during the drain so late clients get a 503
//!   instead of a refused connection; the caller decides when it stops
//! - A body that stops arriving is cut off after `listener.body_timeout_ms`,
//!   which releases its in-flight slot so the drain can finish
//! - Peer address comes from ConnectInfo when present, so the router also
//!   works under `tower::ServiceExt::oneshot`

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::RequestBodyTimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::{GatewayConfig, MetadataConfig};
use crate::delivery::Outlet;
use crate::http::{health::handle_health, logs::handle_logs};
use crate::lifecycle::{InFlight, Shutdown};
use crate::observability::IngressMetrics;
use crate::security::CredentialStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub enforce_ssl: bool,
    pub credentials: Arc<CredentialStore>,
    pub metadata: Arc<MetadataConfig>,
    pub outlet: Outlet,
    pub deliver_timeout: Duration,
    pub shutdown: Shutdown,
    pub inflight: InFlight,
    pub metrics: Arc<IngressMetrics>,
}

/// HTTP ingress server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &GatewayConfig, outlet: Outlet, shutdown: Shutdown, inflight: InFlight) -> Self {
        let state = AppState {
            enforce_ssl: config.listener.enforce_ssl,
            credentials: Arc::new(CredentialStore::from_config(&config.credentials)),
            metadata: Arc::new(config.metadata.clone()),
            outlet,
            deliver_timeout: config.outlet.deliver_timeout(),
            shutdown,
            inflight,
            metrics: Arc::new(IngressMetrics::new()),
        };

        tracing::info!(
            credentials = state.credentials.len(),
            enforce_ssl = state.enforce_ssl,
            "Ingress configured"
        );

        let router = Self::build_router(config, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/logs", any(handle_logs))
            .route("/health", any(handle_health))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(RequestBodyTimeoutLayer::new(config.listener.body_timeout()))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn metrics(&self) -> Arc<IngressMetrics> {
        Arc::clone(&self.state.metrics)
    }

    /// Run the server on `listener` until `stop` resolves, then finish
    /// open connections and return.
    pub async fn run<F>(self, listener: TcpListener, stop: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(stop)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
