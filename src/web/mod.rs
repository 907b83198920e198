//! Web layer module
//!
//! HTTP interface of the badge service. Handlers stay thin: path parsing and
//! response shaping live here, badge content comes from the service registry
//! and rendering from the badge renderer.
//!
//! # Routes
//!
//! - `GET /health`: liveness probe
//! - `GET /v1/services`: documentation of enabled handlers
//! - `GET /v1/badge?title=&text=&color=`: redirect to the static service
//! - `GET /{service}/{params...}`: render a badge

use anyhow::Result;
use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::{
    badge::BadgeRenderer, cache::SharedCache, config::Config, services::ServiceRegistry,
};

pub mod handlers;
pub mod middleware;
pub mod responses;

pub use responses::ApiResponse;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
    pub renderer: Arc<BadgeRenderer>,
    pub cache: SharedCache,
    pub config: Arc<Config>,
}

/// Build the application router with all middleware applied
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/v1/services", get(handlers::services::list_services))
        .route("/v1/badge", get(handlers::badge::badge_redirect))
        .route("/{service}", get(handlers::badge::service_badge))
        .route("/{service}/{*params}", get(handlers::badge::service_badge))
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(
            middleware::request_logging_middleware,
        ))
        .with_state(state)
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", state.config.web.host, state.config.web.port)
            .parse()
            .map_err(|e| {
                anyhow::anyhow!(
                    "Invalid listen address {}:{}: {}",
                    state.config.web.host,
                    state.config.web.port,
                    e
                )
            })?;

        Ok(Self {
            app: create_router(state),
            addr,
        })
    }

    /// Serve until `cancellation_token` is cancelled, then drain in-flight
    /// requests
    pub async fn serve_with_cancellation(self, cancellation_token: CancellationToken) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.addr, e))?;

        tracing::info!("Web server listening on http://{}", self.addr);

        let shutdown_signal = async move {
            cancellation_token.cancelled().await;
            tracing::info!("Web server received cancellation signal, shutting down gracefully");
        };

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal)
            .await?;
        Ok(())
    }

    /// Get the host address
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Resolve once SIGTERM or SIGINT (Ctrl+C) is received
///
/// If a signal handler cannot be installed the error is logged and that
/// signal is ignored.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT (Ctrl+C), shutting down gracefully"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down gracefully"),
    }
}
