//! HTTP server for the job protocol

pub mod routes;
pub mod state;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use state::AppState;

/// SOP Studio HTTP server
pub struct SopServer {
    config: AppConfig,
    state: AppState,
}

impl SopServer {
    /// Create a new server
    pub fn new(config: AppConfig) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Create a server around existing state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        tracing::info!("Starting SOP Studio server on http://{}", addr);
        serve(listener, self.state).await
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Serve the router on an already bound listener until Ctrl+C
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> Result<()> {
    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| Error::Internal(format!("Server error: {}", e)))
}

/// Resolve on Ctrl+C, reporting not-ready while in-flight requests drain
async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested, draining connections");
    state.set_ready(false);
}

/// Build the router with all routes
pub fn router(state: AppState) -> Router {
    let config = state.config().server.clone();

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .nest("/api", routes::api_routes(config.max_upload_size))
        .with_state(state)
        // Middleware layers (applied bottom to top)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint, also probes the job store
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if !state.is_ready() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    match state.store().health_check().await {
        Ok(true) => StatusCode::OK,
        Ok(false) => StatusCode::SERVICE_UNAVAILABLE,
        Err(e) => {
            tracing::warn!("Job store health check failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
