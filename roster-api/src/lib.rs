//! # Roster API Server
//!
//! REST API for user records, served through a read-through TTL cache.
//!
//! ## Endpoints
//!
//! - `POST /user` - Create a user, returns its id
//! - `GET /user/:id` - Fetch a user
//! - `PUT /user` - Replace a user
//! - `DELETE /user/:id` - Delete a user
//! - `GET /cache/stats` - Cache entry counts
//! - `GET /metrics` - Prometheus metrics
//! - `GET /health` - Liveness probe
//!
//! ## Example
//!
//! ```rust,ignore
//! use roster_api::{ApiServer, ApiConfig};
//!
//! let config = ApiConfig::from_env();
//! let server = ApiServer::new(config).await?;
//! server.run(([0, 0, 0, 0], 8080)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod metrics;
mod routes;
mod service;
mod state;

pub use error::ApiError;
pub use metrics::ApiMetrics;
pub use routes::create_router;
pub use service::UserService;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use roster_core::error::Result;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// API server for roster.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a new API server, opening the configured backing store.
    pub async fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self {
            state: Arc::new(AppState::from_config(config).await?),
        })
    }

    /// Wraps an already-built state.
    pub fn with_state(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Shared application state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Creates the router with all routes and layers configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address until Ctrl-C, then stops the cache sweeper.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("Roster API server listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.state.cache.shutdown().await;
        info!("Roster API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
