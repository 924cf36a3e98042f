//! HTTP server hosting the dashboard and any merged routes

use std::net::SocketAddr;

use axum::Router;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::info;

use sme_core::ServerConfig;

use crate::api::{DashboardState, create_router};
use crate::error::{DashboardError, Result};

/// Dashboard server
pub struct DashboardServer {
    host: String,
    port: u16,
    router: Router,
}

impl DashboardServer {
    /// Create a new dashboard server
    pub fn new(config: &ServerConfig, state: DashboardState) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            router: create_router(state),
        }
    }

    /// Serve additional routes (the LINE webhook) on the same port
    pub fn merge(mut self, routes: Router) -> Self {
        self.router = self.router.merge(routes);
        self
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| DashboardError::ConfigError(format!("Invalid address {}: {}", addr, e)))
    }

    /// Get the router
    pub fn router(&self) -> Router {
        self.router.clone().layer(TraceLayer::new_for_http())
    }

    /// Serve until the shutdown signal fires
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let addr = self.socket_addr()?;
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| DashboardError::ServerError(format!("Failed to bind {}: {}", addr, e)))?;

        info!("Listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| DashboardError::ServerError(format!("Server error: {}", e)))?;

        Ok(())
    }
}
