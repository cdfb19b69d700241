//! Web server module.

mod handlers;

pub use handlers::*;

use crate::config::Config;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
}

/// Web server for the diagnostics dashboard.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            state: AppState { config },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            // Dashboard
            .route("/", get(handlers::handle_dashboard))
            // API endpoints
            .route("/api/data", get(handlers::handle_data))
            .route("/api/ping", get(handlers::handle_ping_data))
            .route("/api/speedtest", get(handlers::handle_speedtest_data))
            // Static assets
            .route("/favicon.ico", get(handlers::handle_favicon))
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Dashboard listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
