//! HTTP server exposing the export endpoint using axum.

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::export::ExportService;

pub mod handlers;

/// Shared state of all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: ExportService,
    /// Upper bound on one export, including every fetch
    pub export_timeout: Duration,
}

impl AppState {
    pub fn new(service: ExportService, export_timeout: Duration) -> Self {
        Self {
            service,
            export_timeout,
        }
    }
}

/// Create HTTP router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/funding-files/export", get(handlers::handle_export))
        .route("/health", get(handlers::handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `bind_addr` and serve until the process is stopped.
pub async fn start_server(bind_addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind HTTP server to {bind_addr}"))?;

    tracing::info!("HTTP server listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}
