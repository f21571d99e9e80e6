//! Control surface — Axum web server for administrative triggers.
//!
//! Exposes the coordinator's public operations (tracked check, manual and
//! forced reports, reset) plus help, status, and health endpoints.
//! CORS enabled for local tooling.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub use routes::{AppState, ControlState};

/// Bind the control port and serve in a background task.
///
/// Binding happens before spawning so a busy port is reported to the caller.
pub async fn spawn_control(state: AppState, port: u16) -> Result<JoinHandle<()>> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind control port {port}"))?;

    info!(port, "Control server listening on http://localhost:{port}");

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Control server error");
        }
    }))
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/cycle", post(routes::post_cycle))
        .route("/api/top", post(routes::post_top))
        .route("/api/force", post(routes::post_force))
        .route("/api/reset", post(routes::post_reset))
        .route("/api/help", get(routes::get_help))
        .route("/api/status", get(routes::get_status))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
