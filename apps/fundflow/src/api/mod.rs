//! # Fundflow HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Session counters
//! - `GET /snapshot` - Nodes and edges with positions
//! - `GET /scene.svg` - Rendered scene
//! - `POST /address` - Add a seed address
//! - `POST /nodes/{id}/load-more` - Load the next page of a node's history
//! - `POST /nodes/{id}/open` - Drill down into a node
//! - `POST /nodes/{id}/drag` - Pin a node at a position
//! - `POST /nodes/{id}/release` - Unpin a node
//! - `PUT /tuning` - Change layout distance and page limit
//! - `POST /view/zoom` - Zoom around a point
//! - `POST /view/pan` - Pan the view
//!
//! ## Configuration (Environment Variables)
//!
//! - `FUNDFLOW_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)

mod handlers;
mod types;

// Re-export handlers and types for integration tests (via `fundflow::api::*`)
pub use handlers::{
    add_address_handler, drag_handler, health_handler, load_more_handler, open_handler,
    pan_handler, release_handler, scene_handler, snapshot_handler, status_handler,
    tuning_handler, zoom_handler,
};
pub use types::{
    ActionResponse, AddAddressRequest, AddAddressResponse, DragRequest, HealthResponse,
    LoadMoreResponse, PanRequest, StatusResponse, TuningRequest, TuningResponse, ZoomRequest,
    tuning_input,
};

use crate::error::AppError;
use crate::session::Session;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable holding the allowed CORS origins.
pub const CORS_ORIGINS_ENV: &str = "FUNDFLOW_CORS_ORIGINS";

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the exploration session.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
}

impl AppState {
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `FUNDFLOW_CORS_ORIGINS`:
/// - If "*": allows all origins
/// - If not set: defaults to localhost only
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var(CORS_ORIGINS_ENV).ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins ({CORS_ORIGINS_ENV}=*)");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in {CORS_ORIGINS_ENV}, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                with_methods(CorsLayer::new().allow_origin(allowed_origins))
            }
        }
        None => {
            tracing::info!("CORS: No {CORS_ORIGINS_ENV} set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    with_methods(CorsLayer::new().allow_origin(origins))
}

fn with_methods(layer: CorsLayer) -> CorsLayer {
    layer
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/snapshot", get(handlers::snapshot_handler))
        .route("/scene.svg", get(handlers::scene_handler))
        .route("/address", post(handlers::add_address_handler))
        .route("/nodes/{id}/load-more", post(handlers::load_more_handler))
        .route("/nodes/{id}/open", post(handlers::open_handler))
        .route("/nodes/{id}/drag", post(handlers::drag_handler))
        .route("/nodes/{id}/release", post(handlers::release_handler))
        .route("/tuning", put(handlers::tuning_handler))
        .route("/view/zoom", post(handlers::zoom_handler))
        .route("/view/pan", post(handlers::pan_handler))
        .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, session: Arc<Session>) -> Result<(), AppError> {
    let router = create_router(AppState::new(session));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Fundflow HTTP server listening on {}", addr);

    axum::serve(listener, router).await?;
    Ok(())
}
