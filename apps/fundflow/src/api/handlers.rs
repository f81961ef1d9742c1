//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ActionResponse, AddAddressRequest, AddAddressResponse, DragRequest, HealthResponse,
        LoadMoreResponse, PanRequest, StatusResponse, TuningRequest, TuningResponse, ZoomRequest,
        tuning_input,
    },
};
use crate::error::AppError;
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use fundflow_core::{Address, LayoutDistance, PageLimit};

/// Status code and message for a failed request.
fn failure(error: impl Into<AppError>) -> (StatusCode, String) {
    let error = error.into();
    (error.status_code(), error.to_string())
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// READ HANDLERS
// =============================================================================

/// Get session status.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.session.status().await;
    (StatusCode::OK, Json(StatusResponse::from(status)))
}

/// Nodes and edges with their current positions.
pub async fn snapshot_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.session.snapshot().await))
}

/// The rendered scene.
pub async fn scene_handler(State(state): State<AppState>) -> impl IntoResponse {
    let svg = state.session.render_svg().await;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/svg+xml")],
        svg,
    )
}

// =============================================================================
// EXPLORATION HANDLERS
// =============================================================================

/// Resolve and add a seed address.
pub async fn add_address_handler(
    State(state): State<AppState>,
    Json(request): Json<AddAddressRequest>,
) -> impl IntoResponse {
    match state.session.add_seed_address(&request.address).await {
        Ok(id) => (StatusCode::OK, Json(AddAddressResponse::success(id.0))),
        Err(e) => {
            let (status, msg) = failure(e);
            (status, Json(AddAddressResponse::error(msg)))
        }
    }
}

/// Load the next page of a node's history.
pub async fn load_more_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.session.load_more(&Address::new(id)).await {
        Ok(report) => (StatusCode::OK, Json(LoadMoreResponse::success(report))),
        Err(e) => {
            let (status, msg) = failure(e);
            (status, Json(LoadMoreResponse::error(msg)))
        }
    }
}

/// Hand a node to the drill-down hook.
pub async fn open_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    action(state.session.open_node(&Address::new(id)).await)
}

// =============================================================================
// TUNING HANDLER
// =============================================================================

/// Update layout distance and/or page limit.
///
/// Both values are validated before either is applied.
pub async fn tuning_handler(
    State(state): State<AppState>,
    Json(request): Json<TuningRequest>,
) -> impl IntoResponse {
    let distance = request.layout_distance.as_ref().map(tuning_input);
    let limit = request.page_limit.as_ref().map(tuning_input);

    let valid = distance
        .as_deref()
        .map(LayoutDistance::parse)
        .transpose()
        .and(limit.as_deref().map(PageLimit::parse).transpose());
    if let Err(e) = valid {
        let (status, msg) = failure(e);
        return (status, Json(TuningResponse::error(msg)));
    }

    let applied_distance = match distance {
        Some(input) => match state.session.set_layout_distance(&input).await {
            Ok(d) => Some(d),
            Err(e) => {
                let (status, msg) = failure(e);
                return (status, Json(TuningResponse::error(msg)));
            }
        },
        None => None,
    };
    let applied_limit = match limit {
        Some(input) => match state.session.set_page_limit(&input) {
            Ok(l) => Some(l),
            Err(e) => {
                let (status, msg) = failure(e);
                return (status, Json(TuningResponse::error(msg)));
            }
        },
        None => None,
    };

    (
        StatusCode::OK,
        Json(TuningResponse::success(applied_distance, applied_limit)),
    )
}

// =============================================================================
// VIEW HANDLERS
// =============================================================================

/// Pin a node at a position.
pub async fn drag_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DragRequest>,
) -> impl IntoResponse {
    action(state.session.drag(&Address::new(id), request.point()).await)
}

/// Unpin a dragged node.
pub async fn release_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    action(state.session.release(&Address::new(id)).await)
}

pub async fn zoom_handler(
    State(state): State<AppState>,
    Json(request): Json<ZoomRequest>,
) -> impl IntoResponse {
    action(state.session.zoom(request.factor, request.anchor()).await)
}

pub async fn pan_handler(
    State(state): State<AppState>,
    Json(request): Json<PanRequest>,
) -> impl IntoResponse {
    state.session.pan(request.dx, request.dy).await;
    (StatusCode::OK, Json(ActionResponse::success()))
}

fn action<E: Into<AppError>>(result: Result<(), E>) -> (StatusCode, Json<ActionResponse>) {
    match result {
        Ok(()) => (StatusCode::OK, Json(ActionResponse::success())),
        Err(e) => {
            let (status, msg) = failure(e);
            (status, Json(ActionResponse::error(msg)))
        }
    }
}
