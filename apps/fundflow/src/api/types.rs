//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use crate::explorer::PageReport;
use crate::session::SessionStatus;
use fundflow_core::{LayoutDistance, PageLimit, Point};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Session status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub node_count: usize,
    pub edge_count: usize,
    pub counted_flows: usize,
    /// Nodes whose history is not exhausted yet.
    pub pending_nodes: usize,
    pub layout_bodies: usize,
    pub alpha: f64,
    pub layout_distance: f64,
    pub page_limit: u32,
}

impl From<SessionStatus> for StatusResponse {
    fn from(status: SessionStatus) -> Self {
        Self {
            node_count: status.nodes,
            edge_count: status.edges,
            counted_flows: status.counted_flows,
            pending_nodes: status.pending_nodes,
            layout_bodies: status.layout_bodies,
            alpha: status.alpha,
            layout_distance: status.layout_distance.value(),
            page_limit: status.page_limit,
        }
    }
}

// =============================================================================
// ADDRESS REQUEST/RESPONSE
// =============================================================================

/// Seed address request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddAddressRequest {
    pub address: String,
}

/// Seed address response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddAddressResponse {
    pub success: bool,
    pub node_id: Option<String>,
    pub error: Option<String>,
}

impl AddAddressResponse {
    pub fn success(node_id: impl Into<String>) -> Self {
        Self {
            success: true,
            node_id: Some(node_id.into()),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            node_id: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// LOAD MORE RESPONSE
// =============================================================================

/// Result of one page load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadMoreResponse {
    pub success: bool,
    pub report: Option<PageReport>,
    pub error: Option<String>,
}

impl LoadMoreResponse {
    pub fn success(report: PageReport) -> Self {
        Self {
            success: true,
            report: Some(report),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            report: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// TUNING REQUEST/RESPONSE
// =============================================================================

/// Tuning update. Values may be JSON numbers or strings; both are parsed
/// through the same validation as user input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TuningRequest {
    #[serde(default)]
    pub layout_distance: Option<Value>,
    #[serde(default)]
    pub page_limit: Option<Value>,
}

/// Raw text of a tuning value as the user would have typed it.
#[must_use]
pub fn tuning_input(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Applied tuning values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningResponse {
    pub success: bool,
    pub layout_distance: Option<f64>,
    pub page_limit: Option<u32>,
    pub error: Option<String>,
}

impl TuningResponse {
    pub fn success(distance: Option<LayoutDistance>, limit: Option<PageLimit>) -> Self {
        Self {
            success: true,
            layout_distance: distance.map(LayoutDistance::value),
            page_limit: limit.map(u32::from),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            layout_distance: None,
            page_limit: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// VIEW REQUESTS
// =============================================================================

/// Drag target in layout coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DragRequest {
    pub x: f64,
    pub y: f64,
}

impl DragRequest {
    #[must_use]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Zoom by `factor` around the screen point `(x, y)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZoomRequest {
    pub factor: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl ZoomRequest {
    #[must_use]
    pub fn anchor(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Pan by `(dx, dy)` screen units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PanRequest {
    pub dx: f64,
    pub dy: f64,
}

// =============================================================================
// ACTION RESPONSE
// =============================================================================

/// Response for commands without a payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub error: Option<String>,
}

impl ActionResponse {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
        }
    }
}
