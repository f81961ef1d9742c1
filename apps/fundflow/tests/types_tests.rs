//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use fundflow::api::{
    ActionResponse, AddAddressRequest, AddAddressResponse, DragRequest, HealthResponse,
    LoadMoreResponse, StatusResponse, TuningRequest, TuningResponse, ZoomRequest, tuning_input,
};
use fundflow::explorer::{FailedTx, PageReport};
use fundflow_core::{Cursor, LayoutDistance, PageLimit, Point, TxHash};
use serde_json::{Value, json};

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_health_response_deserialization() {
    let json = r#"{"status":"healthy","version":"1.0.0"}"#;
    let health: HealthResponse = serde_json::from_str(json).unwrap();

    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, "1.0.0");
}

// =============================================================================
// STATUS RESPONSE TESTS
// =============================================================================

#[test]
fn test_status_response_serialization() {
    let status = StatusResponse {
        node_count: 12,
        edge_count: 30,
        counted_flows: 41,
        pending_nodes: 7,
        layout_bodies: 12,
        alpha: 0.5,
        layout_distance: 450.0,
        page_limit: 100,
    };

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["node_count"], 12);
    assert_eq!(json["edge_count"], 30);
    assert_eq!(json["counted_flows"], 41);
    assert_eq!(json["pending_nodes"], 7);
    assert_eq!(json["layout_distance"], 450.0);
    assert_eq!(json["page_limit"], 100);
}

// =============================================================================
// ADDRESS TESTS
// =============================================================================

#[test]
fn test_add_address_request_deserialization() {
    let request: AddAddressRequest =
        serde_json::from_str(r#"{"address":"ckb1qyq..."}"#).unwrap();
    assert_eq!(request.address, "ckb1qyq...");
}

#[test]
fn test_add_address_request_requires_address() {
    assert!(serde_json::from_str::<AddAddressRequest>("{}").is_err());
}

#[test]
fn test_add_address_response_constructors() {
    let ok = AddAddressResponse::success("ckb1a");
    assert!(ok.success);
    assert_eq!(ok.node_id.as_deref(), Some("ckb1a"));
    assert!(ok.error.is_none());

    let err = AddAddressResponse::error("unknown address");
    assert!(!err.success);
    assert!(err.node_id.is_none());
    assert_eq!(err.error.as_deref(), Some("unknown address"));
}

// =============================================================================
// PAGE REPORT TESTS
// =============================================================================

#[test]
fn test_load_more_response_shape() {
    let report = PageReport {
        fetched: 3,
        retried: 0,
        edges_recorded: 4,
        duplicates: 1,
        nodes_discovered: 2,
        failed: vec![FailedTx {
            hash: TxHash::new("0xdead"),
            reason: "retry budget exhausted".to_string(),
        }],
        cursor: Cursor::InProgress("0x3".to_string()),
    };

    let json = serde_json::to_value(LoadMoreResponse::success(report)).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["report"]["fetched"], 3);
    assert_eq!(json["report"]["failed"][0]["hash"], "0xdead");
    assert_eq!(
        json["report"]["cursor"],
        json!({ "state": "in_progress", "token": "0x3" })
    );
    assert_eq!(json["error"], Value::Null);
}

#[test]
fn test_cursor_states_round_trip() {
    for cursor in [
        Cursor::NotStarted,
        Cursor::InProgress("0x64".to_string()),
        Cursor::Exhausted,
    ] {
        let report = PageReport {
            cursor: cursor.clone(),
            ..PageReport::default()
        };
        let text = serde_json::to_string(&report).unwrap();
        let back: PageReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.cursor, cursor);
    }
}

#[test]
fn test_exhausted_cursor_has_no_token() {
    let json = serde_json::to_value(Cursor::Exhausted).unwrap();
    assert_eq!(json, json!({ "state": "exhausted" }));
}

// =============================================================================
// TUNING TESTS
// =============================================================================

#[test]
fn test_tuning_request_fields_are_optional() {
    let empty: TuningRequest = serde_json::from_str("{}").unwrap();
    assert!(empty.layout_distance.is_none());
    assert!(empty.page_limit.is_none());

    let partial: TuningRequest = serde_json::from_str(r#"{"page_limit":"50"}"#).unwrap();
    assert!(partial.layout_distance.is_none());
    assert_eq!(partial.page_limit, Some(json!("50")));
}

#[test]
fn test_tuning_input_text() {
    assert_eq!(tuning_input(&json!(" 320.5 ")), " 320.5 ");
    assert_eq!(tuning_input(&json!(320.5)), "320.5");
    assert_eq!(tuning_input(&json!(100)), "100");
    assert_eq!(tuning_input(&json!(true)), "true");
}

#[test]
fn test_tuning_input_feeds_validation() {
    assert!(LayoutDistance::parse(&tuning_input(&json!(300))).is_ok());
    assert!(LayoutDistance::parse(&tuning_input(&json!("abc"))).is_err());
    assert!(PageLimit::parse(&tuning_input(&json!(25))).is_ok());
    assert!(PageLimit::parse(&tuning_input(&json!(2.5))).is_err());
    assert!(PageLimit::parse(&tuning_input(&json!([1]))).is_err());
}

#[test]
fn test_tuning_response_constructors() {
    let ok = TuningResponse::success(
        Some(LayoutDistance::new(300.0).unwrap()),
        Some(PageLimit::new(20).unwrap()),
    );
    assert!(ok.success);
    assert_eq!(ok.layout_distance, Some(300.0));
    assert_eq!(ok.page_limit, Some(20));

    let partial = TuningResponse::success(None, Some(PageLimit::new(5).unwrap()));
    assert!(partial.layout_distance.is_none());

    let err = TuningResponse::error("bad value");
    assert!(!err.success);
    assert!(err.page_limit.is_none());
}

// =============================================================================
// VIEW REQUEST TESTS
// =============================================================================

#[test]
fn test_zoom_anchor_defaults_to_origin() {
    let zoom: ZoomRequest = serde_json::from_str(r#"{"factor":1.5}"#).unwrap();
    assert_eq!(zoom.factor, 1.5);
    assert_eq!(zoom.anchor(), Point::ORIGIN);
}

#[test]
fn test_drag_request_point() {
    let drag: DragRequest = serde_json::from_str(r#"{"x":10.5,"y":-3.0}"#).unwrap();
    assert_eq!(drag.point(), Point::new(10.5, -3.0));
}

#[test]
fn test_action_response_constructors() {
    assert!(ActionResponse::success().success);
    let err = ActionResponse::error("node not found");
    assert!(!err.success);
    assert_eq!(err.error.as_deref(), Some("node not found"));
}
