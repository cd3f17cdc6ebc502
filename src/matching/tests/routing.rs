use super::common::*;
use axum::extract::{Query, State};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::matching::domain::RawApplicantProfile;
use crate::matching::router::{
    priority_handler, ranking_batch_handler, BatchQuery, BatchRequest, RankingQuery,
};

async fn post_json(uri: &str, payload: Value) -> Response {
    router()
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

fn profile_json() -> Value {
    serde_json::to_value(raw_profile()).unwrap()
}

#[tokio::test]
async fn priority_handler_returns_one_entry_per_variant() {
    let response = priority_handler(
        State(Arc::new(service())),
        axum::Json(raw_with_signals(Some("Toán"), true, false)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    let entries = body.as_array().expect("array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["label"], "olympiad:Toán");
    assert_eq!(entries[0]["programs"]["CTU7140201HSG"], 1.0);
    assert_eq!(entries[1]["label"], "armed-forces-hero");
}

#[tokio::test]
async fn priority_handler_rejects_missing_fields() {
    let raw = RawApplicantProfile {
        school_type: None,
        ..raw_profile()
    };
    let response = priority_handler(State(Arc::new(service())), axum::Json(raw)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["field"], "school_type");
}

#[tokio::test]
async fn ranking_route_returns_programs_best_first() {
    let response = post_json("/api/v1/predict/ranking", profile_json()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    let codes: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|entry| entry["program_code"].as_str())
        .collect();
    assert_eq!(codes, vec!["CTU7140201", "UEF7140201THPTQG", "CTU7140202"]);
}

#[tokio::test]
async fn ranking_route_honours_threshold_query() {
    let response = post_json("/api/v1/predict/ranking?threshold=0.85", profile_json()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["program_code"], "CTU7140201");
}

#[tokio::test]
async fn ranking_route_rejects_threshold_out_of_range() {
    let response = post_json("/api/v1/predict/ranking?threshold=1.5", profile_json()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ranking_route_returns_empty_list_for_unserved_province() {
    let mut payload = profile_json();
    payload["province"] = json!("Hà Nội");
    let response = post_json("/api/v1/predict/ranking", payload).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await, json!([]));
}

#[tokio::test]
async fn batch_route_keeps_input_order() {
    let mut unserved = profile_json();
    unserved["province"] = json!("Hà Nội");
    let payload = json!({ "items": [profile_json(), unserved, profile_json()] });

    let response = post_json("/api/v1/predict/ranking/batch?concurrency=2", payload).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    let lists = body.as_array().expect("array");
    assert_eq!(lists.len(), 3);
    assert_eq!(lists[0].as_array().map(Vec::len), Some(3));
    assert_eq!(lists[1], json!([]));
    assert_eq!(lists[0], lists[2]);
}

#[tokio::test]
async fn batch_route_rejects_oversized_batches() {
    let items: Vec<Value> = (0..5).map(|_| profile_json()).collect();
    let response = post_json("/api/v1/predict/priority/batch", json!({ "items": items })).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = read_json_body(response).await;
    assert_eq!(body["max"], 4);
}

#[tokio::test]
async fn batch_route_rejects_zero_concurrency() {
    let payload = json!({ "items": [profile_json()] });
    let response = post_json("/api/v1/predict/priority/batch?concurrency=0", payload).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_route_accepts_huge_concurrency() {
    let payload = json!({ "items": [profile_json()] });
    let uri = format!("/api/v1/predict/priority/batch?concurrency={}", usize::MAX);
    let response = post_json(&uri, payload).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn batch_handler_reports_index_of_invalid_item() {
    let invalid = RawApplicantProfile {
        exam_score: None,
        ..raw_profile()
    };
    let request = BatchRequest {
        items: vec![raw_profile(), invalid],
    };
    let response = ranking_batch_handler(
        State(Arc::new(service())),
        Query(BatchQuery::default()),
        axum::Json(request),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = read_json_body(response).await;
    assert_eq!(body["index"], 1);
    assert_eq!(body["field"], "exam_score");
}

#[tokio::test]
async fn ranking_query_defaults_to_configured_threshold() {
    let query = RankingQuery::default();
    assert!(query.threshold.is_none());

    let response = post_json("/api/v1/predict/ranking", profile_json()).await;
    let body = read_json_body(response).await;
    assert!(body
        .as_array()
        .expect("array")
        .iter()
        .all(|entry| entry["score"].as_f64().unwrap_or_default() >= 0.5));
}
