use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::batch::BatchError;
use super::domain::RawApplicantProfile;
use super::service::{MatchingError, MatchingService};

/// Router builder exposing the priority and ranking pipelines.
pub fn matching_router(service: Arc<MatchingService>) -> Router {
    Router::new()
        .route("/api/v1/predict/priority", post(priority_handler))
        .route("/api/v1/predict/priority/batch", post(priority_batch_handler))
        .route("/api/v1/predict/ranking", post(ranking_handler))
        .route("/api/v1/predict/ranking/batch", post(ranking_batch_handler))
        .with_state(service)
}

/// Body of the batch endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub items: Vec<RawApplicantProfile>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BatchQuery {
    pub concurrency: Option<usize>,
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RankingQuery {
    pub threshold: Option<f64>,
}

pub(crate) async fn priority_handler(
    State(service): State<Arc<MatchingService>>,
    Json(profile): Json<RawApplicantProfile>,
) -> Response {
    let outcome = tokio::task::spawn_blocking(move || service.priority(&profile)).await;
    match outcome {
        Ok(Ok(results)) => (StatusCode::OK, Json(results)).into_response(),
        Ok(Err(error)) => error_response(error),
        Err(join) => internal_error(join.to_string()),
    }
}

pub(crate) async fn ranking_handler(
    State(service): State<Arc<MatchingService>>,
    Query(query): Query<RankingQuery>,
    Json(profile): Json<RawApplicantProfile>,
) -> Response {
    let outcome =
        tokio::task::spawn_blocking(move || service.ranking(&profile, query.threshold)).await;
    match outcome {
        Ok(Ok(results)) => (StatusCode::OK, Json(results)).into_response(),
        Ok(Err(error)) => error_response(error),
        Err(join) => internal_error(join.to_string()),
    }
}

pub(crate) async fn priority_batch_handler(
    State(service): State<Arc<MatchingService>>,
    Query(query): Query<BatchQuery>,
    Json(request): Json<BatchRequest>,
) -> Response {
    match service
        .priority_batch(request.items, query.concurrency)
        .await
    {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn ranking_batch_handler(
    State(service): State<Arc<MatchingService>>,
    Query(query): Query<BatchQuery>,
    Json(request): Json<BatchRequest>,
) -> Response {
    match service
        .ranking_batch(request.items, query.concurrency, query.threshold)
        .await
    {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: MatchingError) -> Response {
    let message = error.to_string();
    match error {
        MatchingError::Validation(source) => {
            let payload = json!({
                "error": message,
                "field": source.field(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        MatchingError::ItemValidation { index, source } => {
            let payload = json!({
                "error": message,
                "index": index,
                "field": source.field(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        MatchingError::Batch(BatchError::TooLarge { count, max }) => {
            let payload = json!({
                "error": message,
                "count": count,
                "max": max,
            });
            (StatusCode::PAYLOAD_TOO_LARGE, Json(payload)).into_response()
        }
        MatchingError::Batch(BatchError::InvalidConcurrency)
        | MatchingError::InvalidThreshold(_) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
        }
        MatchingError::Model(_) => internal_error(message),
    }
}

fn internal_error(message: String) -> Response {
    tracing::error!(error = %message, "matching request failed");
    let payload = json!({ "error": message });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}
