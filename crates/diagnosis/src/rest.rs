//! Axum router for the diagnosis HTTP surface.
//!
//! Errors are returned as `{"error": "..."}` with 400 for caller mistakes
//! and 500 for everything else; the error taxonomy decides which is which.

use crate::orchestrator::DiagnosisService;
use crate::types::AnalyzeRequest;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use opsdiag_core::AppError;
use serde_json::json;
use std::sync::Arc;

/// Create the application router.
pub fn build_router(service: Arc<DiagnosisService>) -> Router {
    Router::new()
        .route("/api/diagnosis/analyze", post(analyze))
        .route("/health", get(health))
        .with_state(service)
}

async fn analyze(
    State(service): State<Arc<DiagnosisService>>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    match service.analyze(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e),
    }
}

async fn health(State(service): State<Arc<DiagnosisService>>) -> Response {
    health_response(service.retrieval().count().await)
}

fn health_response(indexed: Result<usize, AppError>) -> Response {
    match indexed {
        Ok(indexed) => {
            Json(json!({ "status": "ok", "indexed_entries": indexed })).into_response()
        }
        Err(e) => {
            tracing::error!("Health check could not read the index: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn error_response(error: AppError) -> Response {
    let status = if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!("Analyze request failed: {}", error);
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(json!({ "error": error.to_string() }))).into_response()
}
