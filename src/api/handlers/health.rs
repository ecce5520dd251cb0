//! Health and status endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::api::server::AppState;

/// Health check; 503 while the pool has no active proxy
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.service.status();
    let code = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(report))
}

/// Full status report
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.status())
}
