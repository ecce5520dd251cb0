//! Proxy pool handlers

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

use crate::api::server::AppState;

/// Repopulate the pool now and return the resulting status
pub async fn refresh_proxies(State(state): State<AppState>) -> impl IntoResponse {
    let working = state.service.refresh().await;
    info!("Operator refresh finished with {} working proxies", working);

    Json(state.service.status())
}
