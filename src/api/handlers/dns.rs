//! DNS handlers

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::api::server::AppState;
use crate::error::RelayError;

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub hostname: String,
    pub provider: Option<String>,
    pub use_cache: Option<bool>,
}

/// Resolve a hostname over DoH; `ip` is null when no provider answered
pub async fn resolve(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> Result<impl IntoResponse, RelayError> {
    let hostname = query.hostname.trim();
    if hostname.is_empty() {
        return Err(RelayError::InvalidRequest("hostname is required".to_string()));
    }

    let ip = state
        .service
        .resolve_with(
            hostname,
            query.provider.as_deref(),
            query.use_cache.unwrap_or(true),
        )
        .await;

    Ok(Json(json!({
        "hostname": hostname,
        "ip": ip,
    })))
}

/// Drop every cached DNS answer
pub async fn clear_cache(State(state): State<AppState>) -> impl IntoResponse {
    let cleared = state.service.clear_dns_cache();
    Json(json!({ "cleared": cleared }))
}
