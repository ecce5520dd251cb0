//! Fetch handler

use std::collections::BTreeMap;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use url::Url;

use crate::api::server::AppState;
use crate::error::RelayError;

/// Provider name used when the caller does not give one
const UNKNOWN_PROVIDER: &str = "unknown";

#[derive(Debug, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    pub provider: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    pub max_retries: Option<u32>,
}

/// Fetch a remote URL through the relay
pub async fn fetch(
    State(state): State<AppState>,
    Json(req): Json<FetchRequest>,
) -> Result<impl IntoResponse, RelayError> {
    let url = Url::parse(&req.url)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RelayError::InvalidRequest(format!(
            "unsupported URL scheme: {}",
            url.scheme()
        )));
    }

    let provider = req.provider.as_deref().unwrap_or(UNKNOWN_PROVIDER);
    let params: Vec<(String, String)> = req.params.into_iter().collect();

    let body = state
        .service
        .fetch(url.as_str(), provider, &params, req.max_retries)
        .await?;

    Ok(Json(body))
}
