use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the relay
#[derive(Error, Debug)]
pub enum RelayError {
    // Proxy source errors
    #[error("Proxy source {source_name} unavailable: {reason}")]
    ProviderUnavailable { source_name: String, reason: String },

    // Proxy errors
    #[error("Proxy test failed: {0}")]
    ProxyTestFailed(String),

    #[error("No proxies available")]
    NoProxyAvailable,

    #[error("Invalid proxy address: {0}")]
    InvalidProxyAddress(String),

    #[error("Unsupported proxy protocol: {0}")]
    UnsupportedProtocol(String),

    // Fetch errors
    #[error("All {attempts} attempts failed for {url}")]
    FetchFailed { url: String, attempts: u32 },

    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),

    #[error("Invalid response body: {0}")]
    InvalidBody(String),

    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    #[error("Operation timed out")]
    Timeout,

    // DNS errors
    #[error("DNS resolution failed for {0}")]
    DnsResolutionFailed(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            RelayError::InvalidRequest(_)
            | RelayError::InvalidProxyAddress(_)
            | RelayError::UnsupportedProtocol(_)
            | RelayError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            // 429 Too Many Requests
            RelayError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 502 Bad Gateway
            RelayError::FetchFailed { .. }
            | RelayError::UpstreamStatus(_)
            | RelayError::InvalidBody(_)
            | RelayError::ProxyTestFailed(_)
            | RelayError::DnsResolutionFailed(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            RelayError::NoProxyAvailable | RelayError::ProviderUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 504 Gateway Timeout
            RelayError::Timeout => StatusCode::GATEWAY_TIMEOUT,

            // 500 Internal Server Error
            RelayError::Io(_) | RelayError::Http(_) | RelayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::Timeout
        } else if let Some(status) = err.status() {
            RelayError::UpstreamStatus(status.as_u16())
        } else {
            RelayError::Http(err.to_string())
        }
    }
}

impl From<url::ParseError> for RelayError {
    fn from(err: url::ParseError) -> Self {
        RelayError::InvalidRequest(err.to_string())
    }
}
