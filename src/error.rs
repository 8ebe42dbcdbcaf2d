use crate::api::rate_limit_headers;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::time::Duration;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    //config error
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure talking to the external generation API.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream returned {0}")]
    Status(reqwest::StatusCode),

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid upstream base url: {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";
pub const LOGO_FAILED_MESSAGE: &str = "Failed to generate logo. Please try again.";
pub const EXPLAIN_FAILED_MESSAGE: &str = "Failed to explain code. Please try again.";

/// Errors returned by the generation endpoints.
///
/// The response body only ever carries the fixed messages above or a
/// validation message; upstream causes are logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("rate limit exceeded")]
    RateLimited { limit: u32, retry_after: Duration },

    #[error("logo generation failed: {0}")]
    LogoGeneration(#[source] UpstreamError),

    #[error("code explanation failed: {0}")]
    CodeExplanation(#[source] UpstreamError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::LogoGeneration(_) | ApiError::CodeExplanation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Whole seconds to advertise in `Retry-After`, never below one.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(message) => {
                (status, Json(json!({ "error": message }))).into_response()
            }
            ApiError::RateLimited { limit, retry_after } => {
                let mut response = (
                    status,
                    rate_limit_headers(limit, 0),
                    Json(json!({ "error": RATE_LIMITED_MESSAGE })),
                )
                    .into_response();
                response.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(retry_after_secs(retry_after)),
                );
                response
            }
            ApiError::LogoGeneration(source) => {
                error!(error = %source, "logo generation failed");
                (status, Json(json!({ "error": LOGO_FAILED_MESSAGE }))).into_response()
            }
            ApiError::CodeExplanation(source) => {
                error!(error = %source, "code explanation failed");
                (
                    status,
                    Json(json!({ "error": EXPLAIN_FAILED_MESSAGE, "success": false })),
                )
                    .into_response()
            }
        }
    }
}
