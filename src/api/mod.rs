//! HTTP surface: the generation proxy endpoints and a health probe.

pub mod explain;
pub mod logo;

use crate::error::ApiError;
use crate::middleware::{ClientId, ClientIdPolicy};
use crate::upstream::GenerationBackend;
use crate::{RateLimitConfig, RateLimiter};
use axum::{
    Json, Router,
    extract::FromRef,
    http::{HeaderMap, HeaderName, HeaderValue},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const LOGO_ROUTE: &str = "logo";
pub const EXPLAIN_ROUTE: &str = "explain";

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Per-route admission limits.
#[derive(Debug, Clone)]
pub struct RouteLimits {
    pub logo: RateLimitConfig,
    /// `None` leaves code explanation ungated.
    pub explain: Option<RateLimitConfig>,
}

impl Default for RouteLimits {
    fn default() -> Self {
        Self {
            logo: RateLimitConfig::per_millis(1, 1000),
            explain: None,
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<dyn RateLimiter>,
    pub backend: Arc<dyn GenerationBackend>,
    pub limits: RouteLimits,
    pub client_ids: ClientIdPolicy,
}

impl AppState {
    pub fn new(
        limiter: Arc<dyn RateLimiter>,
        backend: Arc<dyn GenerationBackend>,
        limits: RouteLimits,
    ) -> Self {
        Self {
            limiter,
            backend,
            limits,
            client_ids: ClientIdPolicy::default(),
        }
    }

    pub fn with_client_id_policy(mut self, policy: ClientIdPolicy) -> Self {
        self.client_ids = policy;
        self
    }

    /// Consume one of `client`'s admission slots for `route`, or fail with 429.
    ///
    /// Every route counts separately. Only the decision is serialized; the
    /// caller makes its upstream call after this returns. The returned headers
    /// describe what is left of the window.
    pub async fn admit(
        &self,
        route: &str,
        client: &ClientId,
        limit: &RateLimitConfig,
    ) -> Result<HeaderMap, ApiError> {
        let result = self.limiter.check(&limiter_key(route, client), limit).await;
        if result.allowed {
            Ok(rate_limit_headers(limit.max_request, result.remaining))
        } else {
            Err(ApiError::RateLimited {
                limit: limit.max_request,
                retry_after: result.retry_after,
            })
        }
    }
}

impl FromRef<AppState> for ClientIdPolicy {
    fn from_ref(state: &AppState) -> Self {
        state.client_ids
    }
}

pub(crate) fn limiter_key(route: &str, client: &ClientId) -> String {
    format!("{route}:{}", client.as_str())
}

pub(crate) fn rate_limit_headers(limit: u32, remaining: u32) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/generate-logo", post(logo::generate_logo_handler))
        .route("/api/explain-code", post(explain::explain_code_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// A required text field is present and not empty.
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
