pub mod algorithms;
pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod middleware;
pub mod storage;
pub mod upstream;

use std::time::Duration;

use error::RateLimitError;

//configuration for a rate limiter
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    //max requests admitted per window
    pub max_request: u32,
    //length of a counting window
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn new(max_request: u32, window: Duration) -> Self {
        Self {
            max_request,
            window,
        }
    }

    pub fn per_millis(max_request: u32, window_ms: u64) -> Self {
        Self::new(max_request, Duration::from_millis(window_ms))
    }

    /// Rejects a zero limit or a zero-length window.
    pub fn validate(&self) -> Result<(), RateLimitError> {
        if self.max_request == 0 {
            return Err(RateLimitError::InvalidConfig(
                "max_request must be at least 1".to_string(),
            ));
        }
        if self.window.is_zero() {
            return Err(RateLimitError::InvalidConfig(
                "window must be longer than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    // whether the request is allowed
    pub allowed: bool,
    // Remaining Request in current window
    pub remaining: u32,
    // time until the current window closes, zero when allowed
    pub retry_after: Duration,
}

/// Admission gate shared by every endpoint that calls out to a billed upstream.
///
/// The in-memory [`algorithms::FixedWindowLimiter`] is the default; anything
/// that can answer `allow(id, limit, window)` (a shared counter service, for
/// instance) can stand in for it without touching the handlers.
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    //check if a request is allowed for the given key and record it when it is
    async fn check(&self, key: &str, config: &RateLimitConfig) -> RateLimitResult;

    async fn allow(&self, key: &str, limit: u32, window: Duration) -> bool {
        self.check(key, &RateLimitConfig::new(limit, window))
            .await
            .allowed
    }
}

//re-export main types
pub use algorithms::FixedWindowLimiter;
pub use clock::{Clock, ManualClock, SystemClock};
pub use storage::{MemoryStorage, WindowState};
