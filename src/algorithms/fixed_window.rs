use crate::clock::{Clock, SystemClock};
use crate::storage::{MemoryStorage, RateLimitStorage, WindowState};
use crate::{RateLimitConfig, RateLimitResult, RateLimiter};
use std::time::{Duration, Instant};
use tracing::debug;

/// Chance that a given check also sweeps expired records out of the store.
pub const DEFAULT_SWEEP_PROBABILITY: f64 = 0.01;

/// Fixed window counter rate limiter
/// Counts requests per key and resets the count when the window runs out
pub struct FixedWindowLimiter<S: RateLimitStorage<WindowState>, C: Clock = SystemClock> {
    storage: S,
    clock: C,
    sweep_probability: f64,
}

impl FixedWindowLimiter<MemoryStorage<WindowState>, SystemClock> {
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new(), SystemClock)
    }
}

impl<S: RateLimitStorage<WindowState>, C: Clock> FixedWindowLimiter<S, C> {
    pub fn new(storage: S, clock: C) -> Self {
        Self {
            storage,
            clock,
            sweep_probability: DEFAULT_SWEEP_PROBABILITY,
        }
    }

    pub fn with_sweep_probability(mut self, probability: f64) -> Self {
        self.sweep_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Record a request for `key` and decide whether it may proceed.
    ///
    /// The decision happens under the store's per-key lock; the optional sweep
    /// runs afterwards and never changes the outcome.
    pub fn check_and_update(&self, key: &str, config: &RateLimitConfig) -> RateLimitResult {
        let now = self.clock.now();
        let result = self
            .storage
            .update(key, |state| admit(state, now, config));

        if !result.allowed {
            debug!(
                client = %key,
                retry_after_ms = result.retry_after.as_millis() as u64,
                "request denied"
            );
        }

        if sweep_due(rand::random::<f64>(), self.sweep_probability) {
            self.sweep(now);
        }

        result
    }

    /// Remove every record whose window has closed at `now`.
    pub fn sweep(&self, now: Instant) -> usize {
        let removed = self.storage.retain(|state| !state.is_expired(now));
        if removed > 0 {
            debug!(removed, remaining = self.storage.len(), "swept expired rate limit records");
        }
        removed
    }
}

/// Admission decision for one request.
///
/// Returns the state to store and the verdict. A missing or expired record
/// opens a fresh window with the request already counted; an open window
/// admits while its count is below the limit.
pub fn admit(
    state: Option<&WindowState>,
    now: Instant,
    config: &RateLimitConfig,
) -> (WindowState, RateLimitResult) {
    let limit = config.max_request;
    match state {
        Some(current) if !current.is_expired(now) => {
            if current.count < limit {
                let next = WindowState {
                    count: current.count + 1,
                    ..current.clone()
                };
                let remaining = limit - next.count;
                (
                    next,
                    RateLimitResult {
                        allowed: true,
                        remaining,
                        retry_after: Duration::ZERO,
                    },
                )
            } else {
                let elapsed = now.saturating_duration_since(current.window_start);
                (
                    current.clone(),
                    RateLimitResult {
                        allowed: false,
                        remaining: 0,
                        retry_after: current.window.saturating_sub(elapsed),
                    },
                )
            }
        }
        _ => (
            WindowState::open(now, config.window),
            RateLimitResult {
                allowed: true,
                remaining: limit.saturating_sub(1),
                retry_after: Duration::ZERO,
            },
        ),
    }
}

/// `roll` is a uniform sample in `[0, 1)`.
pub fn sweep_due(roll: f64, probability: f64) -> bool {
    roll < probability
}

#[async_trait::async_trait]
impl<S: RateLimitStorage<WindowState>, C: Clock> RateLimiter for FixedWindowLimiter<S, C> {
    async fn check(&self, key: &str, config: &RateLimitConfig) -> RateLimitResult {
        self.check_and_update(key, config)
    }
}
