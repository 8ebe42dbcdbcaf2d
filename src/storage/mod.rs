pub mod memory;

pub use memory::MemoryStorage;

use std::time::{Duration, Instant};

//state for the fixed window algorithm, one per client identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowState {
    //requests observed inside the current window
    pub count: u32,
    pub window_start: Instant,
    //window length the record was opened with
    pub window: Duration,
}

impl WindowState {
    pub fn open(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            window_start: now,
            window,
        }
    }

    /// A window is over once its full length has elapsed.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= self.window
    }
}

//Generic trait for rate limit storage backends
// T is the per-key state type
pub trait RateLimitStorage<T>: Send + Sync
where
    T: Clone + Send + Sync,
{
    //Get a copy of the state for a key, returns None if it doesn't exist
    fn get(&self, key: &str) -> Option<T>;

    /// Atomically read and replace the state for `key`.
    ///
    /// `f` sees the current state (if any) and returns the state to store plus
    /// a value handed back to the caller. No other update for the same key can
    /// interleave with `f`.
    fn update<R, F>(&self, key: &str, f: F) -> R
    where
        F: FnOnce(Option<&T>) -> (T, R);

    //drop every entry for which `keep` returns false, returns how many were removed
    fn retain<F>(&self, keep: F) -> usize
    where
        F: FnMut(&T) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
