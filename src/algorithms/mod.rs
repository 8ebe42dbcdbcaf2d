pub mod fixed_window;

pub use fixed_window::FixedWindowLimiter;
pub use fixed_window::{DEFAULT_SWEEP_PROBABILITY, admit, sweep_due};
