//! Token-bucket rate limiting with disk persistence
//!
//! This module provides rate limiting to keep a process inside an upstream
//! API budget. Tokens refill continuously over the configured interval
//! rather than jumping to full at interval boundaries, which avoids bursty
//! admission right after a rollover. Each named limiter mirrors its counters
//! to a JSON snapshot so a restart resumes with the budget it had.

mod limiter;
mod state;
mod store;
mod types;


pub use limiter::RateLimiter;
pub use types::{LimiterConfig, LimiterStatus};
