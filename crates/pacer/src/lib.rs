//! Pacer - persistent token-bucket rate limiting
//!
//! This crate gates call sites against an upstream API budget: no more than
//! `max_tokens` operations per interval, with continuous (fractional) refill
//! and an acquire-or-wait contract. Limiter state is snapshotted to disk so
//! a restarted process resumes approximately where it left off.

pub mod error;
pub mod limiter;

// Re-export commonly used types
pub use error::{PacerError, PacerResult};
pub use limiter::{LimiterConfig, LimiterStatus, RateLimiter};
