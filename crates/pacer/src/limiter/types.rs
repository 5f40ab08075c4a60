//! Configuration and status types for rate limiting

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`RateLimiter`](super::RateLimiter)
///
/// A limiter admits at most `max_tokens` operations per `interval`, with
/// tokens accruing continuously over the interval. One limiter is meant to
/// guard one named upstream resource (e.g. "Twitter API", "Twitter
/// Mentions"); the name keys the on-disk snapshot and shows up in logs.
///
/// # Examples
///
/// ```ignore
/// use pacer::LimiterConfig;
/// use std::time::Duration;
///
/// // 15 posts per 15 minutes, snapshots under ~/.pacer/limits
/// let posts = LimiterConfig::per_minutes("Twitter API", 15, 15.0);
///
/// // In-memory only, custom interval
/// let probe = LimiterConfig::new("probe", 5, Duration::from_secs(10))
///     .without_persistence();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Resource name; used for logging and snapshot file naming
    pub name: String,

    /// Bucket capacity: operations admitted per interval (minimum 1)
    pub max_tokens: u32,

    /// Refill interval
    #[serde(with = "duration_ms")]
    pub interval: Duration,

    /// Whether to mirror state to a disk snapshot
    #[serde(default = "default_persistence")]
    pub persistence: bool,

    /// Snapshot directory; defaults to `~/.pacer/limits`
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

fn default_persistence() -> bool {
    true
}

/// Serde support for Duration as integer milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            max_tokens: 60,
            interval: Duration::from_secs(60),
            persistence: true,
            state_dir: None,
        }
    }
}

impl LimiterConfig {
    /// Create a configuration with an explicit interval
    pub fn new(name: impl Into<String>, max_tokens: u32, interval: Duration) -> Self {
        Self {
            name: name.into(),
            max_tokens,
            interval,
            ..Default::default()
        }
    }

    /// Create a configuration with the interval given in minutes
    ///
    /// This matches the shape limits are usually quoted in ("15 requests
    /// per 15 minutes"). Fractional minutes are fine.
    pub fn per_minutes(name: impl Into<String>, max_tokens: u32, minutes: f64) -> Self {
        let secs = if minutes.is_finite() && minutes > 0.0 {
            minutes * 60.0
        } else {
            0.001
        };
        Self::new(name, max_tokens, Duration::from_secs_f64(secs))
    }

    /// Set the snapshot directory
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    /// Disable the disk snapshot; state lives in memory only
    pub fn without_persistence(mut self) -> Self {
        self.persistence = false;
        self
    }

    /// Enable or disable the disk snapshot
    pub fn with_persistence(mut self, persistence: bool) -> Self {
        self.persistence = persistence;
        self
    }

    /// Bucket capacity, clamped to at least one token
    pub fn capacity(&self) -> u32 {
        self.max_tokens.max(1)
    }

    /// Interval in milliseconds, clamped to at least one
    pub fn interval_ms(&self) -> u64 {
        (self.interval.as_millis() as u64).max(1)
    }

    /// Resolved snapshot directory
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(default_state_dir)
    }
}

/// Default snapshot directory (`~/.pacer/limits`)
fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".pacer")
        .join("limits")
}

/// Point-in-time counters for a limiter, returned by
/// [`RateLimiter::status`](super::RateLimiter::status)
///
/// Diagnostic only; reading it never consumes a token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimiterStatus {
    /// Tokens currently available, in `[0, max_tokens]`
    pub current_tokens: f64,
    /// Grants since the current reporting interval began
    pub requests_this_interval: u32,
    /// Bucket capacity
    pub max_tokens: u32,
}
