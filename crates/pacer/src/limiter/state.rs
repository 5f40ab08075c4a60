//! Limiter state and refill math
//!
//! The state struct doubles as the on-disk snapshot record, so its fields
//! serialize in camelCase to stay compatible with snapshot files written by
//! earlier deployments.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds
pub(crate) fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// In-memory limiter state and on-disk snapshot record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LimiterState {
    /// Bucket capacity
    pub max_tokens: u32,
    /// Mirror of `max_tokens`; written for snapshot compatibility, ignored on load
    pub tokens_per_interval: u32,
    /// Refill interval in milliseconds
    pub interval_ms: u64,
    /// Tokens currently available, in `[0, max_tokens]`
    pub current_tokens: f64,
    /// Epoch ms of the last refill computation
    pub last_refill_time: u64,
    /// Grants since the current reporting interval began (diagnostic only)
    pub requests_this_interval: u32,
    /// Epoch ms when the current reporting interval began
    pub interval_start_time: u64,
    /// Epoch ms of the last granted token
    #[serde(default)]
    pub last_action_time: Option<u64>,
    /// Epoch ms of the last snapshot write
    #[serde(default)]
    pub last_update: u64,
}

impl LimiterState {
    /// A full bucket with all clocks set to `now`
    pub fn full(max_tokens: u32, interval_ms: u64, now: u64) -> Self {
        Self {
            max_tokens,
            tokens_per_interval: max_tokens,
            interval_ms,
            current_tokens: max_tokens as f64,
            last_refill_time: now,
            requests_this_interval: 0,
            interval_start_time: now,
            last_action_time: None,
            last_update: now,
        }
    }

    /// Restore counters from a snapshot
    ///
    /// Capacity and interval stay authoritative from the current
    /// configuration; only the counters and clocks carry over. Restored
    /// tokens are clamped into `[0, max_tokens]`.
    pub fn restore(max_tokens: u32, interval_ms: u64, snap: &LimiterState) -> Self {
        Self {
            max_tokens,
            tokens_per_interval: max_tokens,
            interval_ms,
            current_tokens: snap.current_tokens.clamp(0.0, max_tokens as f64),
            last_refill_time: snap.last_refill_time,
            requests_this_interval: snap.requests_this_interval,
            interval_start_time: snap.interval_start_time,
            last_action_time: snap.last_action_time,
            last_update: snap.last_update,
        }
    }

    /// Whether a snapshot is too old to trust
    ///
    /// A snapshot older than twice the interval would either starve or
    /// over-grant after a long downtime, so it is discarded.
    pub fn is_stale(&self, now: u64, interval_ms: u64) -> bool {
        now.saturating_sub(self.last_refill_time) >= interval_ms.saturating_mul(2)
    }

    /// Continuous refill
    ///
    /// Tokens accrue proportionally to elapsed time, deliberately not a
    /// step function. Returns true when the whole-token count changed;
    /// callers use that to throttle snapshot writes to meaningful changes.
    pub fn refill(&mut self, now: u64) -> bool {
        // Reporting-interval rollover; never gates token math
        if now.saturating_sub(self.interval_start_time) >= self.interval_ms {
            self.requests_this_interval = 0;
            self.interval_start_time = now;
        }

        let elapsed = now.saturating_sub(self.last_refill_time);
        let added = elapsed as f64 / self.interval_ms as f64 * self.max_tokens as f64;
        let whole_before = self.current_tokens.floor();
        self.current_tokens = (self.current_tokens + added).min(self.max_tokens as f64);
        self.last_refill_time = now;

        self.current_tokens.floor() != whole_before
    }

    /// Consume one token and stamp the last-action marker
    pub fn consume(&mut self, now: u64) {
        self.current_tokens = (self.current_tokens - 1.0).max(0.0);
        self.requests_this_interval += 1;
        self.last_action_time = Some(now);
    }

    /// Time until one whole token has accrued; zero when one is available
    pub fn time_to_next_token(&self) -> Duration {
        if self.current_tokens >= 1.0 {
            return Duration::ZERO;
        }
        let fraction = (1.0 - self.current_tokens) / self.max_tokens as f64;
        let ms = (fraction * self.interval_ms as f64).ceil() as u64;
        Duration::from_millis(ms.max(1))
    }
}
