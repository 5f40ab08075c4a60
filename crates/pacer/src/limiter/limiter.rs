//! Token-bucket rate limiter with snapshot persistence

use super::state::{epoch_ms, LimiterState};
use super::store::SnapshotStore;
use super::types::{LimiterConfig, LimiterStatus};
use crate::error::{PacerError, PacerResult};
use std::future::Future;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Rate limiter using a continuously refilled token bucket
///
/// One instance guards one named upstream resource. Construct instances
/// explicitly at the process's composition root and hand them to whichever
/// components need gating; the limiter is `Send + Sync` and is normally
/// shared behind an `Arc`.
///
/// Counters are mirrored to a JSON snapshot after every state change, so a
/// restarted process resumes with roughly the budget it had. Snapshots are
/// a single-process convenience: the file is read once at construction and
/// carries no cross-process locking.
#[derive(Debug)]
pub struct RateLimiter {
    /// Configuration
    config: LimiterConfig,
    /// Bucket counters
    state: Mutex<LimiterState>,
    /// Disk snapshot, when persistence is enabled
    store: Option<SnapshotStore>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_tokens` operations per
    /// `interval_minutes`, with persistence under the default state
    /// directory
    pub fn new(max_tokens: u32, interval_minutes: f64, name: impl Into<String>) -> Self {
        Self::with_config(LimiterConfig::per_minutes(name, max_tokens, interval_minutes))
    }

    /// Create a limiter from a full configuration
    ///
    /// Loads the prior snapshot keyed by the limiter name. A snapshot
    /// older than twice the interval is discarded, as is anything
    /// unreadable or unparsable; the bucket then starts full.
    pub fn with_config(config: LimiterConfig) -> Self {
        let store = config
            .persistence
            .then(|| SnapshotStore::new(&config.state_dir(), &config.name));

        let now = epoch_ms();
        let max_tokens = config.capacity();
        let interval_ms = config.interval_ms();

        let state = match store.as_ref().map(|s| s.load()) {
            Some(Ok(Some(snap))) if !snap.is_stale(now, interval_ms) => {
                tracing::debug!(
                    limiter = %config.name,
                    tokens = snap.current_tokens,
                    "restored limiter snapshot"
                );
                LimiterState::restore(max_tokens, interval_ms, &snap)
            }
            Some(Ok(Some(_))) => {
                tracing::debug!(
                    limiter = %config.name,
                    "snapshot is stale, starting with a full bucket"
                );
                LimiterState::full(max_tokens, interval_ms, now)
            }
            Some(Err(e)) => {
                tracing::warn!(
                    limiter = %config.name,
                    error = %e,
                    "failed to load limiter snapshot, starting with a full bucket"
                );
                LimiterState::full(max_tokens, interval_ms, now)
            }
            Some(Ok(None)) | None => LimiterState::full(max_tokens, interval_ms, now),
        };

        Self {
            config,
            state: Mutex::new(state),
            store,
        }
    }

    /// Wait until a token is available and consume it
    ///
    /// Callers are served in lock-acquisition order; waiters released by
    /// the same timer each re-run the refill before consuming. There is no
    /// upper bound on the wait: with a slow enough configured rate a caller
    /// can block for a long time. Use [`acquire_timeout`] to bound it.
    ///
    /// [`acquire_timeout`]: Self::acquire_timeout
    pub async fn acquire(&self) {
        loop {
            match self.poll_token().await {
                None => return,
                Some(wait) => {
                    tracing::trace!(
                        limiter = %self.config.name,
                        wait_ms = wait.as_millis() as u64,
                        "waiting for a token"
                    );
                    sleep(wait).await;
                }
            }
        }
    }

    /// Like [`acquire`](Self::acquire), but give up after `max_wait`
    pub async fn acquire_timeout(&self, max_wait: Duration) -> PacerResult<()> {
        let start = Instant::now();
        loop {
            let wait = match self.poll_token().await {
                None => return Ok(()),
                Some(wait) => wait,
            };

            let waited = start.elapsed();
            if waited >= max_wait {
                return Err(PacerError::Timeout { waited });
            }
            sleep(wait.min(max_wait - waited)).await;
        }
    }

    /// Consume a token if one is immediately available
    pub async fn try_acquire(&self) -> bool {
        self.poll_token().await.is_none()
    }

    /// Current counters, without consuming a token
    pub async fn status(&self) -> LimiterStatus {
        let mut state = self.state.lock().await;
        if state.refill(epoch_ms()) {
            self.persist(&mut state);
        }
        LimiterStatus {
            current_tokens: state.current_tokens,
            requests_this_interval: state.requests_this_interval,
            max_tokens: state.max_tokens,
        }
    }

    /// Acquire a token, then run `f`
    ///
    /// A failing guarded future still costs its token: the limit protects
    /// the upstream service whether or not the call succeeds. Its error
    /// propagates unchanged.
    pub async fn schedule<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire().await;
        f().await
    }

    /// Time until a whole token is available; zero when one already is
    pub async fn time_until_next_token(&self) -> Duration {
        let mut state = self.state.lock().await;
        if state.refill(epoch_ms()) {
            self.persist(&mut state);
        }
        state.time_to_next_token()
    }

    /// Timestamp of the last granted token, if any
    pub async fn last_action(&self) -> Option<SystemTime> {
        let state = self.state.lock().await;
        state
            .last_action_time
            .map(|ms| UNIX_EPOCH + Duration::from_millis(ms))
    }

    /// Elapsed time since the last granted token
    pub async fn time_since_last_action(&self) -> Option<Duration> {
        let state = self.state.lock().await;
        state
            .last_action_time
            .map(|ms| Duration::from_millis(epoch_ms().saturating_sub(ms)))
    }

    /// Limiter name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configuration
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Refill, then either consume a token (`None`) or report how long
    /// until one accrues (`Some(wait)`)
    ///
    /// The lock is released before any sleeping happens.
    async fn poll_token(&self) -> Option<Duration> {
        let mut state = self.state.lock().await;
        let now = epoch_ms();
        let refilled = state.refill(now);

        if state.current_tokens >= 1.0 {
            state.consume(now);
            self.persist(&mut state);
            None
        } else {
            if refilled {
                self.persist(&mut state);
            }
            Some(state.time_to_next_token())
        }
    }

    /// Write the snapshot, swallowing failures
    fn persist(&self, state: &mut LimiterState) {
        let Some(store) = &self.store else {
            return;
        };
        state.last_update = epoch_ms();
        if let Err(e) = store.save(state) {
            tracing::warn!(
                limiter = %self.config.name,
                error = %e,
                "failed to save limiter snapshot"
            );
        }
    }
}
