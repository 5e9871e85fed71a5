//! Adaptive backoff (§4.3): when a host tells us to slow down (HTTP 429 /
//! `Retry-After`, or an LLM provider's rate-limit error), we remember a
//! per-host "not before" deadline and widen it with each consecutive
//! failure, same shape as the teacher's single `last_request` timestamp
//! but generalized to a full exponential backoff with jitter-free doubling
//! capped at a ceiling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const INITIAL_BACKOFF_MS: u64 = 250;
const MAX_BACKOFF_MS: u64 = 30_000;

/// Per-host backoff state. `Instant`-relative so it survives across
/// requests without needing wall-clock synchronization.
pub struct BackoffState {
    epoch: Instant,
    not_before_ms: AtomicU64,
    current_backoff_ms: AtomicU64,
}

impl BackoffState {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            not_before_ms: AtomicU64::new(0),
            current_backoff_ms: AtomicU64::new(INITIAL_BACKOFF_MS),
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// How long the caller must wait before the next request to this host.
    pub fn remaining_wait(&self) -> Duration {
        let not_before = self.not_before_ms.load(Ordering::Acquire);
        let now = self.now_ms();
        Duration::from_millis(not_before.saturating_sub(now))
    }

    /// Record a rate-limit signal. `retry_after` overrides the computed
    /// backoff when the upstream gave an explicit value.
    pub fn record_rate_limited(&self, retry_after: Option<Duration>) {
        let backoff_ms = match retry_after {
            Some(d) => d.as_millis() as u64,
            None => {
                let prev = self.current_backoff_ms.load(Ordering::Acquire);
                let next = (prev.saturating_mul(2)).min(MAX_BACKOFF_MS);
                self.current_backoff_ms.store(next, Ordering::Release);
                prev
            }
        };
        let not_before = self.now_ms() + backoff_ms;
        self.not_before_ms.fetch_max(not_before, Ordering::AcqRel);
    }

    /// Record a successful request, resetting the exponential backoff back
    /// to its floor so a single transient spike does not permanently slow
    /// the host down.
    pub fn record_success(&self) {
        self.current_backoff_ms.store(INITIAL_BACKOFF_MS, Ordering::Release);
    }
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_on_repeated_rate_limits() {
        let state = BackoffState::new();
        state.record_rate_limited(None);
        let first_wait = state.remaining_wait();
        state.record_rate_limited(None);
        let second_wait = state.remaining_wait();
        assert!(second_wait >= first_wait);
    }

    #[test]
    fn explicit_retry_after_is_honored() {
        let state = BackoffState::new();
        state.record_rate_limited(Some(Duration::from_millis(5_000)));
        assert!(state.remaining_wait() >= Duration::from_millis(4_900));
    }

    #[test]
    fn success_resets_backoff_floor() {
        let state = BackoffState::new();
        state.record_rate_limited(None);
        state.record_rate_limited(None);
        state.record_success();
        // the floor is back to INITIAL_BACKOFF_MS for the *next* rate limit,
        // though the current not_before deadline (already scheduled) stands.
        assert_eq!(state.current_backoff_ms.load(Ordering::Acquire), INITIAL_BACKOFF_MS);
    }
}
