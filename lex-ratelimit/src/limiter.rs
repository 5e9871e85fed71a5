//! Keyed per-host rate limiting (§4.3): a token bucket bounds request rate,
//! a semaphore bounds concurrency, and a [`BackoffState`] tracks adaptive
//! cooldown after rate-limit signals. One `RateLimiter` is shared across
//! every client talking to a given set of hosts (providers, LLM).

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use governor::{Quota, RateLimiter as GovernorLimiter};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::backoff::BackoffState;

type HostBucket = GovernorLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

/// Rate/concurrency budget for a host.
#[derive(Debug, Clone, Copy)]
pub struct HostLimits {
    pub requests_per_second: f64,
    pub max_concurrent: u32,
}

struct HostState {
    bucket: HostBucket,
    semaphore: Arc<Semaphore>,
    backoff: BackoffState,
}

/// Token-bucket limiter keyed by host, with adaptive backoff layered on
/// top (§4.3). A caller acquires a permit, waits out the token bucket and
/// any active backoff, makes its request, then reports the outcome so the
/// backoff state can adapt.
pub struct RateLimiter {
    hosts: DashMap<String, Arc<HostState>>,
    default_limits: HostLimits,
}

impl RateLimiter {
    pub fn new(default_limits: HostLimits) -> Self {
        Self {
            hosts: DashMap::new(),
            default_limits,
        }
    }

    fn host_state(&self, host: &str, limits: HostLimits) -> Arc<HostState> {
        if let Some(state) = self.hosts.get(host) {
            return Arc::clone(state.value());
        }
        let rps = NonZeroU32::new(limits.requests_per_second.ceil().max(1.0) as u32)
            .unwrap_or(NonZeroU32::new(1).expect("1 is nonzero"));
        let quota = Quota::per_second(rps);
        let state = Arc::new(HostState {
            bucket: GovernorLimiter::direct(quota),
            semaphore: Arc::new(Semaphore::new(limits.max_concurrent.max(1) as usize)),
            backoff: BackoffState::new(),
        });
        self.hosts.insert(host.to_string(), Arc::clone(&state));
        state
    }

    /// Acquire throughput for `host`, waiting out the token bucket, the
    /// concurrency cap, and any active backoff window. Returns a guard that
    /// must be reported back via [`Permit::record_success`] or
    /// [`Permit::record_rate_limited`] once the request completes.
    pub async fn acquire(&self, host: &str) -> Permit {
        self.acquire_with_limits(host, self.default_limits).await
    }

    pub async fn acquire_with_limits(&self, host: &str, limits: HostLimits) -> Permit {
        let state = self.host_state(host, limits);

        let wait = state.backoff.remaining_wait();
        if wait > Duration::ZERO {
            debug!(host, wait_ms = wait.as_millis() as u64, "waiting out adaptive backoff");
            tokio::time::sleep(wait).await;
        }

        state.bucket.until_ready().await;

        let permit = Arc::clone(&state.semaphore)
            .acquire_owned()
            .await
            .expect("host semaphore is never closed");

        Permit {
            _concurrency_permit: permit,
            state,
        }
    }
}

/// An acquired slot for one outbound request. Dropping it without calling
/// either `record_*` method just releases concurrency — the backoff state
/// is left untouched, which is the conservative choice if a caller bails
/// out before getting a response.
pub struct Permit {
    _concurrency_permit: tokio::sync::OwnedSemaphorePermit,
    state: Arc<HostState>,
}

impl Permit {
    pub fn record_success(&self) {
        self.state.backoff.record_success();
    }

    pub fn record_rate_limited(&self, retry_after: Option<Duration>) {
        self.state.backoff.record_rate_limited(retry_after);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_grants_a_permit_for_default_limits() {
        let limiter = RateLimiter::new(HostLimits {
            requests_per_second: 100.0,
            max_concurrent: 4,
        });
        let permit = limiter.acquire("api.wiktionary.org").await;
        permit.record_success();
    }

    #[tokio::test]
    async fn concurrency_is_bounded_per_host() {
        let limiter = Arc::new(RateLimiter::new(HostLimits {
            requests_per_second: 1000.0,
            max_concurrent: 2,
        }));

        let p1 = limiter.acquire("host").await;
        let p2 = limiter.acquire("host").await;

        let limiter2 = Arc::clone(&limiter);
        let acquired_third = tokio::time::timeout(Duration::from_millis(50), async move {
            limiter2.acquire("host").await
        })
        .await;
        assert!(acquired_third.is_err(), "third permit should block while two are held");

        drop(p1);
        drop(p2);
    }
}
