//! lex-ratelimit — per-host token-bucket rate limiting with adaptive
//! backoff (§4.3). Generalizes the teacher's single-provider
//! semaphore-plus-min-interval client throttle into a keyed limiter that
//! every outbound HTTP client (providers, LLM) shares by host.

mod backoff;
mod limiter;

pub use backoff::BackoffState;
pub use limiter::{HostLimits, RateLimiter};
