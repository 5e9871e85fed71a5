//! Shared application state for the Axum router (§5 "Shared resources" —
//! cache, resolver, and LLM client are process-wide and constructed once).

use std::sync::Arc;
use std::time::Instant;

use lex_cache::Cache;
use lex_core::LexConfig;
use lex_pipeline::Pipeline;
use lex_resolver::Resolver;
use tokio_util::sync::CancellationToken;

/// Everything a route handler needs. Cheap to clone (every field is an
/// `Arc` or `Copy`), threaded through `axum::extract::State`.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub resolver: Arc<Resolver>,
    pub cache: Arc<Cache>,
    pub config: Arc<LexConfig>,
    pub start_time: Arc<Instant>,
    /// Cancelled once graceful shutdown begins; every in-flight request's
    /// own per-request token is a child of this one, so a single cancel
    /// here propagates everywhere (§5 "Cancellation", §6 "Exit /
    /// shutdown").
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        pipeline: Arc<Pipeline>,
        resolver: Arc<Resolver>,
        cache: Arc<Cache>,
        config: LexConfig,
    ) -> Self {
        Self {
            pipeline,
            resolver,
            cache,
            config: Arc::new(config),
            start_time: Arc::new(Instant::now()),
            shutdown: CancellationToken::new(),
        }
    }

    /// A request-scoped cancellation token, cancelled either by the
    /// caller or when shutdown begins (§5, §6).
    pub fn request_cancel_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
