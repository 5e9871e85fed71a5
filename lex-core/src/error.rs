//! Error taxonomy for the lex word-lookup service (spec §7).
//!
//! Each subsystem gets its own error enum; `LexError` unifies them with
//! `#[from]` conversions so call sites can use `?` across crate boundaries.

use thiserror::Error;

/// Cache-layer errors (§4.1).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("disk I/O failed for namespace {namespace}: {reason}")]
    DiskIo { namespace: String, reason: String },

    #[error("cache entry corrupted in namespace {namespace}, key {key}")]
    Corrupted { namespace: String, key: String },

    #[error("unknown namespace: {namespace}")]
    UnknownNamespace { namespace: String },

    #[error("builder for {namespace}/{key} failed: {reason}")]
    BuildFailed {
        namespace: String,
        key: String,
        reason: String,
    },

    #[error("content location missing for namespace {namespace}, key {key}")]
    ContentLocationMissing { namespace: String, key: String },
}

/// Resolver errors (§4.4).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolverError {
    #[error("vocabulary index build failed: {reason}")]
    IndexBuildFailed { reason: String },

    #[error("semantic search is not ready (state: {state})")]
    SemanticNotReady { state: String },

    #[error("semantic search initialization failed: {reason}")]
    SemanticInitFailed { reason: String },
}

/// Provider fetch errors (§4.5).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider {provider} rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: Option<u64>,
    },

    #[error("provider {provider} returned transient error: {status}")]
    Transient { provider: String, status: u16 },

    #[error("provider {provider} returned permanent error: {status}: {message}")]
    Permanent {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("provider {provider} response could not be parsed: {reason}")]
    ParseFailed { provider: String, reason: String },
}

/// LLM client errors (§4.6).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("no model configured for tier {tier}")]
    TierNotConfigured { tier: String },

    #[error("LLM request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("LLM rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("structured output did not satisfy schema: {reason}")]
    SchemaViolation { reason: String },

    #[error("prompt template not found: {name}")]
    TemplateNotFound { name: String },
}

/// Synthesis errors (§4.7).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("clustering failed: {reason}")]
    ClusteringFailed { reason: String },

    #[error("definition synthesis failed for cluster {cluster_id}: {reason}")]
    DefinitionSynthesisFailed { cluster_id: String, reason: String },
}

/// Pipeline orchestration errors (§4.8, §6 "shutdown"). Distinct from the
/// bare top-level `LexError::{Cancelled,DeadlineExceeded}` variants, which
/// cover the generic case — these name pipeline-specific situations that
/// need their own illustrative kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no candidate word found for query {query:?}")]
    NoCandidate { query: String },

    #[error("all providers failed and AI synthesis is disabled")]
    UpstreamUnavailable,

    #[error("server is shutting down, request refused")]
    ShuttingDown,
}

/// Top-level error taxonomy (§7). `kind()` returns the illustrative kind
/// name used in the user-visible error payload and in logs.
#[derive(Debug, Clone, Error)]
pub enum LexError {
    #[error("not found")]
    NotFound,

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    #[error("synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("upstream unavailable: all providers and LLM fallback failed")]
    UpstreamUnavailable,

    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("cancelled")]
    Cancelled,

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl LexError {
    /// The illustrative taxonomy kind from §7, used for the SSE `error`
    /// event payload and for the unary JSON error body.
    pub fn kind(&self) -> &'static str {
        match self {
            LexError::NotFound => "not_found",
            LexError::Cache(CacheError::Corrupted { .. }) => "corrupted_cache",
            LexError::Cache(_) => "storage_error",
            LexError::Resolver(_) => "internal",
            LexError::Provider(ProviderError::RateLimited { .. }) => "rate_limited",
            LexError::Provider(_) => "provider_error",
            LexError::Llm(LlmError::RateLimited { .. }) => "rate_limited",
            LexError::Llm(_) => "llm_error",
            LexError::Synthesis(_) => "llm_error",
            LexError::Pipeline(PipelineError::NoCandidate { .. }) => "not_found",
            LexError::Pipeline(PipelineError::UpstreamUnavailable) => "upstream_unavailable",
            LexError::Pipeline(PipelineError::ShuttingDown) => "shutting_down",
            LexError::UpstreamUnavailable => "upstream_unavailable",
            LexError::Timeout(_) => "timeout",
            LexError::DeadlineExceeded => "deadline_exceeded",
            LexError::Cancelled => "cancelled",
            LexError::Storage { .. } => "storage_error",
            LexError::Internal(_) => "internal",
        }
    }

    /// Whether this error is transient and must not be cached as a
    /// negative result (§7 "User-visible behaviour").
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LexError::Provider(ProviderError::RateLimited { .. })
                | LexError::Provider(ProviderError::Transient { .. })
                | LexError::Llm(LlmError::RateLimited { .. })
                | LexError::Timeout(_)
                | LexError::DeadlineExceeded
        )
    }
}

/// Result type alias used throughout the workspace.
pub type LexResult<T> = Result<T, LexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mapping_matches_taxonomy() {
        assert_eq!(LexError::NotFound.kind(), "not_found");
        assert_eq!(
            LexError::Provider(ProviderError::RateLimited {
                provider: "wiktionary".into(),
                retry_after_ms: Some(500)
            })
            .kind(),
            "rate_limited"
        );
        assert_eq!(LexError::UpstreamUnavailable.kind(), "upstream_unavailable");
    }

    #[test]
    fn rate_limit_and_timeout_are_transient() {
        assert!(LexError::Timeout(std::time::Duration::from_secs(1)).is_transient());
        assert!(!LexError::NotFound.is_transient());
    }
}
