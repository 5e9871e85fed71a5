//! The per-provider fetch contract (§4.5).

use async_trait::async_trait;
use lex_core::{ProviderError, Word};

/// A single dictionary data source. Implementations own their own HTTP
/// parsing; the fetcher (§4.5) owns rate limiting, caching, concurrency,
/// and ordering — the same split the teacher draws between its
/// `EmbeddingProvider`/`SummarizationProvider` trait implementations and
/// the orchestration code that calls them.
#[async_trait]
pub trait DictionaryProvider: Send + Sync {
    /// Stable identity used for cache keys, `provider_set`, and
    /// deterministic result ordering (§4.5 "sorted by provider identity").
    fn name(&self) -> &'static str;

    /// The host this provider's rate limiting and backoff are scoped to.
    fn host(&self) -> &'static str;

    async fn fetch_raw(&self, word: &Word) -> Result<lex_core::ProviderData, ProviderError>;
}
