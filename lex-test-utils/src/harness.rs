//! Assembled test doubles for the components higher crates wire
//! together — a disk-backed [`Cache`] under a scratch directory, a
//! [`Resolver`] over a small in-memory vocabulary, and a [`Pipeline`]
//! built from both plus mock providers, matching the setup every
//! `lex-pipeline`/`lex-api` integration test needs.

use std::sync::Arc;

use lex_cache::Cache;
use lex_core::LexConfig;
use lex_llm::LlmClient;
use lex_pipeline::Pipeline;
use lex_providers::{DictionaryProvider, ProviderFetcher};
use lex_resolver::{Resolver, ResolverBuilder, VocabularyEntry};

/// A `Cache` backed by a temp directory that is deleted when the guard
/// drops. Keep the `TempDir` alive for the test's duration.
pub struct TestCache {
    pub cache: Arc<Cache>,
    _dir: tempfile::TempDir,
}

/// A disk-backed cache rooted in a fresh temp directory (§4.1), using the
/// development config's namespace/TTL settings.
pub fn test_cache() -> TestCache {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut settings = LexConfig::development().cache;
    settings.disk_root = dir.path().to_string_lossy().to_string();
    let cache = Arc::new(Cache::open(&settings).expect("open test cache"));
    TestCache { cache, _dir: dir }
}

/// A resolver over a fixed word list, with semantic search left
/// unstarted (tests that need semantic hits build their own
/// `ResolverBuilder`).
pub fn test_resolver(words: &[&str]) -> Arc<Resolver> {
    let entries = words
        .iter()
        .map(|w| VocabularyEntry { normalized: w.to_string(), canonical: w.to_string(), embedding: None })
        .collect();
    let (resolver, _semantic) = ResolverBuilder::new().with_entries(entries).build().expect("build resolver");
    Arc::new(resolver)
}

/// An `LlmClient` wired to an unreachable API key — safe to construct in
/// any test that never exercises `ai_default_on` (passthrough / cached
/// paths), since no network call is made unless the synthesizer actually
/// runs.
pub fn test_llm(cache: Arc<Cache>) -> Arc<LlmClient> {
    Arc::new(LlmClient::new(LexConfig::development().llm, cache))
}

/// A `ProviderFetcher` wrapping whichever providers the test supplies.
pub fn test_fetcher(cache: Arc<Cache>, providers: Vec<Arc<dyn DictionaryProvider>>) -> Arc<ProviderFetcher> {
    Arc::new(ProviderFetcher::new(cache, providers))
}

/// A development-shaped config with semantic search disabled (no
/// embedding model reachable in tests) and `providers.selected` pointed
/// at the given mock provider names.
pub fn test_config(selected_providers: &[&str]) -> LexConfig {
    let mut config = LexConfig::development();
    config.providers.selected = selected_providers.iter().map(|s| s.to_string()).collect();
    config.resolver.semantic_enabled = false;
    config
}

/// Assemble a `Pipeline` from a fresh cache, a resolver over `words`, the
/// given mock providers, and `config`. Returns the cache guard alongside
/// so the caller can pre-seed it before running the pipeline.
pub fn test_pipeline(
    words: &[&str],
    providers: Vec<Arc<dyn DictionaryProvider>>,
    config: LexConfig,
) -> (Pipeline, TestCache) {
    let test_cache = test_cache();
    let resolver = test_resolver(words);
    let fetcher = test_fetcher(Arc::clone(&test_cache.cache), providers);
    let llm = test_llm(Arc::clone(&test_cache.cache));
    let pipeline = Pipeline::new(Arc::clone(&test_cache.cache), resolver, fetcher, llm, config);
    (pipeline, test_cache)
}
