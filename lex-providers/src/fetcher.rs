//! Concurrent provider fan-out (§4.5). Given a canonical word and a set of
//! selected provider names, fetch from each concurrently, cache per
//! `(provider, word, language)`, and merge results in a deterministic
//! order regardless of arrival order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use lex_cache::{cache_key, Cache};
use lex_core::{ProviderData, ProviderError, ProviderStatus, Word};
use tracing::{instrument, warn};

use crate::provider::DictionaryProvider;

/// Per-provider cache entries live at least this long (§4.5 "at least 24
/// hours").
const PROVIDER_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const NAMESPACE: &str = "provider:raw";

/// Fans a single word lookup out across every selected provider
/// concurrently, with per-provider caching and partial-failure tolerance.
pub struct ProviderFetcher {
    providers: HashMap<&'static str, Arc<dyn DictionaryProvider>>,
    cache: Arc<Cache>,
}

impl ProviderFetcher {
    pub fn new(cache: Arc<Cache>, providers: Vec<Arc<dyn DictionaryProvider>>) -> Self {
        let providers = providers.into_iter().map(|p| (p.name(), p)).collect();
        Self { providers, cache }
    }

    /// Fetch `ProviderData` from every provider in `selected` concurrently.
    /// Per-provider failures are isolated and recorded as `status: error`
    /// rows rather than failing the whole batch (§4.5). The returned
    /// vector is sorted by provider identity, independent of completion
    /// order (§4.5 "deterministic in order").
    #[instrument(skip(self, word), fields(word = %word.normalized, providers = selected.len()))]
    pub async fn fetch_all(&self, word: &Word, selected: &[String]) -> Vec<ProviderData> {
        let mut handles = Vec::with_capacity(selected.len());

        for name in selected {
            let Some(provider) = self.providers.get(name.as_str()).cloned() else {
                warn!(provider = %name, "unknown provider requested, skipping");
                continue;
            };
            let cache = Arc::clone(&self.cache);
            let word = word.clone();
            handles.push(tokio::spawn(async move {
                fetch_one(cache.as_ref(), provider.as_ref(), &word).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(data) => results.push(data),
                Err(join_error) => warn!(error = %join_error, "provider fetch task panicked"),
            }
        }

        results.sort_by(|a, b| a.provider.cmp(&b.provider));
        results
    }
}

/// Fetch (or replay from cache) one provider's data for `word`. Network
/// and parse failures never escape as `Err` here — they are folded into an
/// `error`-status `ProviderData` row so the fan-out can't fail the batch
/// for a single provider's sake.
async fn fetch_one(cache: &Cache, provider: &dyn DictionaryProvider, word: &Word) -> ProviderData {
    let key = cache_key(NAMESPACE, &[provider.name(), &word.normalized, &word.language]);

    let cached = cache
        .get_or_build_json(NAMESPACE, &key, Some(PROVIDER_CACHE_TTL), || async {
            provider
                .fetch_raw(word)
                .await
                .map_err(|e| provider_error_to_lex(provider.name(), e))
        })
        .await;

    match cached {
        Ok(data) => data,
        Err(e) => {
            warn!(provider = provider.name(), word = %word.normalized, error = %e, "provider fetch failed");
            error_row(provider.name(), word)
        }
    }
}

fn provider_error_to_lex(provider: &str, error: ProviderError) -> lex_core::LexError {
    lex_core::LexError::Provider(match error {
        ProviderError::RateLimited { retry_after_ms, .. } => ProviderError::RateLimited {
            provider: provider.to_string(),
            retry_after_ms,
        },
        other => other,
    })
}

fn error_row(provider: &str, word: &Word) -> ProviderData {
    ProviderData {
        provider: provider.to_string(),
        word: word.clone(),
        fetched_at: chrono::Utc::now(),
        status: ProviderStatus::Error,
        raw_definitions: Vec::new(),
        etymology: None,
        pronunciation: None,
        raw_metadata: serde_json::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyProvider {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl DictionaryProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn host(&self) -> &'static str {
            "test.invalid"
        }

        async fn fetch_raw(&self, word: &Word) -> Result<ProviderData, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::Transient {
                    provider: self.name.to_string(),
                    status: 503,
                });
            }
            Ok(ProviderData {
                provider: self.name.to_string(),
                word: word.clone(),
                fetched_at: chrono::Utc::now(),
                status: ProviderStatus::Ok,
                raw_definitions: vec![],
                etymology: None,
                pronunciation: None,
                raw_metadata: serde_json::Value::Null,
            })
        }
    }

    fn test_cache() -> (Arc<Cache>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = lex_core::LexConfig::development().cache;
        settings.disk_root = dir.path().to_string_lossy().to_string();
        (Arc::new(Cache::open(&settings).unwrap()), dir)
    }

    #[tokio::test]
    async fn partial_failure_is_isolated_not_fatal() {
        let (cache, _dir) = test_cache();
        let ok_calls = Arc::new(AtomicUsize::new(0));
        let fetcher = ProviderFetcher::new(
            cache,
            vec![
                Arc::new(FlakyProvider { name: "a", calls: Arc::clone(&ok_calls), fail: false }),
                Arc::new(FlakyProvider { name: "b", calls: Arc::new(AtomicUsize::new(0)), fail: true }),
            ],
        );

        let word = Word::new("glarp", "glarp", "en");
        let results = fetcher
            .fetch_all(&word, &["a".to_string(), "b".to_string()])
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].provider, "a");
        assert_eq!(results[0].status, ProviderStatus::Ok);
        assert_eq!(results[1].provider, "b");
        assert_eq!(results[1].status, ProviderStatus::Error);
    }

    #[tokio::test]
    async fn results_are_sorted_by_provider_identity() {
        let (cache, _dir) = test_cache();
        let fetcher = ProviderFetcher::new(
            cache,
            vec![
                Arc::new(FlakyProvider { name: "z_provider", calls: Arc::new(AtomicUsize::new(0)), fail: false }),
                Arc::new(FlakyProvider { name: "a_provider", calls: Arc::new(AtomicUsize::new(0)), fail: false }),
            ],
        );

        let word = Word::new("cogent", "cogent", "en");
        let results = fetcher
            .fetch_all(&word, &["z_provider".to_string(), "a_provider".to_string()])
            .await;

        assert_eq!(results[0].provider, "a_provider");
        assert_eq!(results[1].provider, "z_provider");
    }

    #[tokio::test]
    async fn repeated_fetch_within_ttl_hits_cache_not_network() {
        let (cache, _dir) = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = ProviderFetcher::new(
            cache,
            vec![Arc::new(FlakyProvider { name: "a", calls: Arc::clone(&calls), fail: false })],
        );

        let word = Word::new("cogent", "cogent", "en");
        let _ = fetcher.fetch_all(&word, &["a".to_string()]).await;
        let _ = fetcher.fetch_all(&word, &["a".to_string()]).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
