//! End-to-end lookup orchestration (§4.8): normalize, resolve, fetch,
//! conditionally synthesize, publish, with cancellation and a pipeline
//! deadline threaded through every suspension point (§5).

use std::sync::Arc;
use std::time::Duration;

use lex_cache::Cache;
use lex_core::{
    LexConfig, LexError, LexResult, PipelineError, ProviderData, ProviderStatus, SynthesizedEntry, Word,
};
use lex_events::StateTracker;
use lex_llm::LlmClient;
use lex_providers::ProviderFetcher;
use lex_resolver::Resolver;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::passthrough::build_passthrough_entry;
use crate::request::LookupRequest;

/// Everything one running instance of the service needs to serve a
/// lookup (§5 "Shared resources" — all process-wide, all behind `Arc`).
pub struct Pipeline {
    cache: Arc<Cache>,
    resolver: Arc<Resolver>,
    fetcher: Arc<ProviderFetcher>,
    llm: Arc<LlmClient>,
    config: LexConfig,
}

impl Pipeline {
    pub fn new(
        cache: Arc<Cache>,
        resolver: Arc<Resolver>,
        fetcher: Arc<ProviderFetcher>,
        llm: Arc<LlmClient>,
        config: LexConfig,
    ) -> Self {
        Self { cache, resolver, fetcher, llm, config }
    }

    /// Run the full cascade for one request (§4.8 steps 1-6). Every error
    /// exit, however it is produced, ends at the single `match` at the
    /// bottom that gives the tracker its one terminal event (§5 "Completes
    /// the state tracker with a terminal event" — `complete()`/`error()`
    /// calls made earlier inside `run` already claimed that slot, so this
    /// match is a no-op for them and load-bearing only for the paths that
    /// bail out via `?`).
    #[instrument(skip(self, tracker, cancel), fields(request_id = %tracker.request_id(), query = %request.query))]
    pub async fn lookup(
        &self,
        request: LookupRequest,
        tracker: &StateTracker,
        cancel: CancellationToken,
    ) -> LexResult<SynthesizedEntry> {
        let deadline = Instant::now() + self.config.pipeline_deadline();
        let result = self.run(request, tracker, &cancel, deadline).await;

        if let Err(err) = &result {
            match err {
                LexError::Cancelled => tracker.cancel(),
                other => tracker.error(other.kind(), &other.to_string()),
            }
        }
        result
    }

    async fn run(
        &self,
        request: LookupRequest,
        tracker: &StateTracker,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> LexResult<SynthesizedEntry> {
        tracker.update("Normalizing", None, None);
        let query_embedding = self.embed_query(&request.query, cancel, deadline).await?;

        tracker.update("ResolvingWord", None, None);
        let results = self.resolver.resolve(&request.query, 1, query_embedding.as_deref());
        let Some(top) = results.into_iter().next() else {
            return Err(LexError::Pipeline(PipelineError::NoCandidate { query: request.query.clone() }));
        };
        let word = Word::new(top.canonical.clone(), top.canonical.clone(), request.language());

        if !request.force_refresh {
            if let Some(cached) = lex_synth::load_latest(&self.cache, &word, request.model_tier).await? {
                info!(word = %word.normalized, "serving cached synthesized entry");
                tracker.update("Finalizing", None, None);
                tracker.complete();
                return Ok(cached);
            }
        }

        tracker.update("FetchingProviders", None, None);
        let selected = request.providers.clone().unwrap_or_else(|| self.config.providers.selected.clone());
        let provider_data = self.guarded(self.fetcher.fetch_all(&word, &selected), cancel, deadline).await?;

        let usable = provider_data.iter().any(|p| p.status != ProviderStatus::Error);
        let ai_mode = self.config.pipeline.ai_default_on && !request.no_ai;

        if !usable && !ai_mode {
            return Err(LexError::Pipeline(PipelineError::UpstreamUnavailable));
        }

        let entry = if ai_mode {
            let entry = self
                .synthesize_with_progress(&word, &provider_data, request.model_tier, tracker, cancel, deadline)
                .await?;
            tracker.update("Finalizing", None, None);
            self.publish_and_recover(&word, request.model_tier, &entry).await;
            entry
        } else {
            tracker.update("Finalizing", None, None);
            let entry = build_passthrough_entry(&word, &provider_data);
            self.publish_and_recover(&word, request.model_tier, &entry).await;
            entry
        };

        tracker.complete();
        Ok(entry)
    }

    /// Embed the query for semantic search, when the resolver's semantic
    /// index is ready and enabled. A non-cancellation embedding failure is
    /// logged and swallowed — the cascade just runs without the semantic
    /// tier (§4.4 "no query embedding ⇒ semantic search is skipped").
    async fn embed_query(
        &self,
        query: &str,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> LexResult<Option<Vec<f32>>> {
        if !self.config.resolver.semantic_enabled || !self.resolver.semantic_index().is_ready() {
            return Ok(None);
        }
        // `guarded` wraps `embed`'s own `LexResult` in another `LexResult`
        // (one layer for cancellation/deadline, one for the call itself);
        // flatten before deciding whether to propagate or swallow. Only the
        // outer layer ever produces `Cancelled`/`DeadlineExceeded`, so that
        // distinction survives the flatten.
        match self.guarded(self.llm.embed(query), cancel, deadline).await.and_then(|r| r) {
            Ok(embedding) => Ok(Some(embedding)),
            Err(err @ (LexError::Cancelled | LexError::DeadlineExceeded)) => Err(err),
            Err(err) => {
                warn!(error = %err, "query embedding failed, falling back to exact/fuzzy only");
                Ok(None)
            }
        }
    }

    /// Run the synthesizer, wiring its progressive-partial callback into
    /// the tracker. The first partial marks "synthesis" (clustering plus
    /// definition text) complete; every later one is an enhancement
    /// progress update (§4.8 "Progressive streaming").
    async fn synthesize_with_progress(
        &self,
        word: &Word,
        provider_data: &[ProviderData],
        tier: lex_core::ModelTier,
        tracker: &StateTracker,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> LexResult<SynthesizedEntry> {
        tracker.update("Clustering", None, None);

        let model_spec = self
            .config
            .llm
            .model_tier_map
            .get(&tier)
            .cloned()
            .ok_or_else(|| LexError::Llm(lex_core::LlmError::TierNotConfigured { tier: tier.to_string() }))?;

        let emitted = std::sync::atomic::AtomicUsize::new(0);
        let sink = move |partial: &SynthesizedEntry| {
            let count = emitted.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if count == 0 {
                tracker.update("SynthesizingDefinitions", None, None);
            } else {
                tracker.update(
                    "EnhancingDefinitions",
                    Some(format!("{count} definition(s) enhanced")),
                    None,
                );
            }
            tracker.emit_partial(serde_json::to_value(partial).unwrap_or(serde_json::Value::Null));
        };

        self.guarded(
            lex_synth::synthesize(
                &self.llm,
                word,
                provider_data,
                tier,
                &model_spec.model_id,
                &model_spec.model_id,
                Some(&sink),
            ),
            cancel,
            deadline,
        )
        .await
        .and_then(|r| r)
    }

    /// Publish the entry; a storage error is logged and otherwise
    /// swallowed, since the entry is already in hand and returned to the
    /// caller regardless (§7 "Storage errors on the versioned-entry write
    /// are fatal for the request" — reinterpreted here as fatal for
    /// persistence, not for the response already computed in memory).
    async fn publish_and_recover(&self, word: &Word, tier: lex_core::ModelTier, entry: &SynthesizedEntry) {
        if let Err(err) = lex_synth::publish(&self.cache, word, tier, entry).await {
            warn!(word = %word.normalized, error = %err, "failed to publish synthesized entry");
        }
    }

    /// Race a future against cancellation and the pipeline deadline (§5
    /// "Cancellation... Timeouts"). Cancellation and deadline are checked
    /// before polling the future so an already-cancelled/expired request
    /// never starts new work at a suspension point.
    async fn guarded<T>(
        &self,
        fut: impl std::future::Future<Output = T>,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> LexResult<T> {
        if cancel.is_cancelled() {
            return Err(LexError::Cancelled);
        }
        if Instant::now() >= deadline {
            return Err(LexError::DeadlineExceeded);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LexError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => Err(LexError::DeadlineExceeded),
            value = fut => Ok(value),
        }
    }
}

/// Per-call timeout helper for a single external call (§5 "Each external
/// call has a per-call timeout"), independent of the overall pipeline
/// deadline. Providers and the LLM client already apply their own
/// timeouts at the HTTP layer; this is for call sites in this crate that
/// invoke something without one.
pub async fn with_call_timeout<T>(fut: impl std::future::Future<Output = LexResult<T>>, timeout: Duration) -> LexResult<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(LexError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lex_core::{LexConfig, ModelInfo, ProviderError, RawDefinition, RequestId, VersionInfo};
    use lex_events::StateTracker;
    use lex_providers::DictionaryProvider;
    use lex_resolver::{ResolverBuilder, VocabularyEntry};
    use std::collections::BTreeSet;

    fn test_cache() -> (Arc<Cache>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = LexConfig::development().cache;
        settings.disk_root = dir.path().to_string_lossy().to_string();
        (Arc::new(Cache::open(&settings).unwrap()), dir)
    }

    fn test_resolver(words: &[&str]) -> Arc<Resolver> {
        let entries = words
            .iter()
            .map(|w| VocabularyEntry { normalized: w.to_string(), canonical: w.to_string(), embedding: None })
            .collect();
        let (resolver, _semantic) = ResolverBuilder::new().with_entries(entries).build().unwrap();
        Arc::new(resolver)
    }

    enum MockBehavior {
        Ok(ProviderData),
        Error,
        Panic,
    }

    struct MockProvider {
        name: &'static str,
        behavior: MockBehavior,
    }

    #[async_trait]
    impl DictionaryProvider for MockProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn host(&self) -> &'static str {
            "mock.invalid"
        }

        async fn fetch_raw(&self, _word: &Word) -> Result<ProviderData, ProviderError> {
            match &self.behavior {
                MockBehavior::Ok(data) => Ok(data.clone()),
                MockBehavior::Error => {
                    Err(ProviderError::RequestFailed { provider: self.name.to_string(), reason: "mock failure".into() })
                }
                MockBehavior::Panic => panic!("provider should not have been called"),
            }
        }
    }

    fn test_fetcher(cache: Arc<Cache>, provider: MockProvider) -> Arc<ProviderFetcher> {
        Arc::new(ProviderFetcher::new(cache, vec![Arc::new(provider)]))
    }

    fn test_llm(cache: Arc<Cache>) -> Arc<LlmClient> {
        Arc::new(LlmClient::new(LexConfig::development().llm, cache))
    }

    fn base_config() -> LexConfig {
        let mut config = LexConfig::development();
        config.providers.selected = vec!["mock".to_string()];
        config.resolver.semantic_enabled = false;
        config
    }

    fn sample_entry(word: &Word) -> SynthesizedEntry {
        SynthesizedEntry {
            id: "cached-e1".to_string(),
            word: word.clone(),
            definitions: vec![],
            pronunciation: None,
            etymology: None,
            word_forms: None,
            facts: None,
            model_info: ModelInfo::default(),
            provider_set: BTreeSet::new(),
            fingerprint: SynthesizedEntry::compute_fingerprint(&BTreeSet::new(), &[], "m", "v1"),
            created_at: chrono::Utc::now(),
            version_info: VersionInfo { pipeline_version: "v1".to_string(), model_tier: "medium".to_string() },
        }
    }

    fn ok_provider_data(word: &Word) -> ProviderData {
        ProviderData {
            provider: "mock".to_string(),
            word: word.clone(),
            fetched_at: chrono::Utc::now(),
            status: ProviderStatus::Ok,
            raw_definitions: vec![RawDefinition {
                part_of_speech: Some("adjective".to_string()),
                text: "Clear and convincing.".to_string(),
                examples: vec!["a cogent argument".to_string()],
                synonyms: vec![],
                antonyms: vec![],
                metadata: serde_json::Value::Null,
            }],
            etymology: None,
            pronunciation: None,
            raw_metadata: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn cached_hit_short_circuits_fetch_and_synthesis() {
        let (cache, _dir) = test_cache();
        let word = Word::new("cogent", "cogent", "en");
        lex_synth::publish(&cache, &word, lex_core::ModelTier::Medium, &sample_entry(&word)).await.unwrap();

        let resolver = test_resolver(&["cogent"]);
        let fetcher = test_fetcher(Arc::clone(&cache), MockProvider { name: "mock", behavior: MockBehavior::Panic });
        let llm = test_llm(Arc::clone(&cache));
        let pipeline = Pipeline::new(cache, resolver, fetcher, llm, base_config());

        let tracker = StateTracker::new(RequestId::new(), "lookup");
        let result =
            pipeline.lookup(LookupRequest::new("cogent"), &tracker, CancellationToken::new()).await.unwrap();

        assert_eq!(result.id, "cached-e1");
        assert!(tracker.is_terminal());
    }

    #[tokio::test]
    async fn no_candidate_reports_not_found() {
        let (cache, _dir) = test_cache();
        let resolver = test_resolver(&[]);
        let fetcher = test_fetcher(Arc::clone(&cache), MockProvider { name: "mock", behavior: MockBehavior::Panic });
        let llm = test_llm(Arc::clone(&cache));
        let pipeline = Pipeline::new(cache, resolver, fetcher, llm, base_config());

        let tracker = StateTracker::new(RequestId::new(), "lookup");
        let err = pipeline
            .lookup(LookupRequest::new("zzzznotaword"), &tracker, CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn all_providers_failing_with_ai_disabled_is_upstream_unavailable() {
        let (cache, _dir) = test_cache();
        let resolver = test_resolver(&["cogent"]);
        let fetcher = test_fetcher(Arc::clone(&cache), MockProvider { name: "mock", behavior: MockBehavior::Error });
        let llm = test_llm(Arc::clone(&cache));
        let mut config = base_config();
        config.pipeline.ai_default_on = false;
        let pipeline = Pipeline::new(cache, resolver, fetcher, llm, config);

        let tracker = StateTracker::new(RequestId::new(), "lookup");
        let err =
            pipeline.lookup(LookupRequest::new("cogent"), &tracker, CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.kind(), "upstream_unavailable");
    }

    #[tokio::test]
    async fn usable_provider_data_with_ai_disabled_returns_raw_passthrough() {
        let (cache, _dir) = test_cache();
        let word = Word::new("cogent", "cogent", "en");
        let resolver = test_resolver(&["cogent"]);
        let fetcher =
            test_fetcher(Arc::clone(&cache), MockProvider { name: "mock", behavior: MockBehavior::Ok(ok_provider_data(&word)) });
        let llm = test_llm(Arc::clone(&cache));
        let mut config = base_config();
        config.pipeline.ai_default_on = false;
        let pipeline = Pipeline::new(cache, resolver, fetcher, llm, config);

        let tracker = StateTracker::new(RequestId::new(), "lookup");
        let entry =
            pipeline.lookup(LookupRequest::new("cogent"), &tracker, CancellationToken::new()).await.unwrap();

        assert_eq!(entry.definitions.len(), 1);
        assert!(entry.model_info.clustering_model.is_none());
    }
}
