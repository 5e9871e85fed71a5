//! Top-level synthesizer orchestration (§4.7) and write-through (§4.7
//! step 4, §4.1 "Versioned storage").

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use lex_cache::{cache_key, Cache, Versioned};
use lex_core::{
    LexError, LexResult, ModelInfo, ModelTier, ProviderData, ProviderStatus, SynthesizedEntry, SynthesisError,
    VersionInfo, Word,
};
use lex_llm::LlmClient;
use tracing::{instrument, warn};

use crate::cluster::{cluster_definitions, flatten_raw_definitions};
use crate::definitions::synthesize_cluster;
use crate::enhance::{enhance_definition, enhance_word, WordEnhancement};

/// Identifies this synthesis pipeline's behavior for fingerprinting (§3).
/// Bumped whenever a change to clustering/synthesis/enhancement prompts
/// or logic would change output for identical inputs.
pub const PIPELINE_VERSION: &str = "v1";

const ENTRY_NAMESPACE: &str = "synthesized:entry";
const ENTRY_CONTENT_NAMESPACE: &str = "content:synthesized-entry";

/// No TTL on version-specific entries: they are content-addressed by
/// fingerprint, so they never go stale; the "latest" pointer is what
/// changes over time (§4.1 "Version-specific cache entries... are
/// authoritative and need no re-validation").
const LATEST_POINTER_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Invoked at progressive-streaming boundaries (§4.8 "Progressive
/// streaming"): after clustering, and after each definition's
/// enhancement completes. The synthesizer has no opinion on what the
/// callback does with the snapshot — the pipeline wires it to SSE.
pub trait PartialSink: Send + Sync {
    fn emit(&self, partial: &SynthesizedEntry);
}

impl<F: Fn(&SynthesizedEntry) + Send + Sync> PartialSink for F {
    fn emit(&self, partial: &SynthesizedEntry) {
        self(partial)
    }
}

/// Produce a `SynthesizedEntry` from one word's provider data (§4.7).
///
/// Clustering and definition-synthesis failures are fatal: no partial
/// entry is published (§4.7 "Failure semantics"). Enhancement failures
/// are per-component and non-fatal — the entry still publishes with
/// `model_info` recording exactly which components succeeded.
#[instrument(skip(llm, provider_data, on_partial), fields(word = %word.normalized))]
pub async fn synthesize(
    llm: &LlmClient,
    word: &Word,
    provider_data: &[ProviderData],
    tier: ModelTier,
    clustering_model: &str,
    synthesis_model: &str,
    on_partial: Option<&dyn PartialSink>,
) -> LexResult<SynthesizedEntry> {
    let flattened = flatten_raw_definitions(provider_data);
    let clusters = cluster_definitions(llm, word, &flattened, tier).await?;

    if clusters.is_empty() {
        return Err(LexError::Synthesis(SynthesisError::ClusteringFailed {
            reason: "no clusters survived confidence filtering".to_string(),
        }));
    }

    let cluster_futures = clusters
        .iter()
        .map(|cluster| synthesize_cluster(llm, word, cluster, &flattened, tier));
    let cluster_results = join_all(cluster_futures).await;

    let mut definitions = Vec::new();
    for result in cluster_results {
        definitions.extend(result?);
    }

    let mut model_info = ModelInfo {
        clustering_model: Some(clustering_model.to_string()),
        synthesis_model: Some(synthesis_model.to_string()),
        components_succeeded: BTreeSet::new(),
        components_failed: BTreeSet::new(),
    };

    let provider_set = successful_provider_set(provider_data);
    let skeleton = build_entry(word, definitions.clone(), WordEnhancement::default(), &model_info, &provider_set, tier, provider_data);
    if let Some(sink) = on_partial {
        sink.emit(&skeleton);
    }

    let word_enhancement = enhance_word(llm, word, &WordEnhancement::default(), tier, &mut model_info).await;

    // Definitions are enhanced one at a time here because each mutably
    // borrows the shared `model_info`; concurrency happens one level down,
    // across each definition's own components (§5 "concurrent across
    // components").
    for definition in definitions.iter_mut() {
        enhance_definition(llm, word, definition, tier, &mut model_info).await;
        if let Some(sink) = on_partial {
            let snapshot = build_entry(
                word,
                definitions.clone(),
                word_enhancement.clone(),
                &model_info,
                &provider_set,
                tier,
                provider_data,
            );
            sink.emit(&snapshot);
        }
    }

    Ok(build_entry(word, definitions, word_enhancement, &model_info, &provider_set, tier, provider_data))
}

/// The providers whose data the synthesizer actually saw (§7 "the set of
/// successful providers is what the synthesizer sees") — a provider that
/// came back `ProviderStatus::Error` contributed nothing and is excluded,
/// matching `passthrough::build_passthrough_entry`'s own filter.
fn successful_provider_set(provider_data: &[ProviderData]) -> BTreeSet<String> {
    provider_data
        .iter()
        .filter(|p| p.status != ProviderStatus::Error)
        .map(|p| p.provider.clone())
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn build_entry(
    word: &Word,
    definitions: Vec<lex_core::SynthesizedDefinition>,
    word_enhancement: WordEnhancement,
    model_info: &ModelInfo,
    provider_set: &BTreeSet<String>,
    tier: ModelTier,
    provider_data: &[ProviderData],
) -> SynthesizedEntry {
    let raw_content_hashes: Vec<[u8; 32]> = provider_data
        .iter()
        .filter(|p| p.status != ProviderStatus::Error)
        .map(|p| p.content_hash())
        .collect();
    let model_identity = format!(
        "{}/{}/{}",
        tier,
        model_info.clustering_model.as_deref().unwrap_or(""),
        model_info.synthesis_model.as_deref().unwrap_or("")
    );
    let fingerprint =
        SynthesizedEntry::compute_fingerprint(provider_set, &raw_content_hashes, &model_identity, PIPELINE_VERSION);

    SynthesizedEntry {
        id: uuid::Uuid::now_v7().to_string(),
        word: word.clone(),
        definitions,
        pronunciation: word_enhancement.pronunciation,
        etymology: word_enhancement.etymology,
        word_forms: word_enhancement.word_forms,
        facts: word_enhancement.facts,
        model_info: model_info.clone(),
        provider_set: provider_set.clone(),
        fingerprint,
        created_at: Utc::now(),
        version_info: VersionInfo { pipeline_version: PIPELINE_VERSION.to_string(), model_tier: tier.to_string() },
    }
}

fn version_key(word: &Word, tier: ModelTier, fingerprint_hex: &str) -> String {
    cache_key(ENTRY_NAMESPACE, &[&word.normalized, &word.language, &tier.to_string(), fingerprint_hex])
}

fn latest_key(word: &Word, tier: ModelTier) -> String {
    cache_key(ENTRY_NAMESPACE, &["latest", &word.normalized, &word.language, &tier.to_string()])
}

/// Write-through (§4.7 step 4): save the entry under its fingerprint-keyed
/// version slot, then atomically repoint "latest-for-word + model-tier"
/// at it. Both writes go through the same cache instance; the pointer
/// update is a single `put_bytes` call, so there is no window where
/// "latest" can point at a half-written version record.
pub async fn publish(cache: &Arc<Cache>, word: &Word, tier: ModelTier, entry: &SynthesizedEntry) -> LexResult<()> {
    let fingerprint_hex = entry.fingerprint.to_hex();
    let vkey = version_key(word, tier, &fingerprint_hex);

    let versioned = Versioned::store(cache, ENTRY_CONTENT_NAMESPACE, &vkey, Some(LATEST_POINTER_TTL), entry).await?;
    let versioned_bytes = serde_json::to_vec(&versioned)
        .map_err(|e| LexError::Internal(format!("serialize versioned entry record: {e}")))?;
    cache.put_bytes(ENTRY_NAMESPACE, &vkey, &versioned_bytes, Some(LATEST_POINTER_TTL))?;

    let lkey = latest_key(word, tier);
    cache.put_bytes(ENTRY_NAMESPACE, &lkey, vkey.as_bytes(), Some(LATEST_POINTER_TTL))?;

    Ok(())
}

/// Load the latest published entry for `(word, tier)`, if any. Validated
/// against the underlying content store on every read (§4.1
/// "'latest-for-word' entries are validated against the underlying store
/// on each read") — a pointer whose version record has expired or whose
/// external blob went missing is treated as a miss, not an error. In both
/// cases the dangling pointer is deleted rather than left to re-fail
/// validation on every subsequent read (§4.1 "if `content_location` exists
/// but its blob is missing, the cached pointer is deleted and treated as
/// a miss").
pub async fn load_latest(cache: &Cache, word: &Word, tier: ModelTier) -> LexResult<Option<SynthesizedEntry>> {
    let lkey = latest_key(word, tier);
    let Some(vkey_bytes) = cache.get_bytes(ENTRY_NAMESPACE, &lkey)? else {
        return Ok(None);
    };
    let vkey = String::from_utf8(vkey_bytes).map_err(|e| LexError::Internal(format!("corrupt latest pointer: {e}")))?;

    let Some(record_bytes) = cache.get_bytes(ENTRY_NAMESPACE, &vkey)? else {
        invalidate_latest_pointer(cache, word, &lkey);
        return Ok(None);
    };
    let versioned: Versioned<SynthesizedEntry> = match serde_json::from_slice(&record_bytes) {
        Ok(v) => v,
        Err(_) => {
            invalidate_dangling_entry(cache, word, &lkey, &vkey);
            return Ok(None);
        }
    };
    match versioned.load(cache) {
        Ok(entry) => Ok(Some(entry)),
        Err(_) => {
            invalidate_dangling_entry(cache, word, &lkey, &vkey);
            Ok(None)
        }
    }
}

fn invalidate_latest_pointer(cache: &Cache, word: &Word, lkey: &str) {
    if let Err(e) = cache.invalidate(ENTRY_NAMESPACE, lkey) {
        warn!(word = %word.normalized, error = %e, "failed to invalidate dangling latest pointer");
    }
}

fn invalidate_dangling_entry(cache: &Cache, word: &Word, lkey: &str, vkey: &str) {
    invalidate_latest_pointer(cache, word, lkey);
    if let Err(e) = cache.invalidate(ENTRY_NAMESPACE, vkey) {
        warn!(word = %word.normalized, error = %e, "failed to invalidate dangling version record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_core::{LexConfig, ProviderStatus};

    fn test_cache() -> (Arc<Cache>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = LexConfig::development().cache;
        settings.disk_root = dir.path().to_string_lossy().to_string();
        (Arc::new(Cache::open(&settings).unwrap()), dir)
    }

    fn sample_entry(word: &Word, tier: ModelTier) -> SynthesizedEntry {
        SynthesizedEntry {
            id: "e1".to_string(),
            word: word.clone(),
            definitions: vec![],
            pronunciation: None,
            etymology: None,
            word_forms: None,
            facts: None,
            model_info: ModelInfo::default(),
            provider_set: BTreeSet::new(),
            fingerprint: SynthesizedEntry::compute_fingerprint(&BTreeSet::new(), &[], "m", PIPELINE_VERSION),
            created_at: Utc::now(),
            version_info: VersionInfo { pipeline_version: PIPELINE_VERSION.to_string(), model_tier: tier.to_string() },
        }
    }

    #[tokio::test]
    async fn publish_then_load_latest_roundtrips() {
        let (cache, _dir) = test_cache();
        let word = Word::new("cogent", "cogent", "en");
        let entry = sample_entry(&word, ModelTier::Medium);

        publish(&cache, &word, ModelTier::Medium, &entry).await.unwrap();
        let loaded = load_latest(&cache, &word, ModelTier::Medium).await.unwrap();
        assert_eq!(loaded.unwrap().id, "e1");
    }

    #[tokio::test]
    async fn different_model_tiers_have_independent_latest_pointers() {
        let (cache, _dir) = test_cache();
        let word = Word::new("cogent", "cogent", "en");
        let low_entry = sample_entry(&word, ModelTier::Low);

        publish(&cache, &word, ModelTier::Low, &low_entry).await.unwrap();
        let medium = load_latest(&cache, &word, ModelTier::Medium).await.unwrap();
        assert!(medium.is_none());
    }

    #[tokio::test]
    async fn missing_latest_pointer_is_a_clean_miss() {
        let (cache, _dir) = test_cache();
        let word = Word::new("ephemeral", "ephemeral", "en");
        let loaded = load_latest(&cache, &word, ModelTier::Low).await.unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn provider_set_is_independent_of_fetch_order() {
        let word = Word::new("cogent", "cogent", "en");
        let a = ProviderData {
            provider: "wiktionary".to_string(),
            word: word.clone(),
            fetched_at: Utc::now(),
            status: ProviderStatus::Ok,
            raw_definitions: vec![],
            etymology: None,
            pronunciation: None,
            raw_metadata: serde_json::Value::Null,
        };
        let b = ProviderData { provider: "dictionary_api".to_string(), ..a.clone() };
        let set_1: BTreeSet<String> = [a.clone(), b.clone()].iter().map(|p| p.provider.clone()).collect();
        let set_2: BTreeSet<String> = [b, a].iter().map(|p| p.provider.clone()).collect();
        assert_eq!(set_1, set_2);
    }

    fn provider_row(provider: &str, word: &Word, status: ProviderStatus) -> ProviderData {
        ProviderData {
            provider: provider.to_string(),
            word: word.clone(),
            fetched_at: Utc::now(),
            status,
            raw_definitions: vec![],
            etymology: None,
            pronunciation: None,
            raw_metadata: serde_json::Value::Null,
        }
    }

    /// §8 scenario 2: provider B timed out, so `.provider_set` must be
    /// `{A, C}`, not `{A, B, C}`.
    #[test]
    fn successful_provider_set_excludes_error_rows() {
        let word = Word::new("glarp", "glarp", "en");
        let rows = vec![
            provider_row("a", &word, ProviderStatus::Ok),
            provider_row("b", &word, ProviderStatus::Error),
            provider_row("c", &word, ProviderStatus::Ok),
        ];

        let set = successful_provider_set(&rows);
        assert_eq!(set, ["a".to_string(), "c".to_string()].into_iter().collect::<BTreeSet<_>>());
    }

    /// §8 "fingerprint(entry) = fingerprint(re-synthesize(same inputs))" —
    /// a provider flapping between ok and error must not perturb the
    /// fingerprint of an otherwise-identical entry.
    #[test]
    fn fingerprint_is_unaffected_by_an_error_status_providers_content() {
        let word = Word::new("glarp", "glarp", "en");
        let ok_a = provider_row("a", &word, ProviderStatus::Ok);
        let ok_c = provider_row("c", &word, ProviderStatus::Ok);
        let flaky_b = provider_row("b", &word, ProviderStatus::Error);

        let with_flaky_row = vec![ok_a.clone(), flaky_b, ok_c.clone()];
        let without_flaky_row = vec![ok_a, ok_c];

        let model_info = ModelInfo::default();
        let provider_set = successful_provider_set(&with_flaky_row);

        let entry_with = build_entry(&word, vec![], WordEnhancement::default(), &model_info, &provider_set, ModelTier::Low, &with_flaky_row);
        let entry_without = build_entry(&word, vec![], WordEnhancement::default(), &model_info, &provider_set, ModelTier::Low, &without_flaky_row);

        assert_eq!(entry_with.fingerprint, entry_without.fingerprint);
    }

    /// §4.1 "if `content_location` exists but its blob is missing, the
    /// cached pointer is deleted and treated as a miss" — the dangling
    /// `latest` pointer must not survive a `load_latest` call that hits a
    /// missing external blob.
    #[tokio::test]
    async fn load_latest_deletes_dangling_pointer_on_missing_blob() {
        let (cache, _dir) = test_cache();
        let word = Word::new("cogent", "cogent", "en");
        let mut entry = sample_entry(&word, ModelTier::Medium);
        // Force external placement so the version record holds a
        // `content_location` whose blob we can make vanish.
        entry.definitions = (0..100)
            .map(|i| lex_core::SynthesizedDefinition {
                id: format!("d{i}"),
                word: word.clone(),
                cluster_ref: "c".to_string(),
                part_of_speech: "noun".to_string(),
                text: "x".repeat(64),
                relevancy: 1.0,
                examples: lex_core::Examples { generated: vec![], literature: vec![] },
                synonyms: vec![],
                antonyms: None,
                cefr_level: None,
                register: None,
                domain: None,
                frequency_band: None,
                regional_variants: None,
                collocations: None,
                usage_notes: None,
            })
            .collect();

        publish(&cache, &word, ModelTier::Medium, &entry).await.unwrap();
        assert!(load_latest(&cache, &word, ModelTier::Medium).await.unwrap().is_some());

        // Simulate the external blob going missing (e.g. TTL eviction).
        let fingerprint_hex = entry.fingerprint.to_hex();
        let content_key = version_key(&word, ModelTier::Medium, &fingerprint_hex);
        cache.invalidate(ENTRY_CONTENT_NAMESPACE, &content_key).unwrap();

        let loaded = load_latest(&cache, &word, ModelTier::Medium).await.unwrap();
        assert!(loaded.is_none());

        // The dangling pointer must be gone, not merely bypassed: a raw
        // read of the `latest` key returns nothing.
        let lkey = latest_key(&word, ModelTier::Medium);
        assert_eq!(cache.get_bytes(ENTRY_NAMESPACE, &lkey).unwrap(), None);
    }
}
