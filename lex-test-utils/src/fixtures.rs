//! Sample data-model values, built the way the pipeline itself builds
//! them, so crate test suites don't each hand-roll a `SynthesizedEntry`
//! literal with slightly different invariants.

use std::collections::BTreeSet;

use chrono::Utc;
use lex_core::{
    Examples, ModelInfo, ProviderData, ProviderStatus, RawDefinition, SynthesizedDefinition,
    SynthesizedEntry, VersionInfo, Word,
};

/// A `Word` for the stock test vocabulary (`"cogent"`, `"ephemeral"`, ...).
pub fn word(text: &str) -> Word {
    Word::new(text, text, "en")
}

/// One plausible raw definition, as a provider would return it.
pub fn raw_definition(part_of_speech: &str, text: &str) -> RawDefinition {
    RawDefinition {
        part_of_speech: Some(part_of_speech.to_string()),
        text: text.to_string(),
        examples: vec![format!("an example of {text}")],
        synonyms: vec![],
        antonyms: vec![],
        metadata: serde_json::Value::Null,
    }
}

/// A single successful provider response for `word`.
pub fn provider_data(provider: &str, w: &Word, definitions: Vec<RawDefinition>) -> ProviderData {
    ProviderData {
        provider: provider.to_string(),
        word: w.clone(),
        fetched_at: Utc::now(),
        status: ProviderStatus::Ok,
        raw_definitions: definitions,
        etymology: None,
        pronunciation: None,
        raw_metadata: serde_json::Value::Null,
    }
}

/// A failed provider response, as the fetcher records it for an isolated
/// per-provider failure (§4.5).
pub fn provider_error(provider: &str, w: &Word) -> ProviderData {
    ProviderData {
        provider: provider.to_string(),
        word: w.clone(),
        fetched_at: Utc::now(),
        status: ProviderStatus::Error,
        raw_definitions: vec![],
        etymology: None,
        pronunciation: None,
        raw_metadata: serde_json::Value::Null,
    }
}

/// A minimal, already-enhanced `SynthesizedDefinition` for fixtures that
/// need one without going through the synthesizer.
pub fn synthesized_definition(w: &Word, cluster_ref: &str, text: &str) -> SynthesizedDefinition {
    SynthesizedDefinition {
        id: uuid::Uuid::now_v7().to_string(),
        word: w.clone(),
        cluster_ref: cluster_ref.to_string(),
        part_of_speech: "adjective".to_string(),
        text: text.to_string(),
        relevancy: 1.0,
        examples: Examples::default(),
        synonyms: vec![],
        antonyms: None,
        cefr_level: None,
        register: None,
        domain: None,
        frequency_band: None,
        regional_variants: None,
        collocations: None,
        usage_notes: None,
    }
}

/// A complete, ready-to-publish `SynthesizedEntry`, suitable for
/// pre-seeding a cache in tests that exercise the "already cached" path
/// without running the synthesizer.
pub fn synthesized_entry(w: &Word, id: &str) -> SynthesizedEntry {
    let provider_set: BTreeSet<String> = ["wiktionary".to_string()].into_iter().collect();
    let fingerprint = SynthesizedEntry::compute_fingerprint(&provider_set, &[], "gpt-5", "v1");
    SynthesizedEntry {
        id: id.to_string(),
        word: w.clone(),
        definitions: vec![synthesized_definition(w, "c1", "A sample definition.")],
        pronunciation: None,
        etymology: None,
        word_forms: None,
        facts: None,
        model_info: ModelInfo::default(),
        provider_set,
        fingerprint,
        created_at: Utc::now(),
        version_info: VersionInfo { pipeline_version: "v1".to_string(), model_tier: "medium".to_string() },
    }
}
