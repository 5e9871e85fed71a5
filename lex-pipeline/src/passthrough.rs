//! Raw pass-through entries (§4.8 step 4: "otherwise return a raw
//! pass-through response built from provider data alone"), used when
//! providers returned usable data but AI synthesis is disabled.

use std::collections::BTreeSet;

use chrono::Utc;
use lex_core::{
    Examples, ModelInfo, ProviderData, ProviderStatus, SynthesizedDefinition, SynthesizedEntry, VersionInfo, Word,
};

/// Identifies the pass-through (non-AI) path for fingerprinting, distinct
/// from any `lex_synth::PIPELINE_VERSION` so a later AI run on the same
/// provider data never collides with a cached raw entry.
const PASSTHROUGH_PIPELINE_VERSION: &str = "raw-v1";

/// Build a `SynthesizedEntry` directly from provider raw definitions, with
/// one `SynthesizedDefinition` per raw definition and no enhancement
/// fields populated. `cluster_ref` is `"raw"` since no clustering ran.
pub fn build_passthrough_entry(word: &Word, provider_data: &[ProviderData]) -> SynthesizedEntry {
    let mut definitions = Vec::new();
    for data in provider_data {
        if data.status == ProviderStatus::Error {
            continue;
        }
        for raw in &data.raw_definitions {
            definitions.push(SynthesizedDefinition {
                id: uuid::Uuid::now_v7().to_string(),
                word: word.clone(),
                cluster_ref: "raw".to_string(),
                part_of_speech: raw.part_of_speech.clone().unwrap_or_default(),
                text: raw.text.clone(),
                relevancy: 1.0,
                examples: Examples { generated: Vec::new(), literature: raw.examples.clone() },
                synonyms: raw.synonyms.clone(),
                antonyms: if raw.antonyms.is_empty() { None } else { Some(raw.antonyms.clone()) },
                cefr_level: None,
                register: None,
                domain: None,
                frequency_band: None,
                regional_variants: None,
                collocations: None,
                usage_notes: None,
            });
        }
    }

    let provider_set: BTreeSet<String> = provider_data
        .iter()
        .filter(|p| p.status != ProviderStatus::Error)
        .map(|p| p.provider.clone())
        .collect();
    let raw_content_hashes: Vec<[u8; 32]> = provider_data.iter().map(|p| p.content_hash()).collect();
    let fingerprint = SynthesizedEntry::compute_fingerprint(
        &provider_set,
        &raw_content_hashes,
        "none",
        PASSTHROUGH_PIPELINE_VERSION,
    );

    SynthesizedEntry {
        id: uuid::Uuid::now_v7().to_string(),
        word: word.clone(),
        definitions,
        pronunciation: provider_data.iter().find_map(|p| p.pronunciation.clone()),
        etymology: provider_data.iter().find_map(|p| p.etymology.clone()),
        word_forms: None,
        facts: None,
        model_info: ModelInfo::default(),
        provider_set,
        fingerprint,
        created_at: Utc::now(),
        version_info: VersionInfo {
            pipeline_version: PASSTHROUGH_PIPELINE_VERSION.to_string(),
            model_tier: "none".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_core::RawDefinition;

    fn sample_provider_data(word: &Word) -> ProviderData {
        ProviderData {
            provider: "dictionary_api".to_string(),
            word: word.clone(),
            fetched_at: Utc::now(),
            status: ProviderStatus::Ok,
            raw_definitions: vec![RawDefinition {
                part_of_speech: Some("adjective".to_string()),
                text: "Clear and convincing.".to_string(),
                examples: vec!["a cogent argument".to_string()],
                synonyms: vec!["compelling".to_string()],
                antonyms: vec![],
                metadata: serde_json::Value::Null,
            }],
            etymology: Some("Latin cogere".to_string()),
            pronunciation: Some("/ˈkoʊdʒənt/".to_string()),
            raw_metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn builds_one_definition_per_raw_definition() {
        let word = Word::new("cogent", "cogent", "en");
        let entry = build_passthrough_entry(&word, &[sample_provider_data(&word)]);
        assert_eq!(entry.definitions.len(), 1);
        assert_eq!(entry.definitions[0].text, "Clear and convincing.");
        assert_eq!(entry.definitions[0].cluster_ref, "raw");
        assert!(entry.definitions[0].cefr_level.is_none());
    }

    #[test]
    fn error_status_providers_contribute_no_definitions() {
        let word = Word::new("cogent", "cogent", "en");
        let mut errored = sample_provider_data(&word);
        errored.status = ProviderStatus::Error;
        errored.raw_definitions.clear();
        let entry = build_passthrough_entry(&word, &[errored]);
        assert!(entry.definitions.is_empty());
        assert!(entry.provider_set.is_empty());
    }
}
