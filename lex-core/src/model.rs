//! Word-lookup data model (spec §3).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{ContentHash, Fingerprint, Timestamp};

/// `{ text, normalized, language }`. Words are immutable once created; the
/// store is keyed by `(normalized, language)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Word {
    pub text: String,
    pub normalized: String,
    pub language: String,
}

impl Word {
    pub fn new(text: impl Into<String>, normalized: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            normalized: normalized.into(),
            language: language.into(),
        }
    }

    /// The `(normalized, language)` store key.
    pub fn store_key(&self) -> (String, String) {
        (self.normalized.clone(), self.language.clone())
    }
}

/// Per-provider fetch outcome (§3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ProviderStatus {
    Ok,
    Partial,
    Error,
}

/// A provider-specific observation; never merged between providers at this
/// layer (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RawDefinition {
    pub part_of_speech: Option<String>,
    pub text: String,
    pub examples: Vec<String>,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
    pub metadata: serde_json::Value,
}

impl RawDefinition {
    /// Content hash used for fingerprinting and for comparing identical
    /// inputs across fetches (§3 "compared by content hash").
    pub fn content_hash(&self) -> ContentHash {
        let canonical = serde_json::json!({
            "part_of_speech": self.part_of_speech,
            "text": self.text,
            "examples": self.examples,
            "synonyms": self.synonyms,
            "antonyms": self.antonyms,
        });
        crate::compute_content_hash(canonical.to_string().as_bytes())
    }
}

/// One provider's raw response for a word (§3, §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProviderData {
    pub provider: String,
    pub word: Word,
    pub fetched_at: Timestamp,
    pub status: ProviderStatus,
    pub raw_definitions: Vec<RawDefinition>,
    pub etymology: Option<String>,
    pub pronunciation: Option<String>,
    pub raw_metadata: serde_json::Value,
}

impl ProviderData {
    /// Combined content hash over all raw definitions plus etymology and
    /// pronunciation, used as one of the fingerprint inputs (§3).
    pub fn content_hash(&self) -> ContentHash {
        let mut parts: Vec<u8> = Vec::new();
        for def in &self.raw_definitions {
            parts.extend_from_slice(&def.content_hash());
        }
        if let Some(etymology) = &self.etymology {
            parts.extend_from_slice(etymology.as_bytes());
        }
        if let Some(pronunciation) = &self.pronunciation {
            parts.extend_from_slice(pronunciation.as_bytes());
        }
        crate::compute_content_hash(&parts)
    }
}

/// Groups `RawDefinition`s whose senses match; clusters within one word are
/// pairwise disjoint over definitions (§3, §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MeaningCluster {
    pub id: String,
    pub label: String,
    pub description: String,
    pub confidence: f32,
    /// Indices into the flattened `RawDefinition` list this cluster was
    /// built from. Used by the synthesizer to look up which raw
    /// definitions feed a given `SynthesizedDefinition`.
    pub member_indices: Vec<usize>,
}

/// Generated vs. literature examples for a synthesized definition (§3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Examples {
    pub generated: Vec<String>,
    pub literature: Vec<String>,
}

/// One sense of a word, synthesized from one cluster's raw definitions
/// (§3, §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SynthesizedDefinition {
    pub id: String,
    pub word: Word,
    pub cluster_ref: String,
    pub part_of_speech: String,
    pub text: String,
    /// Orders senses within a cluster; higher is more relevant.
    pub relevancy: f32,
    pub examples: Examples,
    pub synonyms: Vec<String>,
    pub antonyms: Option<Vec<String>>,
    pub cefr_level: Option<String>,
    pub register: Option<String>,
    pub domain: Option<String>,
    pub frequency_band: Option<String>,
    pub regional_variants: Option<Vec<String>>,
    pub collocations: Option<Vec<String>>,
    pub usage_notes: Option<String>,
}

impl SynthesizedDefinition {
    /// The enhancement component names whose fields are still unset on
    /// this definition. Used by the synthesizer to know what enhancement
    /// work remains and by `model_info.components_succeeded` bookkeeping.
    pub fn missing_definition_components(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.synonyms.is_empty() {
            missing.push("synonyms");
        }
        if self.antonyms.is_none() {
            missing.push("antonyms");
        }
        if self.examples.generated.is_empty() && self.examples.literature.is_empty() {
            missing.push("examples");
        }
        if self.cefr_level.is_none() {
            missing.push("cefr_level");
        }
        if self.register.is_none() {
            missing.push("register");
        }
        if self.domain.is_none() {
            missing.push("domain");
        }
        if self.frequency_band.is_none() {
            missing.push("frequency_band");
        }
        if self.collocations.is_none() {
            missing.push("collocations");
        }
        if self.usage_notes.is_none() {
            missing.push("usage_notes");
        }
        missing
    }
}

/// Which model served which part of an entry, and which enhancement
/// components actually succeeded (§3, §4.7 failure semantics).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ModelInfo {
    pub clustering_model: Option<String>,
    pub synthesis_model: Option<String>,
    pub components_succeeded: BTreeSet<String>,
    pub components_failed: BTreeSet<String>,
}

/// Lineage metadata for a `SynthesizedEntry` version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct VersionInfo {
    pub pipeline_version: String,
    pub model_tier: String,
}

/// The synthesized output of a lookup (§3). Exactly one "latest" entry per
/// `(word, model_tier)`; prior versions retained for cache coherency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SynthesizedEntry {
    pub id: String,
    pub word: Word,
    pub definitions: Vec<SynthesizedDefinition>,
    pub pronunciation: Option<String>,
    pub etymology: Option<String>,
    pub word_forms: Option<Vec<String>>,
    pub facts: Option<Vec<String>>,
    pub model_info: ModelInfo,
    pub provider_set: BTreeSet<String>,
    pub fingerprint: Fingerprint,
    pub created_at: Timestamp,
    pub version_info: VersionInfo,
}

impl SynthesizedEntry {
    /// Compute the fingerprint per §3's invariant:
    /// `H(provider_set, raw_content_hashes, model_info.identity, pipeline_version)`.
    ///
    /// `provider_set` is sorted before hashing so that fingerprint equality
    /// does not depend on fetch arrival order (§4.5 "deterministic order").
    pub fn compute_fingerprint(
        provider_set: &BTreeSet<String>,
        raw_content_hashes: &[ContentHash],
        model_identity: &str,
        pipeline_version: &str,
    ) -> Fingerprint {
        let mut parts: Vec<Vec<u8>> = Vec::new();
        for provider in provider_set {
            parts.push(provider.as_bytes().to_vec());
        }
        for hash in raw_content_hashes {
            parts.push(hash.to_vec());
        }
        parts.push(model_identity.as_bytes().to_vec());
        parts.push(pipeline_version.as_bytes().to_vec());
        Fingerprint::compute(parts.iter().map(|p| p.as_slice()))
    }

    /// Serialized size in bytes, used to decide inline vs. chunked SSE
    /// delivery (§6, 32 KiB threshold) and inline vs. external cache
    /// placement (§4.1, 16 KiB threshold).
    pub fn serialized_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_order_independent_over_provider_set() {
        let mut a = BTreeSet::new();
        a.insert("wiktionary".to_string());
        a.insert("dictionary_api".to_string());
        let mut b = BTreeSet::new();
        b.insert("dictionary_api".to_string());
        b.insert("wiktionary".to_string());

        let fp_a = SynthesizedEntry::compute_fingerprint(&a, &[], "gpt-5", "v1");
        let fp_b = SynthesizedEntry::compute_fingerprint(&b, &[], "gpt-5", "v1");
        assert_eq!(fp_a, fp_b);
    }

    #[test]
    fn fingerprint_changes_with_model_identity() {
        let set = BTreeSet::new();
        let fp_a = SynthesizedEntry::compute_fingerprint(&set, &[], "gpt-5", "v1");
        let fp_b = SynthesizedEntry::compute_fingerprint(&set, &[], "gpt-5-high", "v1");
        assert_ne!(fp_a, fp_b);
    }

    #[test]
    fn missing_components_reflects_unset_fields() {
        let def = SynthesizedDefinition {
            id: "d1".into(),
            word: Word::new("cogent", "cogent", "en"),
            cluster_ref: "c1".into(),
            part_of_speech: "adjective".into(),
            text: "Compelling and convincing.".into(),
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
        };
        let missing = def.missing_definition_components();
        assert!(missing.contains(&"synonyms"));
        assert!(missing.contains(&"examples"));
    }
}
