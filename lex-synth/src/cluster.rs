//! Clustering (§4.7 step 1): group raw definitions into disjoint meaning
//! clusters. Empty or low-confidence clusters are dropped here so
//! downstream stages never see them.

use std::collections::HashMap;

use lex_core::{LexError, LexResult, MeaningCluster, ModelTier, ProviderData, SynthesisError, Word};
use lex_llm::{ChatRequest, LlmClient};
use serde::Deserialize;

/// Clusters with confidence below this bar are dropped (§4.7 "Empty or
/// low-confidence clusters are dropped").
const MIN_CLUSTER_CONFIDENCE: f32 = 0.2;

#[derive(Debug, Deserialize)]
struct ClusterResponse {
    clusters: Vec<ClusterDto>,
}

#[derive(Debug, Deserialize)]
struct ClusterDto {
    id: String,
    label: String,
    description: String,
    confidence: f32,
    member_indices: Vec<usize>,
}

fn cluster_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "clusters": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "label": {"type": "string"},
                        "description": {"type": "string"},
                        "confidence": {"type": "number"},
                        "member_indices": {"type": "array", "items": {"type": "integer"}}
                    },
                    "required": ["id", "label", "description", "confidence", "member_indices"]
                }
            }
        },
        "required": ["clusters"]
    })
}

/// Flatten every provider's raw definitions into one indexed list, in
/// provider order. The returned indices are what the LLM's
/// `member_indices` refer back into, and what the synthesizer later uses
/// to find a cluster's source definitions.
pub fn flatten_raw_definitions(provider_data: &[ProviderData]) -> Vec<lex_core::RawDefinition> {
    provider_data
        .iter()
        .flat_map(|p| p.raw_definitions.iter().cloned())
        .collect()
}

/// Run the clustering LLM call and return disjoint, non-trivial clusters
/// (§4.7 step 1). Clustering failure is fatal to the pipeline (§4.7
/// "Failure semantics") — callers should propagate the error rather than
/// publish a partial entry.
pub async fn cluster_definitions(
    llm: &LlmClient,
    word: &Word,
    flattened: &[lex_core::RawDefinition],
    tier: ModelTier,
) -> LexResult<Vec<MeaningCluster>> {
    if flattened.is_empty() {
        return Ok(Vec::new());
    }

    let raw_text = flattened
        .iter()
        .enumerate()
        .map(|(i, def)| format!("[{i}] ({}) {}", def.part_of_speech.as_deref().unwrap_or("?"), def.text))
        .collect::<Vec<_>>()
        .join("\n");

    let mut vars = HashMap::new();
    vars.insert("word", word.normalized.clone());
    vars.insert("raw_definitions", raw_text);

    let output = llm
        .chat_structured::<ClusterResponse>(ChatRequest {
            template: "cluster_definitions",
            vars,
            tier,
            schema_name: "cluster_response",
            schema: cluster_schema(),
            requested_tokens: (flattened.len() as u32 * 40).max(200),
            cacheable: true,
        })
        .await
        .map_err(|e| LexError::Synthesis(SynthesisError::ClusteringFailed { reason: e.to_string() }))?;

    let valid_indices = 0..flattened.len();
    let clusters = output
        .value
        .clusters
        .into_iter()
        .filter(|c| c.confidence >= MIN_CLUSTER_CONFIDENCE && !c.member_indices.is_empty())
        .map(|c| MeaningCluster {
            id: c.id,
            label: c.label,
            description: c.description,
            confidence: c.confidence,
            member_indices: c
                .member_indices
                .into_iter()
                .filter(|i| valid_indices.contains(i))
                .collect(),
        })
        .filter(|c| !c.member_indices.is_empty())
        .collect();

    Ok(clusters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_core::RawDefinition;

    fn def(text: &str) -> RawDefinition {
        RawDefinition {
            part_of_speech: Some("adjective".to_string()),
            text: text.to_string(),
            examples: vec![],
            synonyms: vec![],
            antonyms: vec![],
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn flatten_preserves_provider_order() {
        let provider_data = vec![
            ProviderData {
                provider: "a".to_string(),
                word: Word::new("cogent", "cogent", "en"),
                fetched_at: chrono::Utc::now(),
                status: lex_core::ProviderStatus::Ok,
                raw_definitions: vec![def("first")],
                etymology: None,
                pronunciation: None,
                raw_metadata: serde_json::Value::Null,
            },
            ProviderData {
                provider: "b".to_string(),
                word: Word::new("cogent", "cogent", "en"),
                fetched_at: chrono::Utc::now(),
                status: lex_core::ProviderStatus::Ok,
                raw_definitions: vec![def("second")],
                etymology: None,
                pronunciation: None,
                raw_metadata: serde_json::Value::Null,
            },
        ];
        let flattened = flatten_raw_definitions(&provider_data);
        assert_eq!(flattened.len(), 2);
        assert_eq!(flattened[0].text, "first");
        assert_eq!(flattened[1].text, "second");
    }

    #[test]
    fn empty_input_short_circuits_without_calling_llm() {
        // exercised indirectly: flatten of no provider data yields no defs,
        // and cluster_definitions returns early on an empty slice.
        assert!(flatten_raw_definitions(&[]).is_empty());
    }
}
