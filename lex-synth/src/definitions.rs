//! Per-cluster definition synthesis (§4.7 step 2): one LLM call per
//! meaning cluster, producing one or more `SynthesizedDefinition`s with
//! semantic duplicates already merged by the model.

use std::collections::HashMap;

use lex_core::{
    Examples, LexError, LexResult, MeaningCluster, ModelTier, RawDefinition, SynthesisError,
    SynthesizedDefinition, Word,
};
use lex_llm::{ChatRequest, LlmClient};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct DefinitionsResponse {
    definitions: Vec<DefinitionDto>,
}

#[derive(Debug, Deserialize)]
struct DefinitionDto {
    part_of_speech: String,
    text: String,
    relevancy: f32,
}

fn definitions_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "definitions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "part_of_speech": {"type": "string"},
                        "text": {"type": "string"},
                        "relevancy": {"type": "number"}
                    },
                    "required": ["part_of_speech", "text", "relevancy"]
                }
            }
        },
        "required": ["definitions"]
    })
}

/// Synthesize definitions for one cluster (§4.7 step 2). Each returned
/// `SynthesizedDefinition` carries `cluster_ref` set to `cluster.id` and a
/// freshly minted, globally unique `id`.
pub async fn synthesize_cluster(
    llm: &LlmClient,
    word: &Word,
    cluster: &MeaningCluster,
    flattened: &[RawDefinition],
    tier: ModelTier,
) -> LexResult<Vec<SynthesizedDefinition>> {
    let raw_text = cluster
        .member_indices
        .iter()
        .filter_map(|&i| flattened.get(i))
        .map(|def| format!("- ({}) {}", def.part_of_speech.as_deref().unwrap_or("?"), def.text))
        .collect::<Vec<_>>()
        .join("\n");

    let mut vars = HashMap::new();
    vars.insert("word", word.normalized.clone());
    vars.insert("cluster_label", cluster.label.clone());
    vars.insert("raw_definitions", raw_text);

    let output = llm
        .chat_structured::<DefinitionsResponse>(ChatRequest {
            template: "synthesize_definition",
            vars,
            tier,
            schema_name: "definitions_response",
            schema: definitions_schema(),
            requested_tokens: (cluster.member_indices.len() as u32 * 60).max(150),
            cacheable: true,
        })
        .await
        .map_err(|e| {
            LexError::Synthesis(SynthesisError::DefinitionSynthesisFailed {
                cluster_id: cluster.id.clone(),
                reason: e.to_string(),
            })
        })?;

    let member_examples = cluster
        .member_indices
        .iter()
        .filter_map(|&i| flattened.get(i))
        .flat_map(|def| def.examples.iter().cloned())
        .collect::<Vec<_>>();
    let member_synonyms = cluster
        .member_indices
        .iter()
        .filter_map(|&i| flattened.get(i))
        .flat_map(|def| def.synonyms.iter().cloned())
        .collect::<Vec<_>>();

    let definitions = output
        .value
        .definitions
        .into_iter()
        .map(|dto| SynthesizedDefinition {
            id: uuid::Uuid::now_v7().to_string(),
            word: word.clone(),
            cluster_ref: cluster.id.clone(),
            part_of_speech: dto.part_of_speech,
            text: dto.text,
            relevancy: dto.relevancy,
            examples: Examples { generated: Vec::new(), literature: member_examples.clone() },
            synonyms: member_synonyms.clone(),
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

    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_text_joins_only_member_indices() {
        let flattened = vec![
            RawDefinition {
                part_of_speech: Some("noun".to_string()),
                text: "member".to_string(),
                examples: vec![],
                synonyms: vec![],
                antonyms: vec![],
                metadata: serde_json::Value::Null,
            },
            RawDefinition {
                part_of_speech: Some("verb".to_string()),
                text: "non-member".to_string(),
                examples: vec![],
                synonyms: vec![],
                antonyms: vec![],
                metadata: serde_json::Value::Null,
            },
        ];
        let cluster = MeaningCluster {
            id: "c1".to_string(),
            label: "sense 1".to_string(),
            description: "".to_string(),
            confidence: 0.9,
            member_indices: vec![0],
        };
        let text = cluster
            .member_indices
            .iter()
            .filter_map(|&i| flattened.get(i))
            .map(|d| d.text.clone())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(text, "member");
    }
}
