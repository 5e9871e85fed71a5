//! Enhancement component registry (§4.7 step 3): declares each
//! component's scope (word-level vs. definition-level) and name, so
//! `enhance.rs` can decide what is missing and fan work out without
//! hand-listing components at each call site.

use std::collections::HashMap;

use lex_core::{LexResult, ModelTier, SynthesizedDefinition, Word};
use lex_llm::{ChatRequest, LlmClient};
use serde::Deserialize;

/// Whether a component enriches the whole word or a single sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentScope {
    Word,
    Definition,
}

/// One enhancement component's static identity (§4.7 "component registry
/// declares each component's scope and its synthesis function").
#[derive(Debug, Clone, Copy)]
pub struct ComponentDef {
    pub name: &'static str,
    pub scope: ComponentScope,
}

/// All components the synthesizer knows how to run, in a fixed order.
/// Word-level components run once per word; definition-level components
/// run once per `SynthesizedDefinition`.
pub const WORD_COMPONENTS: &[ComponentDef] = &[
    ComponentDef { name: "pronunciation", scope: ComponentScope::Word },
    ComponentDef { name: "etymology", scope: ComponentScope::Word },
    ComponentDef { name: "word_forms", scope: ComponentScope::Word },
    ComponentDef { name: "facts", scope: ComponentScope::Word },
];

/// `cefr_register_domain` is one registry entry and one LLM call but sets
/// four `SynthesizedDefinition` fields (`cefr_level`, `register`,
/// `domain`, `frequency_band`) at once; `enhance.rs` records success
/// against all four names individually so `missing_definition_components`
/// still reports per-field, not per-call, granularity.
pub const DEFINITION_COMPONENTS: &[ComponentDef] = &[
    ComponentDef { name: "synonyms", scope: ComponentScope::Definition },
    ComponentDef { name: "antonyms", scope: ComponentScope::Definition },
    ComponentDef { name: "examples", scope: ComponentScope::Definition },
    ComponentDef { name: "cefr_register_domain", scope: ComponentScope::Definition },
    ComponentDef { name: "collocations", scope: ComponentScope::Definition },
    ComponentDef { name: "usage_notes", scope: ComponentScope::Definition },
];

/// The result of running one word-level component.
#[derive(Debug, Clone)]
pub enum WordComponentOutput {
    Pronunciation(String),
    Etymology(String),
    WordForms(Vec<String>),
    Facts(Vec<String>),
}

/// The result of running one definition-level component.
#[derive(Debug, Clone)]
pub enum DefinitionComponentOutput {
    Synonyms(Vec<String>),
    Antonyms(Vec<String>),
    Examples(Vec<String>),
    CefrRegisterDomain { cefr_level: String, register: String, domain: String, frequency_band: String },
    Collocations(Vec<String>),
    UsageNotes(String),
}

#[derive(Deserialize)]
struct TextField {
    value: String,
}

#[derive(Deserialize)]
struct ListField {
    values: Vec<String>,
}

#[derive(Deserialize)]
struct CefrRegisterDomainDto {
    cefr_level: String,
    register: String,
    domain: String,
    frequency_band: String,
}

fn text_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {"value": {"type": "string"}},
        "required": ["value"]
    })
}

fn list_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {"values": {"type": "array", "items": {"type": "string"}}},
        "required": ["values"]
    })
}

fn cefr_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "cefr_level": {"type": "string"},
            "register": {"type": "string"},
            "domain": {"type": "string"},
            "frequency_band": {"type": "string"}
        },
        "required": ["cefr_level", "register", "domain", "frequency_band"]
    })
}

/// Run one word-level component by name (§4.7 step 3). Returns an error
/// for an unrecognized component name; callers only ever pass names drawn
/// from [`WORD_COMPONENTS`].
pub async fn run_word_component(
    llm: &LlmClient,
    word: &Word,
    component: &str,
    tier: ModelTier,
) -> LexResult<WordComponentOutput> {
    let mut vars = HashMap::new();
    vars.insert("word", word.normalized.clone());

    match component {
        "pronunciation" => {
            let out = llm
                .chat_structured::<TextField>(ChatRequest {
                    template: "enhance_pronunciation",
                    vars,
                    tier,
                    schema_name: "text_field",
                    schema: text_schema(),
                    requested_tokens: 50,
                    cacheable: true,
                })
                .await?;
            Ok(WordComponentOutput::Pronunciation(out.value.value))
        }
        "etymology" => {
            let out = llm
                .chat_structured::<TextField>(ChatRequest {
                    template: "enhance_etymology",
                    vars,
                    tier,
                    schema_name: "text_field",
                    schema: text_schema(),
                    requested_tokens: 150,
                    cacheable: true,
                })
                .await?;
            Ok(WordComponentOutput::Etymology(out.value.value))
        }
        "word_forms" => {
            let out = llm
                .chat_structured::<ListField>(ChatRequest {
                    template: "enhance_word_forms",
                    vars,
                    tier,
                    schema_name: "list_field",
                    schema: list_schema(),
                    requested_tokens: 100,
                    cacheable: true,
                })
                .await?;
            Ok(WordComponentOutput::WordForms(out.value.values))
        }
        "facts" => {
            let out = llm
                .chat_structured::<ListField>(ChatRequest {
                    template: "enhance_facts",
                    vars,
                    tier,
                    schema_name: "list_field",
                    schema: list_schema(),
                    requested_tokens: 200,
                    cacheable: true,
                })
                .await?;
            Ok(WordComponentOutput::Facts(out.value.values))
        }
        other => Err(lex_core::LexError::Internal(format!("unknown word component: {other}"))),
    }
}

/// Run one definition-level component by name (§4.7 step 3).
pub async fn run_definition_component(
    llm: &LlmClient,
    word: &Word,
    definition: &SynthesizedDefinition,
    component: &str,
    tier: ModelTier,
) -> LexResult<DefinitionComponentOutput> {
    let mut vars = HashMap::new();
    vars.insert("word", word.normalized.clone());
    vars.insert("definition_text", definition.text.clone());

    match component {
        "synonyms" => {
            let out = llm
                .chat_structured::<ListField>(ChatRequest {
                    template: "enhance_synonyms",
                    vars,
                    tier,
                    schema_name: "list_field",
                    schema: list_schema(),
                    requested_tokens: 100,
                    cacheable: true,
                })
                .await?;
            Ok(DefinitionComponentOutput::Synonyms(out.value.values))
        }
        "antonyms" => {
            let out = llm
                .chat_structured::<ListField>(ChatRequest {
                    template: "enhance_antonyms",
                    vars,
                    tier,
                    schema_name: "list_field",
                    schema: list_schema(),
                    requested_tokens: 100,
                    cacheable: true,
                })
                .await?;
            Ok(DefinitionComponentOutput::Antonyms(out.value.values))
        }
        "examples" => {
            let out = llm
                .chat_structured::<ListField>(ChatRequest {
                    template: "enhance_examples",
                    vars,
                    tier,
                    schema_name: "list_field",
                    schema: list_schema(),
                    requested_tokens: 150,
                    cacheable: true,
                })
                .await?;
            Ok(DefinitionComponentOutput::Examples(out.value.values))
        }
        "cefr_register_domain" => {
            let out = llm
                .chat_structured::<CefrRegisterDomainDto>(ChatRequest {
                    template: "enhance_cefr_register_domain",
                    vars,
                    tier,
                    schema_name: "cefr_register_domain",
                    schema: cefr_schema(),
                    requested_tokens: 100,
                    cacheable: true,
                })
                .await?;
            Ok(DefinitionComponentOutput::CefrRegisterDomain {
                cefr_level: out.value.cefr_level,
                register: out.value.register,
                domain: out.value.domain,
                frequency_band: out.value.frequency_band,
            })
        }
        "collocations" => {
            let out = llm
                .chat_structured::<ListField>(ChatRequest {
                    template: "enhance_collocations",
                    vars,
                    tier,
                    schema_name: "list_field",
                    schema: list_schema(),
                    requested_tokens: 100,
                    cacheable: true,
                })
                .await?;
            Ok(DefinitionComponentOutput::Collocations(out.value.values))
        }
        "usage_notes" => {
            let out = llm
                .chat_structured::<TextField>(ChatRequest {
                    template: "enhance_usage_notes",
                    vars,
                    tier,
                    schema_name: "text_field",
                    schema: text_schema(),
                    requested_tokens: 100,
                    cacheable: true,
                })
                .await?;
            Ok(DefinitionComponentOutput::UsageNotes(out.value.value))
        }
        other => Err(lex_core::LexError::Internal(format!("unknown definition component: {other}"))),
    }
}

/// The word-level component names still unset on an entry-in-progress
/// (mirrors `SynthesizedDefinition::missing_definition_components`, but
/// for the word-scoped fields that live on `SynthesizedEntry` itself).
pub fn missing_word_components(
    pronunciation: &Option<String>,
    etymology: &Option<String>,
    word_forms: &Option<Vec<String>>,
    facts: &Option<Vec<String>>,
) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if pronunciation.is_none() {
        missing.push("pronunciation");
    }
    if etymology.is_none() {
        missing.push("etymology");
    }
    if word_forms.is_none() {
        missing.push("word_forms");
    }
    if facts.is_none() {
        missing.push("facts");
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registries_list_every_component_exactly_once() {
        let names: Vec<&str> = WORD_COMPONENTS.iter().chain(DEFINITION_COMPONENTS.iter()).map(|c| c.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names.len(), sorted.len(), "component names must be unique");
    }

    #[test]
    fn missing_word_components_reports_all_when_unset() {
        let missing = missing_word_components(&None, &None, &None, &None);
        assert_eq!(missing.len(), 4);
    }

    #[test]
    fn missing_word_components_reports_none_when_set() {
        let missing = missing_word_components(
            &Some("/kəˈdʒɛnt/".to_string()),
            &Some("Latin cogere".to_string()),
            &Some(vec!["cogent".to_string()]),
            &Some(vec!["fact".to_string()]),
        );
        assert!(missing.is_empty());
    }
}
