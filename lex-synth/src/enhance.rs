//! Parallel per-definition enhancement (§4.7 step 3). One enhancement
//! routine fans out across word-level and definition-level components,
//! bounded per scope, and applies each component's result to the correct
//! definition by id — never by index, since components complete out of
//! order.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::future::join_all;
use lex_core::{ModelInfo, ModelTier, SynthesizedDefinition, Word};
use lex_llm::LlmClient;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::components::{
    missing_word_components, run_definition_component, run_word_component, DefinitionComponentOutput,
    WordComponentOutput, DEFINITION_COMPONENTS, WORD_COMPONENTS,
};

/// Output of the word-level enhancement pass, applied directly onto
/// `SynthesizedEntry` fields by the caller.
#[derive(Debug, Default, Clone)]
pub struct WordEnhancement {
    pub pronunciation: Option<String>,
    pub etymology: Option<String>,
    pub word_forms: Option<Vec<String>>,
    pub facts: Option<Vec<String>>,
}

/// Bound on concurrent component calls per scope (§5 "Concurrency is
/// bounded per scope").
const SCOPE_CONCURRENCY: usize = 4;

/// Run every missing word-level component concurrently (bounded), folding
/// successes into `WordEnhancement` and failures into `model_info`.
/// Never fails the caller: a component failure just leaves its field
/// unset (§4.7 "Enhancement failures are per-component and non-fatal").
pub async fn enhance_word(
    llm: &LlmClient,
    word: &Word,
    existing: &WordEnhancement,
    tier: ModelTier,
    model_info: &mut ModelInfo,
) -> WordEnhancement {
    let missing = missing_word_components(
        &existing.pronunciation,
        &existing.etymology,
        &existing.word_forms,
        &existing.facts,
    );
    let wanted: Vec<&'static str> = WORD_COMPONENTS
        .iter()
        .map(|c| c.name)
        .filter(|name| missing.contains(name))
        .collect();

    let semaphore = Arc::new(Semaphore::new(SCOPE_CONCURRENCY));
    let tasks = wanted.into_iter().map(|name| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = semaphore.acquire().await.expect("semaphore not closed");
            (name, run_word_component(llm, word, name, tier).await)
        }
    });

    let mut result = existing.clone();
    for (name, outcome) in join_all(tasks).await {
        match outcome {
            Ok(WordComponentOutput::Pronunciation(v)) => {
                result.pronunciation = Some(v);
                model_info.components_succeeded.insert(name.to_string());
            }
            Ok(WordComponentOutput::Etymology(v)) => {
                result.etymology = Some(v);
                model_info.components_succeeded.insert(name.to_string());
            }
            Ok(WordComponentOutput::WordForms(v)) => {
                result.word_forms = Some(v);
                model_info.components_succeeded.insert(name.to_string());
            }
            Ok(WordComponentOutput::Facts(v)) => {
                result.facts = Some(v);
                model_info.components_succeeded.insert(name.to_string());
            }
            Err(err) => {
                warn!(component = name, word = %word.normalized, error = %err, "word enhancement component failed");
                model_info.components_failed.insert(name.to_string());
            }
        }
    }
    result
}

/// Run every missing definition-level component for one definition,
/// mutating it in place. Applied by id at the call site in
/// `synthesizer.rs`, never by position in a vector.
pub async fn enhance_definition(
    llm: &LlmClient,
    word: &Word,
    definition: &mut SynthesizedDefinition,
    tier: ModelTier,
    model_info: &mut ModelInfo,
) {
    let missing: BTreeSet<&'static str> = definition.missing_definition_components().into_iter().collect();
    let wanted: Vec<&'static str> = DEFINITION_COMPONENTS
        .iter()
        .map(|c| c.name)
        .filter(|name| component_is_wanted(name, &missing))
        .collect();

    let semaphore = Arc::new(Semaphore::new(SCOPE_CONCURRENCY));
    let tasks = wanted.into_iter().map(|name| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = semaphore.acquire().await.expect("semaphore not closed");
            (name, run_definition_component(llm, word, definition, name, tier).await)
        }
    });

    for (name, outcome) in join_all(tasks).await {
        match outcome {
            Ok(DefinitionComponentOutput::Synonyms(v)) => {
                definition.synonyms = v;
                model_info.components_succeeded.insert("synonyms".to_string());
            }
            Ok(DefinitionComponentOutput::Antonyms(v)) => {
                definition.antonyms = Some(v);
                model_info.components_succeeded.insert("antonyms".to_string());
            }
            Ok(DefinitionComponentOutput::Examples(v)) => {
                definition.examples.generated = v;
                model_info.components_succeeded.insert("examples".to_string());
            }
            Ok(DefinitionComponentOutput::CefrRegisterDomain { cefr_level, register, domain, frequency_band }) => {
                definition.cefr_level = Some(cefr_level);
                definition.register = Some(register);
                definition.domain = Some(domain);
                definition.frequency_band = Some(frequency_band);
                for field in ["cefr_level", "register", "domain", "frequency_band"] {
                    model_info.components_succeeded.insert(field.to_string());
                }
            }
            Ok(DefinitionComponentOutput::Collocations(v)) => {
                definition.collocations = Some(v);
                model_info.components_succeeded.insert("collocations".to_string());
            }
            Ok(DefinitionComponentOutput::UsageNotes(v)) => {
                definition.usage_notes = Some(v);
                model_info.components_succeeded.insert("usage_notes".to_string());
            }
            Err(err) => {
                warn!(
                    component = name,
                    definition_id = %definition.id,
                    error = %err,
                    "definition enhancement component failed"
                );
                model_info.components_failed.insert(name.to_string());
            }
        }
    }
}

/// `cefr_register_domain` is "wanted" if any of its four underlying
/// fields is still missing, so a single component is never re-run four
/// times for the same definition.
fn component_is_wanted(name: &str, missing: &BTreeSet<&'static str>) -> bool {
    match name {
        "cefr_register_domain" => {
            missing.contains("cefr_level")
                || missing.contains("register")
                || missing.contains("domain")
                || missing.contains("frequency_band")
        }
        other => missing.contains(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cefr_component_wanted_if_any_subfield_missing() {
        let mut missing = BTreeSet::new();
        missing.insert("cefr_level");
        assert!(component_is_wanted("cefr_register_domain", &missing));
    }

    #[test]
    fn cefr_component_not_wanted_if_all_subfields_present() {
        let missing = BTreeSet::new();
        assert!(!component_is_wanted("cefr_register_domain", &missing));
    }

    #[test]
    fn plain_component_wanted_iff_listed_missing() {
        let mut missing = BTreeSet::new();
        missing.insert("synonyms");
        assert!(component_is_wanted("synonyms", &missing));
        assert!(!component_is_wanted("antonyms", &missing));
    }
}
