//! Wiktionary REST provider (§4.5), via the `en.wiktionary.org` definition
//! endpoint, keyed by language code.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use lex_core::{ProviderData, ProviderError, ProviderStatus, RawDefinition, Word};
use serde::Deserialize;

use crate::http::ProviderHttp;
use crate::provider::DictionaryProvider;

const HOST: &str = "en.wiktionary.org";

pub struct WiktionaryProvider {
    http: Arc<ProviderHttp>,
}

impl WiktionaryProvider {
    pub fn new(http: Arc<ProviderHttp>) -> Self {
        Self { http }
    }
}

#[derive(Debug, Deserialize)]
struct WiktionarySense {
    #[serde(rename = "partOfSpeech")]
    part_of_speech: Option<String>,
    #[serde(default)]
    definitions: Vec<WiktionaryDefinition>,
}

#[derive(Debug, Deserialize)]
struct WiktionaryDefinition {
    definition: String,
    #[serde(default, rename = "parsedExamples")]
    parsed_examples: Vec<WiktionaryExample>,
}

#[derive(Debug, Deserialize)]
struct WiktionaryExample {
    #[serde(default)]
    example: String,
}

#[async_trait]
impl DictionaryProvider for WiktionaryProvider {
    fn name(&self) -> &'static str {
        "wiktionary"
    }

    fn host(&self) -> &'static str {
        HOST
    }

    async fn fetch_raw(&self, word: &Word) -> Result<ProviderData, ProviderError> {
        let url = format!("https://{HOST}/api/rest_v1/page/definition/{}", word.normalized);

        let by_language: HashMap<String, Vec<WiktionarySense>> =
            self.http.get_json(self.name(), HOST, &url).await?;

        let senses = by_language.get(&word.language).cloned().unwrap_or_default();

        let mut raw_definitions = Vec::new();
        for sense in &senses {
            for def in &sense.definitions {
                let text = strip_html_tags(&def.definition);
                if text.trim().is_empty() {
                    continue;
                }
                raw_definitions.push(RawDefinition {
                    part_of_speech: sense.part_of_speech.clone(),
                    text,
                    examples: def
                        .parsed_examples
                        .iter()
                        .map(|e| strip_html_tags(&e.example))
                        .filter(|e| !e.is_empty())
                        .collect(),
                    synonyms: Vec::new(),
                    antonyms: Vec::new(),
                    metadata: serde_json::Value::Null,
                });
            }
        }

        let status = if raw_definitions.is_empty() {
            ProviderStatus::Partial
        } else {
            ProviderStatus::Ok
        };

        Ok(ProviderData {
            provider: self.name().to_string(),
            word: word.clone(),
            fetched_at: Utc::now(),
            status,
            raw_definitions,
            etymology: None,
            pronunciation: None,
            raw_metadata: serde_json::Value::Null,
        })
    }
}

impl Clone for WiktionarySense {
    fn clone(&self) -> Self {
        Self {
            part_of_speech: self.part_of_speech.clone(),
            definitions: self
                .definitions
                .iter()
                .map(|d| WiktionaryDefinition {
                    definition: d.definition.clone(),
                    parsed_examples: d
                        .parsed_examples
                        .iter()
                        .map(|e| WiktionaryExample { example: e.example.clone() })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Wiktionary's definition text carries inline HTML (`<a>`, `<i>`, ...);
/// strip tags to get plain text, matching what `RawDefinition.text` expects.
fn strip_html_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_inline_markup() {
        assert_eq!(strip_html_tags("a <i>small</i> dog"), "a small dog");
    }
}
