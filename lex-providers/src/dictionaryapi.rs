//! `dictionaryapi.dev` provider (§4.5). A free, keyless lookup API whose
//! response shape is a JSON array of entries per headword.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use lex_core::{ProviderData, ProviderError, ProviderStatus, RawDefinition, Word};
use serde::Deserialize;

use crate::http::ProviderHttp;
use crate::provider::DictionaryProvider;

const HOST: &str = "api.dictionaryapi.dev";

pub struct DictionaryApiProvider {
    http: Arc<ProviderHttp>,
}

impl DictionaryApiProvider {
    pub fn new(http: Arc<ProviderHttp>) -> Self {
        Self { http }
    }
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    phonetic: Option<String>,
    #[serde(default)]
    meanings: Vec<Meaning>,
}

#[derive(Debug, Deserialize)]
struct Meaning {
    #[serde(rename = "partOfSpeech")]
    part_of_speech: Option<String>,
    #[serde(default)]
    definitions: Vec<DefinitionEntry>,
    #[serde(default)]
    synonyms: Vec<String>,
    #[serde(default)]
    antonyms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DefinitionEntry {
    definition: String,
    #[serde(default)]
    example: Option<String>,
    #[serde(default)]
    synonyms: Vec<String>,
    #[serde(default)]
    antonyms: Vec<String>,
}

#[async_trait]
impl DictionaryProvider for DictionaryApiProvider {
    fn name(&self) -> &'static str {
        "dictionary_api"
    }

    fn host(&self) -> &'static str {
        HOST
    }

    async fn fetch_raw(&self, word: &Word) -> Result<ProviderData, ProviderError> {
        let url = format!(
            "https://{HOST}/api/v2/entries/{}/{}",
            word.language,
            urlencoding_lite(&word.normalized)
        );

        let entries: Vec<Entry> = self.http.get_json(self.name(), HOST, &url).await?;

        let mut raw_definitions = Vec::new();
        let mut pronunciation = None;

        for entry in &entries {
            if pronunciation.is_none() {
                pronunciation = entry.phonetic.clone();
            }
            for meaning in &entry.meanings {
                for def in &meaning.definitions {
                    let mut synonyms = meaning.synonyms.clone();
                    synonyms.extend(def.synonyms.clone());
                    let mut antonyms = meaning.antonyms.clone();
                    antonyms.extend(def.antonyms.clone());

                    raw_definitions.push(RawDefinition {
                        part_of_speech: meaning.part_of_speech.clone(),
                        text: def.definition.clone(),
                        examples: def.example.clone().into_iter().collect(),
                        synonyms,
                        antonyms,
                        metadata: serde_json::Value::Null,
                    });
                }
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
            pronunciation,
            raw_metadata: serde_json::Value::Null,
        })
    }
}

fn urlencoding_lite(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_string()
            } else {
                format!("%{:02X}", c as u32)
            }
        })
        .collect()
}
