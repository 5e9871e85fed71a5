//! Named, data-driven prompt templates (§4.6 "Templates"). Template
//! identity participates in the LLM cache key and in the entry
//! fingerprint (§3), so a template's `name` is treated as stable wire
//! identity, not just a debugging label.

use std::collections::HashMap;

use lex_core::{LexError, LlmError, LexResult};

/// A named prompt template with explicit, ordered variables. Rendering is
/// a plain `{var}` substitution — deliberately not a full templating
/// engine, since the prompts here have no conditionals or loops.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub body: &'static str,
    pub variables: &'static [&'static str],
}

impl PromptTemplate {
    /// Render the template, substituting each `{variable}` occurrence.
    /// Errors if a declared variable is missing from `vars` — silently
    /// leaving `{var}` in the rendered prompt would be a much worse
    /// failure mode than refusing to send it.
    pub fn render(&self, vars: &HashMap<&str, String>) -> LexResult<String> {
        let mut rendered = self.body.to_string();
        for var in self.variables {
            let value = vars.get(var).ok_or_else(|| {
                LexError::Llm(LlmError::TemplateNotFound {
                    name: format!("{}: missing variable {var}", self.name),
                })
            })?;
            rendered = rendered.replace(&format!("{{{var}}}"), value);
        }
        Ok(rendered)
    }
}

/// The fixed set of named templates the synthesizer and resolver use.
/// Data-driven per §4.6 — new templates are added here, not hand-assembled
/// at call sites.
pub struct TemplateRegistry {
    templates: HashMap<&'static str, PromptTemplate>,
}

impl TemplateRegistry {
    pub fn standard() -> Self {
        let mut templates = HashMap::new();
        for template in STANDARD_TEMPLATES {
            templates.insert(template.name, template.clone());
        }
        Self { templates }
    }

    pub fn get(&self, name: &str) -> LexResult<&PromptTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| LexError::Llm(LlmError::TemplateNotFound { name: name.to_string() }))
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

static STANDARD_TEMPLATES: &[PromptTemplate] = &[
    PromptTemplate {
        name: "cluster_definitions",
        body: "Group the following raw dictionary definitions of \"{word}\" into \
               disjoint meaning clusters. Each cluster needs an id, a short label, \
               a one-sentence description, and a confidence in [0,1].\n\n{raw_definitions}",
        variables: &["word", "raw_definitions"],
    },
    PromptTemplate {
        name: "synthesize_definition",
        body: "Write one or more synthesized definitions for the \"{cluster_label}\" \
               sense of \"{word}\", given these raw definitions from multiple \
               dictionaries. Merge semantic duplicates. Include part of speech, \
               definition text, and a relevancy score in [0,1].\n\n{raw_definitions}",
        variables: &["word", "cluster_label", "raw_definitions"],
    },
    PromptTemplate {
        name: "enhance_pronunciation",
        body: "Give the IPA pronunciation for \"{word}\".",
        variables: &["word"],
    },
    PromptTemplate {
        name: "enhance_etymology",
        body: "Give a concise etymology for \"{word}\".",
        variables: &["word"],
    },
    PromptTemplate {
        name: "enhance_word_forms",
        body: "List the inflected word forms of \"{word}\" (plurals, verb forms, \
               comparatives, as applicable).",
        variables: &["word"],
    },
    PromptTemplate {
        name: "enhance_facts",
        body: "Give a few interesting facts about the word \"{word}\" or its usage.",
        variables: &["word"],
    },
    PromptTemplate {
        name: "enhance_synonyms",
        body: "List synonyms for the sense of \"{word}\" defined as: {definition_text}",
        variables: &["word", "definition_text"],
    },
    PromptTemplate {
        name: "enhance_antonyms",
        body: "List antonyms for the sense of \"{word}\" defined as: {definition_text}",
        variables: &["word", "definition_text"],
    },
    PromptTemplate {
        name: "enhance_examples",
        body: "Write example sentences using \"{word}\" in the sense defined as: \
               {definition_text}",
        variables: &["word", "definition_text"],
    },
    PromptTemplate {
        name: "enhance_cefr_register_domain",
        body: "Classify the CEFR level, register, domain, and frequency band for \
               \"{word}\" in the sense defined as: {definition_text}",
        variables: &["word", "definition_text"],
    },
    PromptTemplate {
        name: "enhance_collocations",
        body: "List common collocations for \"{word}\" in the sense defined as: \
               {definition_text}",
        variables: &["word", "definition_text"],
    },
    PromptTemplate {
        name: "enhance_usage_notes",
        body: "Write a short usage note for \"{word}\" in the sense defined as: \
               {definition_text}",
        variables: &["word", "definition_text"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_template() {
        let registry = TemplateRegistry::standard();
        let template = registry.get("enhance_pronunciation").unwrap();
        let mut vars = HashMap::new();
        vars.insert("word", "cogent".to_string());
        let rendered = template.render(&vars).unwrap();
        assert!(rendered.contains("cogent"));
    }

    #[test]
    fn missing_variable_errors_rather_than_silently_rendering() {
        let registry = TemplateRegistry::standard();
        let template = registry.get("enhance_pronunciation").unwrap();
        let vars = HashMap::new();
        assert!(template.render(&vars).is_err());
    }

    #[test]
    fn unknown_template_name_errors() {
        let registry = TemplateRegistry::standard();
        assert!(registry.get("does_not_exist").is_err());
    }
}
