//! Data-configured stage sequences (§4.2: "Stages form a predefined
//! sequence per category (lookup, suggest-words, image, generic); the set
//! is data-configured, not code-hardcoded."). A [`StageDef`] carries the
//! fixed `progress` value a stage represents, so the tracker never needs
//! to invent a number — it looks one up.

use serde::{Deserialize, Serialize};

/// One named step of a category's sequence, with the progress value it
/// contributes (§4.2, §6 "config" event payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StageDef {
    pub name: String,
    pub progress: u8,
    pub label: String,
    pub description: String,
}

/// A category's full ordered stage list, as sent in the SSE `config`
/// event (§6: "one event carrying `{category, stages: [...]}`; always
/// first").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StageSequence {
    pub category: String,
    pub stages: Vec<StageDef>,
}

impl StageSequence {
    pub fn index_of(&self, stage_name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name == stage_name)
    }

    pub fn progress_of(&self, index: usize) -> u8 {
        self.stages.get(index).map(|s| s.progress).unwrap_or(100)
    }

    pub fn label_of(&self, index: usize) -> String {
        self.stages
            .get(index)
            .map(|s| s.label.clone())
            .unwrap_or_default()
    }
}

fn stage(name: &str, progress: u8, label: &str, description: &str) -> StageDef {
    StageDef {
        name: name.to_string(),
        progress,
        label: label.to_string(),
        description: description.to_string(),
    }
}

/// The full word-lookup pipeline sequence (§4.8), matching
/// `lex_core::Stage`'s variant names so `StateTracker::update` can be
/// driven directly from pipeline stage transitions.
pub fn lookup_sequence() -> StageSequence {
    StageSequence {
        category: "lookup".to_string(),
        stages: vec![
            stage("Normalizing", 5, "Normalizing", "Normalizing the query"),
            stage("ResolvingWord", 15, "Resolving", "Finding the canonical word"),
            stage("FetchingProviders", 40, "Fetching", "Fetching dictionary sources"),
            stage("Clustering", 55, "Clustering", "Grouping definitions by sense"),
            stage("SynthesizingDefinitions", 70, "Synthesizing", "Writing synthesized definitions"),
            stage("EnhancingDefinitions", 90, "Enhancing", "Adding pronunciation, examples, and more"),
            stage("Finalizing", 97, "Finalizing", "Saving the entry"),
            stage("Done", 100, "Done", "Lookup complete"),
        ],
    }
}

/// `/search/{q}/suggestions` progress sequence — a much shorter pipeline
/// than a full lookup (resolver only).
pub fn suggest_words_sequence() -> StageSequence {
    StageSequence {
        category: "suggest-words".to_string(),
        stages: vec![
            stage("Normalizing", 20, "Normalizing", "Normalizing the query"),
            stage("ResolvingWord", 80, "Searching", "Searching the vocabulary"),
            stage("Done", 100, "Done", "Suggestions ready"),
        ],
    }
}

/// Reserved for a future image-lookup pipeline; named in §4.2's fixed
/// category set even though no current operation emits it.
pub fn image_sequence() -> StageSequence {
    StageSequence {
        category: "image".to_string(),
        stages: vec![
            stage("Normalizing", 10, "Normalizing", "Normalizing the query"),
            stage("FetchingProviders", 60, "Fetching", "Fetching image sources"),
            stage("Done", 100, "Done", "Image lookup complete"),
        ],
    }
}

/// Fallback for operations that don't fit another named category.
pub fn generic_sequence() -> StageSequence {
    StageSequence {
        category: "generic".to_string(),
        stages: vec![
            stage("Started", 10, "Started", "Request started"),
            stage("Done", 100, "Done", "Request complete"),
        ],
    }
}

/// Look up a category's sequence by name (§4.2). Unknown categories fall
/// back to `generic`, matching the spec's framing of `generic` as the
/// catch-all category.
pub fn sequence_for(category: &str) -> StageSequence {
    match category {
        "lookup" => lookup_sequence(),
        "suggest-words" => suggest_words_sequence(),
        "image" => image_sequence(),
        _ => generic_sequence(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_sequence_progress_is_non_decreasing() {
        let seq = lookup_sequence();
        let mut last = 0;
        for stage in &seq.stages {
            assert!(stage.progress >= last);
            last = stage.progress;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn unknown_category_falls_back_to_generic() {
        let seq = sequence_for("not-a-real-category");
        assert_eq!(seq.category, "generic");
    }
}
