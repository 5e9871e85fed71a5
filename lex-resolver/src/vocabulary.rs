//! Vocabulary consistency (§4.4 "Vocabulary consistency"): the resolver's
//! indexes are built from a snapshot of known words; `vocabulary_hash`
//! lets the cascade detect that the corpus has moved on and trigger a
//! rebuild.

use lex_core::Fingerprint;
use serde::{Deserialize, Serialize};

/// One entry in the corpus the resolver indexes are built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub normalized: String,
    pub canonical: String,
    pub embedding: Option<Vec<f32>>,
}

/// Content hash over the corpus's normalized forms, independent of
/// iteration order. Two corpora with the same words (ignoring order)
/// hash identically; any addition, removal, or spelling change changes
/// the hash.
pub fn vocabulary_hash(entries: &[VocabularyEntry]) -> String {
    let mut normalized: Vec<&str> = entries.iter().map(|e| e.normalized.as_str()).collect();
    normalized.sort_unstable();
    Fingerprint::compute(normalized.iter().map(|s| s.as_bytes())).to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(word: &str) -> VocabularyEntry {
        VocabularyEntry {
            normalized: word.to_string(),
            canonical: word.to_string(),
            embedding: None,
        }
    }

    #[test]
    fn hash_is_order_independent() {
        let a = vec![entry("cogent"), entry("ephemeral")];
        let b = vec![entry("ephemeral"), entry("cogent")];
        assert_eq!(vocabulary_hash(&a), vocabulary_hash(&b));
    }

    #[test]
    fn hash_changes_when_vocabulary_changes() {
        let a = vec![entry("cogent")];
        let b = vec![entry("cogent"), entry("ephemeral")];
        assert_ne!(vocabulary_hash(&a), vocabulary_hash(&b));
    }
}
