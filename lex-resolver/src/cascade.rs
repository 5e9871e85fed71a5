//! The resolution cascade itself (§4.4 steps 1, 5, early termination,
//! vocabulary consistency). Steps 2-4 are delegated to [`ExactIndex`],
//! [`fuzzy_search`], and [`SemanticIndex`].

use std::collections::HashMap;
use std::sync::Arc;

use lex_core::ResolverError;
use tracing::{debug, instrument};

use crate::exact::ExactIndex;
use crate::fuzzy::fuzzy_search;
use crate::normalize::normalize_query;
use crate::semantic::SemanticIndex;
use crate::vocabulary::{vocabulary_hash, VocabularyEntry};
use crate::SearchResult;

/// A ranked, exact/fuzzy/semantic result is "high quality" once its score
/// clears this bar — used for the early-termination checks (§4.4).
const HIGH_QUALITY_SCORE: f32 = 0.99;

pub struct ResolverBuilder {
    entries: Vec<VocabularyEntry>,
    fuzzy_max_distance: usize,
    semantic_threshold: f32,
}

impl ResolverBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            fuzzy_max_distance: 3,
            semantic_threshold: 0.75,
        }
    }

    pub fn with_entries(mut self, entries: Vec<VocabularyEntry>) -> Self {
        self.entries = entries;
        self
    }

    pub fn with_fuzzy_max_distance(mut self, distance: u8) -> Self {
        self.fuzzy_max_distance = distance as usize;
        self
    }

    pub fn with_semantic_threshold(mut self, threshold: f32) -> Self {
        self.semantic_threshold = threshold;
        self
    }

    /// Build the resolver and hand back the (initially not-ready) semantic
    /// index separately, so the caller can kick off its initialization
    /// (embedding the vocabulary) on its own schedule without the cascade
    /// itself needing to know how to call an embedding model.
    pub fn build(self) -> Result<(Resolver, Arc<SemanticIndex>), ResolverError> {
        let hash = vocabulary_hash(&self.entries);
        let exact = ExactIndex::build(
            self.entries
                .iter()
                .map(|e| (e.normalized.clone(), e.canonical.clone()))
                .collect(),
        )?;
        let semantic = Arc::new(SemanticIndex::new());

        Ok((
            Resolver {
                exact,
                semantic: Arc::clone(&semantic),
                vocabulary_hash: hash,
                fuzzy_max_distance: self.fuzzy_max_distance,
                semantic_threshold: self.semantic_threshold,
            },
            semantic,
        ))
    }
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The multi-method search cascade (§4.4).
pub struct Resolver {
    exact: ExactIndex,
    semantic: Arc<SemanticIndex>,
    vocabulary_hash: String,
    fuzzy_max_distance: usize,
    semantic_threshold: f32,
}

impl Resolver {
    pub fn vocabulary_hash(&self) -> &str {
        &self.vocabulary_hash
    }

    pub fn semantic_index(&self) -> &Arc<SemanticIndex> {
        &self.semantic
    }

    /// Whether the corpus described by `current_entries` has drifted from
    /// the snapshot this resolver's indexes were built from (§4.4
    /// "Vocabulary consistency").
    pub fn needs_rebuild(&self, current_entries: &[VocabularyEntry]) -> bool {
        vocabulary_hash(current_entries) != self.vocabulary_hash
    }

    /// Run the full cascade for one query (§4.4 steps 1-5).
    ///
    /// `query_embedding` is optional and precomputed by the caller (the
    /// pipeline, which owns the LLM client) — the resolver itself has no
    /// way to turn text into a vector, it only searches one.
    #[instrument(skip(self, query_embedding), fields(max_results))]
    pub fn resolve(&self, raw_query: &str, max_results: usize, query_embedding: Option<&[f32]>) -> Vec<SearchResult> {
        let normalized = normalize_query(raw_query);
        let mut results = Vec::new();

        if let Some(hit) = self.exact.lookup(&normalized) {
            results.push(hit);
        }

        if sufficient(&results, max_results) {
            debug!(stage = "exact", "early termination after exact pass");
            return finalize(results, max_results);
        }

        let candidates = self.fuzzy_candidates(&normalized);
        results.extend(fuzzy_search(&normalized, &candidates, max_results, self.fuzzy_max_distance));

        if sufficient(&results, max_results) {
            debug!(stage = "fuzzy", "early termination after fuzzy pass");
            return finalize(results, max_results);
        }

        if let Some(embedding) = query_embedding {
            if self.semantic.is_ready() {
                match self.semantic.search(embedding, max_results, self.semantic_threshold) {
                    Ok(hits) => results.extend(hits),
                    Err(e) => debug!(error = %e, "semantic search unavailable, skipping"),
                }
            }
        }

        finalize(results, max_results)
    }

    /// Candidate words for fuzzy matching, drawn via a short prefix scan
    /// over the exact index (§4.4 step 3 "prefix scan").
    fn fuzzy_candidates(&self, normalized_query: &str) -> Vec<String> {
        let prefix_len = normalized_query.chars().count().clamp(1, 2);
        let prefix: String = normalized_query.chars().take(prefix_len).collect();
        if prefix.is_empty() {
            return Vec::new();
        }
        self.exact.keys_with_prefix(&prefix)
    }
}

fn sufficient(results: &[SearchResult], max_results: usize) -> bool {
    results.iter().filter(|r| r.score >= HIGH_QUALITY_SCORE).count() >= max_results
}

/// Merge step (§4.4 step 5): dedup by canonical form keeping the max
/// score, then sort by score descending, tie-broken by method rank
/// (`MatchMethod`'s declaration order is exact < fuzzy < semantic).
fn finalize(results: Vec<SearchResult>, max_results: usize) -> Vec<SearchResult> {
    let mut best: HashMap<String, SearchResult> = HashMap::new();
    for result in results {
        best.entry(result.canonical.clone())
            .and_modify(|existing| {
                if result.score > existing.score {
                    *existing = result.clone();
                }
            })
            .or_insert(result);
    }

    let mut merged: Vec<SearchResult> = best.into_values().collect();
    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.method.cmp(&b.method))
    });
    merged.truncate(max_results);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<VocabularyEntry> {
        vec!["cogent", "cogently", "ephemeral", "ubiquitous"]
            .into_iter()
            .map(|w| VocabularyEntry {
                normalized: w.to_string(),
                canonical: w.to_string(),
                embedding: None,
            })
            .collect()
    }

    #[test]
    fn exact_hit_short_circuits_before_fuzzy() {
        let (resolver, _semantic) = ResolverBuilder::new().with_entries(entries()).build().unwrap();
        let results = resolver.resolve("cogent", 1, None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].canonical, "cogent");
        assert_eq!(results[0].method, crate::MatchMethod::Exact);
    }

    #[test]
    fn misspelling_falls_through_to_fuzzy() {
        let (resolver, _semantic) = ResolverBuilder::new().with_entries(entries()).build().unwrap();
        let results = resolver.resolve("cogant", 5, None);
        assert!(results.iter().any(|r| r.canonical == "cogent"));
    }

    #[test]
    fn rebuild_detection_reacts_to_vocabulary_drift() {
        let (resolver, _semantic) = ResolverBuilder::new().with_entries(entries()).build().unwrap();
        assert!(!resolver.needs_rebuild(&entries()));

        let mut grown = entries();
        grown.push(VocabularyEntry {
            normalized: "serendipity".to_string(),
            canonical: "serendipity".to_string(),
            embedding: None,
        });
        assert!(resolver.needs_rebuild(&grown));
    }

    #[test]
    fn results_are_deduplicated_by_canonical_form() {
        let (resolver, _semantic) = ResolverBuilder::new().with_entries(entries()).build().unwrap();
        let results = resolver.resolve("cogent", 5, None);
        let unique: std::collections::HashSet<_> = results.iter().map(|r| &r.canonical).collect();
        assert_eq!(unique.len(), results.len());
    }
}
