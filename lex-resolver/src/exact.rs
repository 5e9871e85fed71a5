//! Exact match against a finite-state dictionary (§4.4 step 2): a succinct
//! trie (the `fst` crate) maps normalized forms to their canonical word,
//! fronted by a [`BloomFilter`] so out-of-vocabulary queries short-circuit
//! before the trie walk.

use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use lex_core::ResolverError;

use crate::bloom::BloomFilter;
use crate::{MatchMethod, SearchResult};

pub struct ExactIndex {
    map: Map<Vec<u8>>,
    bloom: BloomFilter,
    /// Canonical spelling for each entry, indexed by the `fst::Map` value.
    /// The FST itself only ever stores normalized keys; this recovers the
    /// display form exact matches should return.
    canonical_forms: Vec<String>,
}

impl ExactIndex {
    /// Build the index from `(normalized, canonical)` pairs. Input is
    /// sorted internally — `fst::MapBuilder` requires ascending key order.
    pub fn build(mut entries: Vec<(String, String)>) -> Result<Self, ResolverError> {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.dedup_by(|a, b| a.0 == b.0);

        let mut bloom = BloomFilter::new(entries.len().max(1), 0.01);
        let mut canonical_forms = Vec::with_capacity(entries.len());
        let mut builder = MapBuilder::memory();

        for (index, (normalized, canonical)) in entries.iter().enumerate() {
            bloom.insert(normalized);
            builder
                .insert(normalized.as_bytes(), index as u64)
                .map_err(|e| ResolverError::IndexBuildFailed {
                    reason: format!("fst insert: {e}"),
                })?;
            canonical_forms.push(canonical.clone());
        }

        let bytes = builder.into_inner().map_err(|e| ResolverError::IndexBuildFailed {
            reason: format!("fst finalize: {e}"),
        })?;
        let map = Map::new(bytes).map_err(|e| ResolverError::IndexBuildFailed {
            reason: format!("fst load: {e}"),
        })?;

        Ok(Self {
            map,
            bloom,
            canonical_forms,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.canonical_forms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.canonical_forms.len()
    }

    /// O(|query|) exact lookup (§4.4 step 2): a Bloom negative short-circuits
    /// before the trie walk; a positive still requires the trie lookup since
    /// Bloom filters have false positives.
    pub fn lookup(&self, normalized_query: &str) -> Option<SearchResult> {
        if !self.bloom.might_contain(normalized_query) {
            return None;
        }
        self.map.get(normalized_query).map(|index| SearchResult {
            canonical: self.canonical_forms[index as usize].clone(),
            score: 1.0,
            method: MatchMethod::Exact,
        })
    }

    /// All normalized keys sharing `prefix`, for prefix-scan-based fuzzy
    /// candidate generation (§4.4 step 3).
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut stream = self.map.range().ge(prefix).lt(prefix_upper_bound(prefix)).into_stream();
        let mut out = Vec::new();
        while let Some((key, _)) = stream.next() {
            out.push(String::from_utf8_lossy(key).into_owned());
        }
        out
    }

    pub fn all_canonical_forms(&self) -> &[String] {
        &self.canonical_forms
    }
}

/// Smallest string greater than every string with `prefix` as a prefix,
/// used to bound an `fst` range stream to exactly that prefix's keys.
fn prefix_upper_bound(prefix: &str) -> Vec<u8> {
    let mut bytes = prefix.as_bytes().to_vec();
    while let Some(last) = bytes.last_mut() {
        if *last < 0xff {
            *last += 1;
            return bytes;
        }
        bytes.pop();
    }
    vec![0xff; 256]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> ExactIndex {
        ExactIndex::build(vec![
            ("cogent".to_string(), "cogent".to_string()),
            ("cogently".to_string(), "cogently".to_string()),
            ("ephemeral".to_string(), "ephemeral".to_string()),
        ])
        .unwrap()
    }

    #[test]
    fn exact_lookup_finds_known_word() {
        let index = sample_index();
        let result = index.lookup("cogent").unwrap();
        assert_eq!(result.canonical, "cogent");
        assert_eq!(result.score, 1.0);
        assert_eq!(result.method, MatchMethod::Exact);
    }

    #[test]
    fn exact_lookup_misses_unknown_word() {
        let index = sample_index();
        assert!(index.lookup("zzzznotaword").is_none());
    }

    #[test]
    fn prefix_scan_finds_shared_prefixes() {
        let index = sample_index();
        let hits = index.keys_with_prefix("cogent");
        assert_eq!(hits.len(), 2);
    }
}
