//! Fuzzy matching via bounded edit distance (§4.4 step 3). Candidates are
//! length-prefiltered before computing the (relatively expensive)
//! Levenshtein distance, and discarded early if the gap between query and
//! candidate length already exceeds the max distance.

use crate::{MatchMethod, SearchResult};

/// Score and rank fuzzy candidates against `normalized_query`.
///
/// `candidates` should already be a coarse shortlist (e.g. same or
/// neighboring prefix bucket) — this function does not scan a whole
/// vocabulary itself, matching §4.4's "candidates drawn via a metric-tree
/// or prefix scan" step, which lives in the index/cascade layer.
pub fn fuzzy_search(
    normalized_query: &str,
    candidates: &[String],
    max_results: usize,
    max_distance: usize,
) -> Vec<SearchResult> {
    let query_len = normalized_query.chars().count();

    let mut scored: Vec<SearchResult> = candidates
        .iter()
        .filter_map(|candidate| {
            let candidate_len = candidate.chars().count();
            // length prefiltering: a candidate whose length alone exceeds
            // the max distance budget cannot score under the threshold.
            if candidate_len.abs_diff(query_len) > max_distance {
                return None;
            }

            let distance = strsim::levenshtein(normalized_query, candidate);
            if distance > max_distance {
                return None;
            }

            let max_len = query_len.max(candidate_len).max(1);
            let score = (1.0 - distance as f32 / max_len as f32).max(0.0);

            Some(SearchResult {
                canonical: candidate.clone(),
                score,
                method: MatchMethod::Fuzzy,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.dedup_by(|a, b| a.canonical == b.canonical);
    scored.truncate(max_results);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_misspelling_scores_high() {
        let candidates = vec!["cogent".to_string(), "cogently".to_string()];
        let results = fuzzy_search("cogant", &candidates, 10, 3);
        assert_eq!(results[0].canonical, "cogent");
        assert!(results[0].score > 0.7);
    }

    #[test]
    fn distances_above_threshold_are_discarded() {
        let candidates = vec!["zzzzzzzzzzzz".to_string()];
        let results = fuzzy_search("cogent", &candidates, 10, 3);
        assert!(results.is_empty());
    }

    #[test]
    fn results_are_score_sorted_descending() {
        let candidates = vec!["cogemt".to_string(), "cogent".to_string(), "cojent".to_string()];
        let results = fuzzy_search("cogent", &candidates, 10, 3);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
