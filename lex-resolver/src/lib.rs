//! lex-resolver — query normalization and the exact/fuzzy/semantic
//! resolution cascade (§4.4).

mod bloom;
mod cascade;
mod exact;
mod fuzzy;
mod normalize;
mod semantic;
mod vocabulary;

pub use bloom::BloomFilter;
pub use cascade::{Resolver, ResolverBuilder};
pub use exact::ExactIndex;
pub use fuzzy::fuzzy_search;
pub use normalize::normalize_query;
pub use semantic::{SemanticIndex, SemanticState};
pub use vocabulary::{vocabulary_hash, VocabularyEntry};

use lex_core::ResolverError;
use serde::{Deserialize, Serialize};

/// How a `SearchResult` was produced, used for merge precedence
/// (exact > fuzzy > semantic) and for display/debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum MatchMethod {
    Exact,
    Fuzzy,
    Semantic,
}

/// One candidate word produced by the resolution cascade (§4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchResult {
    pub canonical: String,
    pub score: f32,
    pub method: MatchMethod,
}

pub type ResolverResult<T> = Result<T, ResolverError>;
