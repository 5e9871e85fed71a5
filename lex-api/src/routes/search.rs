//! `GET /search` — resolver cascade exposed directly, without synthesis
//! (§6 "HTTP search / suggestions").

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use lex_resolver::SearchResult;
use serde::Deserialize;

use crate::state::AppState;

/// §4.4 only names "top-k"; these pick concrete defaults for it.
const DEFAULT_MAX_RESULTS: usize = 10;
const MAX_MAX_RESULTS: usize = 50;

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct SearchParams {
    pub q: String,
    pub max_results: Option<usize>,
}

/// `GET /search?q=...` → ranked candidates from the exact/fuzzy/semantic
/// cascade (§4.4). Semantic search is only consulted when the resolver's
/// index is ready; this endpoint never blocks on it.
#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/search", tag = "Search",
    params(SearchParams),
    responses((status = 200, description = "Ranked candidates", body = [SearchResult]))))]
pub(crate) async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> impl IntoResponse {
    let max_results = params.max_results.unwrap_or(DEFAULT_MAX_RESULTS).min(MAX_MAX_RESULTS).max(1);
    let results: Vec<SearchResult> = state.resolver.resolve(&params.q, max_results, None);
    Json(results)
}

/// `GET /search/{q}/suggestions` → bare canonical-word strings, the
/// compact shape used by typeahead callers that don't need score/method
/// (§6 "`GET /search/{q}/suggestions` → array of strings").
#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/search/:q/suggestions", tag = "Search",
    params(("q" = String, Path)),
    responses((status = 200, description = "Suggested canonical words", body = [String]))))]
pub(crate) async fn suggestions(State(state): State<AppState>, Path(q): Path<String>) -> impl IntoResponse {
    let results = state.resolver.resolve(&q, DEFAULT_MAX_RESULTS, None);
    let words: Vec<String> = results.into_iter().map(|r| r.canonical).collect();
    Json(words)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/search/:q/suggestions", get(suggestions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(resolver: Arc<lex_resolver::Resolver>) -> Router {
        let cache = lex_test_utils::test_cache().cache;
        let fetcher = lex_test_utils::test_fetcher(Arc::clone(&cache), vec![]);
        let llm = lex_test_utils::test_llm(Arc::clone(&cache));
        let pipeline = Arc::new(lex_pipeline::Pipeline::new(
            Arc::clone(&cache),
            Arc::clone(&resolver),
            fetcher,
            llm,
            lex_core::LexConfig::development(),
        ));
        let state = AppState::new(pipeline, resolver, cache, lex_core::LexConfig::development());
        Router::new().merge(router()).with_state(state)
    }

    #[tokio::test]
    async fn search_returns_fuzzy_match_for_misspelling() {
        let resolver = lex_test_utils::test_resolver(&["cogent", "ephemeral"]);
        let router = app(resolver);

        let req = Request::get("/search?q=cogant").body(Body::empty()).unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let results: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();
        assert!(results.iter().any(|r| r["canonical"] == "cogent"));
    }

    #[tokio::test]
    async fn search_clamps_max_results_to_upper_bound() {
        let resolver = lex_test_utils::test_resolver(&["cogent"]);
        let router = app(resolver);

        let req = Request::get("/search?q=cogent&max_results=9999").body(Body::empty()).unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn suggestions_endpoint_returns_bare_word_strings() {
        let resolver = lex_test_utils::test_resolver(&["cogent", "ephemeral"]);
        let router = app(resolver);

        let req = Request::get("/search/cogant/suggestions").body(Body::empty()).unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let words: Vec<String> = serde_json::from_slice(&bytes).unwrap();
        assert!(words.contains(&"cogent".to_string()));
    }
}
