//! Per-request tracing span + Prometheus recording, grounded on the
//! teacher's `observability_middleware` (trace-context extraction plus
//! path normalization to avoid label cardinality blowup).

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::middleware::Next;
use axum::response::Response;
use opentelemetry::propagation::Extractor;
use opentelemetry::{global, Context};
use tracing::{info_span, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::metrics::METRICS;

struct HeaderMapExtractor<'a>(&'a axum::http::HeaderMap);

impl Extractor for HeaderMapExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

fn extract_trace_context(headers: &axum::http::HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderMapExtractor(headers)))
}

/// Replace `/lookup/serendipity` with `/lookup/{word}` so per-word labels
/// never accumulate unbounded Prometheus series.
fn normalize_path(path: &str) -> String {
    static WORD_SEGMENT: OnceLock<regex::Regex> = OnceLock::new();
    let regex = WORD_SEGMENT.get_or_init(|| regex::Regex::new(r"/(lookup|search)/[^/]+").expect("static regex"));
    regex.replace(path, "/$1/{word}").to_string()
}

pub async fn observability_middleware(request: axum::http::Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let normalized_path = normalize_path(&path);
    let parent_context = extract_trace_context(request.headers());

    let span = info_span!("http_request", http.method = %method, http.target = %normalized_path);
    span.set_parent(parent_context);

    let response = next.run(request).instrument(span).await;

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_http_request(method.as_str(), &normalized_path, status, duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_word_segments_out_of_lookup_and_search_paths() {
        assert_eq!(normalize_path("/lookup/serendipity"), "/lookup/{word}");
        assert_eq!(normalize_path("/search/cogant/suggestions"), "/search/{word}/suggestions");
        assert_eq!(normalize_path("/health"), "/health");
    }
}
