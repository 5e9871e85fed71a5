//! Prometheus metrics (§6 "Observability" — `/metrics` endpoint): a
//! `Lazy`-initialized registry of counters/histograms/gauges for this
//! service's own stages (lookups, cache, providers, LLM calls).

use axum::http::StatusCode;
use axum::response::IntoResponse;
use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge, HistogramVec, TextEncoder};

use lex_core::{LexError, LexResult};

const HTTP_LATENCY_BUCKETS: &[f64] = &[0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0];

pub static METRICS: Lazy<LexResult<LexMetrics>> = Lazy::new(LexMetrics::new);

#[derive(Clone)]
pub struct LexMetrics {
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub lookups_total: CounterVec,
    pub cache_operations_total: CounterVec,
    pub provider_fetches_total: CounterVec,
    pub llm_calls_total: CounterVec,
    pub resolver_searches_total: CounterVec,
    pub active_lookups: Gauge,
}

impl LexMetrics {
    pub fn new() -> LexResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!("lex_http_requests_total", "Total HTTP requests", &["method", "path", "status"])
                .map_err(metric_err)?,
            http_request_duration_seconds: register_histogram_vec!(
                "lex_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(metric_err)?,
            lookups_total: register_counter_vec!("lex_lookups_total", "Total word lookups", &["origin", "outcome"]).map_err(metric_err)?,
            cache_operations_total: register_counter_vec!("lex_cache_operations_total", "Cache get/put operations", &["namespace", "outcome"])
                .map_err(metric_err)?,
            provider_fetches_total: register_counter_vec!("lex_provider_fetches_total", "Dictionary provider fetches", &["provider", "status"])
                .map_err(metric_err)?,
            llm_calls_total: register_counter_vec!("lex_llm_calls_total", "LLM RPC calls", &["tier", "outcome"]).map_err(metric_err)?,
            resolver_searches_total: register_counter_vec!("lex_resolver_searches_total", "Resolver cascade invocations", &["method"])
                .map_err(metric_err)?,
            active_lookups: register_gauge!("lex_active_lookups", "Lookups currently in flight").map_err(metric_err)?,
        })
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total.with_label_values(&[method, path, &status_str]).inc();
        self.http_request_duration_seconds.with_label_values(&[method, path]).observe(duration_secs);
    }

    pub fn record_lookup(&self, origin: &str, outcome: &str) {
        self.lookups_total.with_label_values(&[origin, outcome]).inc();
    }

    pub fn record_cache_operation(&self, namespace: &str, outcome: &str) {
        self.cache_operations_total.with_label_values(&[namespace, outcome]).inc();
    }

    pub fn record_provider_fetch(&self, provider: &str, status: &str) {
        self.provider_fetches_total.with_label_values(&[provider, status]).inc();
    }

    pub fn record_llm_call(&self, tier: &str, outcome: &str) {
        self.llm_calls_total.with_label_values(&[tier, outcome]).inc();
    }

    pub fn record_resolver_search(&self, method: &str) {
        self.resolver_searches_total.with_label_values(&[method]).inc();
    }
}

impl Default for LexMetrics {
    fn default() -> Self {
        Self::new().expect("metrics registration must succeed")
    }
}

fn metric_err(e: prometheus::Error) -> LexError {
    LexError::Internal(format!("failed to register metric: {e}"))
}

/// `GET /metrics` — Prometheus text exposition (§6).
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (StatusCode::OK, [("content-type", "text/plain; version=0.0.4; charset=utf-8")], buffer).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("failed to encode metrics: {e}")).into_response(),
    }
}
