//! Server entrypoint: wires config, cache, resolver, providers, LLM
//! client, and pipeline, then serves the Axum router with a graceful,
//! `CancellationToken`-driven shutdown drain (§5 "Cancellation", §6
//! "Exit / shutdown").

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use lex_api::{create_api_router, init_tracer, observability_middleware, shutdown_tracer, ApiConfig, AppState, TelemetryConfig};
use lex_cache::Cache;
use lex_core::{LexError, LexResult};
use lex_llm::LlmClient;
use lex_providers::{DictionaryApiProvider, DictionaryProvider, ProviderFetcher, ProviderHttp, WiktionaryProvider};
use lex_ratelimit::HostLimits;
use lex_resolver::{normalize_query, ResolverBuilder, VocabularyEntry};

#[tokio::main]
async fn main() -> LexResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let config = load_lex_config()?;
    config.validate()?;

    let cache = Arc::new(Cache::open(&config.cache)?);

    let vocabulary = load_vocabulary(&cache).await?;
    let (resolver, semantic_index) = ResolverBuilder::new()
        .with_entries(vocabulary.clone())
        .with_fuzzy_max_distance(config.resolver.fuzzy_max_distance)
        .with_semantic_threshold(config.resolver.semantic_threshold)
        .build()
        .map_err(LexError::Resolver)?;
    let resolver = Arc::new(resolver);

    let llm = Arc::new(LlmClient::new(config.llm.clone(), Arc::clone(&cache)));

    if config.resolver.semantic_enabled {
        spawn_semantic_index_build(Arc::clone(&semantic_index), vocabulary, Arc::clone(&llm));
    }

    let http_limits = HostLimits {
        requests_per_second: config.providers.per_host_rps,
        max_concurrent: config.providers.per_host_max_concurrent,
    };
    let provider_http = Arc::new(ProviderHttp::new(http_limits));
    let providers = build_providers(&config.providers.selected, Arc::clone(&provider_http));
    let fetcher = Arc::new(ProviderFetcher::new(Arc::clone(&cache), providers));

    let pipeline = Arc::new(lex_pipeline::Pipeline::new(Arc::clone(&cache), Arc::clone(&resolver), fetcher, llm, config.clone()));

    let api_config = ApiConfig::from_env();
    let state = AppState::new(pipeline, resolver, cache, config);
    let shutdown = state.shutdown.clone();

    let app: Router = create_api_router()
        .with_state(state)
        .layer(axum::middleware::from_fn(observability_middleware))
        .layer(cors_layer(&api_config.cors_origins));

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "starting lex-api server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| LexError::Internal(format!("failed to bind {addr}: {e}")))?;

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>());

    tokio::select! {
        result = server => {
            result.map_err(|e| LexError::Internal(format!("server error: {e}")))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, draining in-flight requests");
            shutdown.cancel();
            tokio::time::sleep(api_config.shutdown_drain).await;
        }
    }

    shutdown_tracer();
    Ok(())
}

/// Load behavior configuration. A real deployment would read this from a
/// config file/service named by an env var; absent that plumbing here,
/// the development defaults are used with the API key layered in from
/// the environment (§6 "behavior is always configured through
/// `LexConfig`, never through env vars" — the one exception is the
/// secret itself).
fn load_lex_config() -> LexResult<lex_core::LexConfig> {
    let mut config = lex_core::LexConfig::development();
    if let Ok(key) = std::env::var("LEX_LLM_API_KEY") {
        config.llm.api_key = key;
    }
    Ok(config)
}

/// Empty `cors_origins` means allow any origin (development default);
/// otherwise only the listed origins are reflected back.
fn cors_layer(cors_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(tower_http::cors::Any);
    if cors_origins.is_empty() {
        return layer.allow_origin(tower_http::cors::Any);
    }
    let origins: Vec<HeaderValue> =
        cors_origins.iter().filter_map(|origin| origin.parse().ok()).collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

fn build_providers(selected: &[String], http: Arc<ProviderHttp>) -> Vec<Arc<dyn DictionaryProvider>> {
    selected
        .iter()
        .filter_map(|name| match name.as_str() {
            "dictionary_api" => Some(Arc::new(DictionaryApiProvider::new(Arc::clone(&http))) as Arc<dyn DictionaryProvider>),
            "wiktionary" => Some(Arc::new(WiktionaryProvider::new(Arc::clone(&http))) as Arc<dyn DictionaryProvider>),
            other => {
                tracing::warn!(provider = other, "unknown provider name in providers.selected, skipping");
                None
            }
        })
        .collect()
}

/// The resolver's vocabulary comes from the entry store itself, not a
/// static wordlist (per Open Question 2 in the design notes). The cache
/// has no key-enumeration API (by design — §4.1 namespaces are opaque
/// key/value stores), so a fresh process seeds from `LEX_SEED_WORDS_PATH`
/// (one word per line) when set, and otherwise starts with an empty
/// vocabulary that only the exact/fuzzy cascade covers until the first
/// synthesized entries arrive and a future rebuild (§4.4 "Vocabulary
/// consistency") picks them up.
async fn load_vocabulary(_cache: &Arc<Cache>) -> LexResult<Vec<VocabularyEntry>> {
    let Ok(path) = std::env::var("LEX_SEED_WORDS_PATH") else {
        return Ok(Vec::new());
    };
    let contents = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| LexError::Internal(format!("failed to read LEX_SEED_WORDS_PATH {path}: {e}")))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| VocabularyEntry { normalized: normalize_query(line), canonical: line.to_string(), embedding: None })
        .collect())
}

/// Embed the seed vocabulary and hand it to the semantic index's single
/// initialization slot (§4.4 "at most one initialization task is ever
/// started"). Runs in the background so server startup never blocks on
/// embedding calls.
fn spawn_semantic_index_build(semantic_index: Arc<lex_resolver::SemanticIndex>, vocabulary: Vec<VocabularyEntry>, llm: Arc<LlmClient>) {
    tokio::spawn(async move {
        let result = semantic_index
            .initialize(|| async {
                let mut vectors = Vec::with_capacity(vocabulary.len());
                for entry in &vocabulary {
                    let embedding = llm
                        .embed(&entry.canonical)
                        .await
                        .map_err(|e| lex_core::ResolverError::SemanticNotReady { state: e.to_string() })?;
                    vectors.push((entry.canonical.clone(), embedding));
                }
                Ok(vectors)
            })
            .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, "semantic index build failed, falling back to exact/fuzzy only");
        }
    });
}
