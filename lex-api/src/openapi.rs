//! OpenAPI document assembly (§6 "Observability"/API docs).

use utoipa::OpenApi;

use crate::error::ErrorBody;
use crate::routes::health::{HealthResponse, ReadyResponse};
use crate::routes::lookup::LookupParams;
use crate::routes::search::SearchParams;
use lex_core::{ModelInfo, SynthesizedDefinition, SynthesizedEntry, VersionInfo, Word};
use lex_resolver::{MatchMethod, SearchResult};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "lex API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Multi-method word lookup with LLM-backed definition synthesis, streamed over SSE."
    ),
    tags(
        (name = "Lookup", description = "Word lookup, unary and streaming"),
        (name = "Search", description = "Resolver cascade exposed directly"),
        (name = "Health", description = "Liveness and readiness"),
    ),
    paths(
        crate::routes::lookup::lookup,
        crate::routes::lookup::lookup_stream,
        crate::routes::search::search,
        crate::routes::search::suggestions,
        crate::routes::health::health,
        crate::routes::health::ready,
    ),
    components(schemas(
        SynthesizedEntry,
        SynthesizedDefinition,
        ModelInfo,
        VersionInfo,
        Word,
        SearchResult,
        MatchMethod,
        ErrorBody,
        HealthResponse,
        ReadyResponse,
        LookupParams,
        SearchParams,
    ))
)]
pub struct ApiDoc;
