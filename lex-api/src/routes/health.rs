//! `/health`, `/ready` — liveness and readiness, the latter observing
//! §4.4's resolver-readiness state machine.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReadyResponse {
    pub ready: bool,
    pub semantic_search: String,
    pub shutting_down: bool,
}

/// `GET /health` — liveness only; never reflects downstream state.
#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/health", tag = "Health",
    responses((status = 200, description = "Process is alive", body = HealthResponse))))]
pub(crate) async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// `GET /ready` — readiness, reflecting the resolver's semantic-index
/// state machine (§4.4) and whether graceful shutdown has begun (§6).
#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/ready", tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is shutting down or not ready", body = ReadyResponse),
    )))]
pub(crate) async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let semantic_state = state.resolver.semantic_index().state();
    let shutting_down = state.is_shutting_down();

    let response = ReadyResponse {
        ready: !shutting_down,
        semantic_search: format!("{semantic_state:?}"),
        shutting_down,
    };

    let status = if shutting_down { StatusCode::SERVICE_UNAVAILABLE } else { StatusCode::OK };
    (status, Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health)).route("/ready", get(ready))
}
