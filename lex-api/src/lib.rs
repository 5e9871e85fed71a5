//! Axum HTTP/SSE transport for the lookup pipeline (§6 "External
//! interfaces"): unary and streaming lookup, direct resolver search,
//! health/readiness, metrics, and (optionally) OpenAPI/Swagger docs.

mod config;
mod error;
#[cfg(feature = "openapi")]
mod openapi;
mod routes;
mod sse;
mod state;
mod telemetry;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorBody};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
pub use telemetry::{init_tracer, metrics_handler, shutdown_tracer, observability_middleware, TelemetryConfig, METRICS};
