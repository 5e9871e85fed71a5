//! Observability: tracing + Prometheus metrics for the HTTP layer (§6).

mod metrics;
mod middleware;
mod tracer;

pub use metrics::{metrics_handler, LexMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracer, shutdown_tracer, TelemetryConfig};
