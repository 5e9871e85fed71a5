//! OpenTelemetry tracer setup (§6 "Observability"), grounded on the
//! teacher's OTLP-over-HTTP init/shutdown pair.

use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, TracerProvider};
use opentelemetry_sdk::Resource;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lex_core::{LexError, LexResult};

/// Telemetry configuration, read from the environment at startup — the
/// only place env vars drive behavior, since everything else comes from
/// `LexConfig` (§6 "Environment variables carry secrets and process-level
/// wiring only").
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    pub trace_sample_rate: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: std::env::var("LEX_OTLP_ENDPOINT").ok(),
            service_name: std::env::var("LEX_SERVICE_NAME").unwrap_or_else(|_| "lex-api".to_string()),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: std::env::var("LEX_ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            trace_sample_rate: std::env::var("LEX_TRACE_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
        }
    }
}

/// Initialize the tracer and the global `tracing` subscriber. Must run
/// once, before any other `tracing` call.
pub fn init_tracer(config: &TelemetryConfig) -> LexResult<()> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", config.service_version.clone()),
        KeyValue::new("deployment.environment", config.environment.clone()),
    ]);

    let sampler = if config.trace_sample_rate >= 1.0 {
        Sampler::AlwaysOn
    } else if config.trace_sample_rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(config.trace_sample_rate)
    };

    let provider_builder = TracerProvider::builder()
        .with_sampler(sampler)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource);

    let tracer_provider = if let Some(endpoint) = &config.otlp_endpoint {
        let exporter = SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| LexError::Internal(format!("failed to build OTLP exporter: {e}")))?;
        provider_builder
            .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
            .build()
    } else {
        provider_builder.build()
    };

    let tracer = tracer_provider.tracer("lex-api");
    global::set_tracer_provider(tracer_provider);

    let otel_layer = OpenTelemetryLayer::new(tracer);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lex_api=debug,tower_http=debug,info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .with(otel_layer)
        .try_init()
        .map_err(|e| LexError::Internal(format!("failed to init tracing subscriber: {e}")))?;

    tracing::info!(
        service_name = config.service_name,
        environment = config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        "telemetry initialized"
    );
    Ok(())
}

pub fn shutdown_tracer() {
    global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_samples_everything_with_no_endpoint() {
        std::env::remove_var("LEX_OTLP_ENDPOINT");
        std::env::remove_var("LEX_TRACE_SAMPLE_RATE");
        let config = TelemetryConfig::default();
        assert_eq!(config.trace_sample_rate, 1.0);
        assert!(config.otlp_endpoint.is_none());
    }
}
