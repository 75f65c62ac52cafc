//! Tracing setup with optional OpenTelemetry export.
//!
//! `init_telemetry()` installs the subscriber and `shutdown_telemetry()` flushes it.
//! When `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans are exported via OTLP.
//! Otherwise, only console logging is enabled.

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_SERVICE_NAME: &str = "pushsync";

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Service name reported in exported spans.
///
/// Reads `OTEL_SERVICE_NAME`, falling back to "pushsync".
pub fn service_name() -> String {
    std::env::var("OTEL_SERVICE_NAME")
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string())
}

/// Initialize telemetry with optional OTLP export.
///
/// # Environment Variables
/// - `RUST_LOG`: filter directives on top of the INFO default
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint URL (enables export when set)
/// - `OTEL_SERVICE_NAME`: Service name in traces (default: "pushsync")
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&endpoint)
            .build()?;

        let service_name = service_name();
        let tracer_provider = SdkTracerProvider::builder()
            .with_resource(
                Resource::builder()
                    .with_service_name(service_name.clone())
                    .build(),
            )
            .with_batch_exporter(exporter)
            .build();

        // Kept for shutdown
        let _ = TRACER_PROVIDER.set(tracer_provider.clone());

        let tracer = tracer_provider.tracer(service_name);
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();

        tracing::info!(endpoint = %endpoint, "OpenTelemetry OTLP export enabled");
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }

    Ok(())
}

/// Flush pending spans. Call once during graceful shutdown.
pub fn shutdown_telemetry() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Error shutting down tracer provider: {:?}", e);
        }
    }
}
