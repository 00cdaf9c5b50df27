//! Tracing setup with optional OpenTelemetry export
//!
//! Without telemetry the subscriber comes from `common::logging`. With
//! telemetry enabled an OTLP span exporter is layered on top of the same
//! filter and formatter.

use crate::config::{LogFormat, LoggingSettings, TelemetrySettings};
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource, runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// OpenTelemetry tracer guard
///
/// When dropped, flushes all pending spans and shuts down the tracer
pub struct TelemetryGuard {
    provider: TracerProvider,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Err(e) = self.provider.shutdown() {
            eprintln!("Failed to shut down tracer provider: {e}");
        }
    }
}

/// Build the OTLP tracer provider
///
/// Requires a running tokio runtime for the batch exporter.
pub fn tracer_provider(settings: &TelemetrySettings) -> Result<TracerProvider, common::Error> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(settings.otlp_endpoint.as_str())
        .build()
        .map_err(common::Error::telemetry)?;

    let resource = Resource::new(vec![
        KeyValue::new("service.name", settings.service_name.clone()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ]);

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .build())
}

/// Install the global subscriber
///
/// Returns a guard when OpenTelemetry export is enabled; keep it alive for
/// the duration of the program.
pub fn init_tracing(
    logging: &LoggingSettings,
    telemetry: &TelemetrySettings,
) -> Result<Option<TelemetryGuard>, common::Error> {
    if !telemetry.enabled {
        match logging.format {
            LogFormat::Text => common::logging::init(&logging.level),
            LogFormat::Json => common::logging::init_json(&logging.level),
        }
        tracing::info!("Tracing initialized without OpenTelemetry");
        return Ok(None);
    }

    let provider = tracer_provider(telemetry)?;
    let tracer = provider.tracer("srvmon-server");
    opentelemetry::global::set_tracer_provider(provider.clone());

    let json = logging.format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(common::logging::env_filter(&logging.level))
        .with((!json).then(|| fmt::layer()))
        .with(json.then(|| fmt::layer().json()))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
        .map_err(common::Error::telemetry)?;

    tracing::info!(
        service_name = %telemetry.service_name,
        otlp_endpoint = %telemetry.otlp_endpoint,
        "Tracing initialized with OpenTelemetry integration"
    );

    Ok(Some(TelemetryGuard { provider }))
}
