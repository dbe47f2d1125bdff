/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Cinder Telemetry Module
//!
//! Installs the process-wide `tracing` subscriber: an `EnvFilter`, a text or
//! JSON formatting layer, and, when enabled, an OpenTelemetry layer exporting
//! spans over OTLP.
//!
//! ```rust,ignore
//! use cinder_utils::{telemetry, Settings};
//!
//! let settings = Settings::new(None)?;
//! telemetry::init(&settings.telemetry, &settings.log.level, &settings.log.format)?;
//! tracing::info!("engine started");
//! ```

use crate::config::Telemetry;
use opentelemetry::trace::TracerProvider;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::Sampler;
use opentelemetry_sdk::{runtime, Resource};
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Raised when the tracing pipeline cannot be installed.
#[derive(Debug)]
pub enum TelemetryError {
    /// The OTLP span exporter could not be built.
    ExporterError(String),
    /// A global subscriber was already installed.
    SubscriberError(String),
}

impl std::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelemetryError::ExporterError(e) => write!(f, "Failed to build OTLP exporter: {}", e),
            TelemetryError::SubscriberError(e) => write!(f, "Failed to install subscriber: {}", e),
        }
    }
}

impl std::error::Error for TelemetryError {}

/// Maps a configured sampling rate onto an OpenTelemetry sampler.
pub fn sampler_for(rate: f64) -> Sampler {
    if rate >= 1.0 {
        Sampler::AlwaysOn
    } else if rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(rate)
    }
}

fn install<S>(subscriber: S, log_format: &str) -> Result<(), TelemetryError>
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
{
    if log_format.eq_ignore_ascii_case("json") {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| TelemetryError::SubscriberError(e.to_string()))
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| TelemetryError::SubscriberError(e.to_string()))
    }
}

/// Installs the global subscriber for the engine.
///
/// `RUST_LOG` takes precedence over `log_level` when set. When telemetry is
/// disabled only the formatting layer is installed.
///
/// Must be called from within a tokio runtime when telemetry is enabled; the
/// batch exporter spawns onto it.
pub fn init(config: &Telemetry, log_level: &str, log_format: &str) -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if !config.enabled {
        return install(tracing_subscriber::registry().with(env_filter), log_format);
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
        .map_err(|e| TelemetryError::ExporterError(e.to_string()))?;

    let tracer_provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_sampler(sampler_for(config.sampling_rate))
        .with_resource(Resource::new(vec![
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                config.service_name.clone(),
            ),
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            ),
        ]))
        .build();

    let tracer = tracer_provider.tracer(config.service_name.clone());
    opentelemetry::global::set_tracer_provider(tracer_provider);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_opentelemetry::layer().with_tracer(tracer));

    install(subscriber, log_format)
}

/// Flushes buffered spans and drops the global tracer provider.
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}

/// Logging macros used across the workspace.
pub mod prelude {
    pub use tracing::Instrument;
    pub use tracing::{debug, error, info, trace, warn};
    pub use tracing::{instrument, span, Level};
}
