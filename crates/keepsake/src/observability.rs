//! Logging and optional OpenTelemetry setup for the binary.

use keepsake_pipeline::LoggingConfig;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Settings for the tracing subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Service name for telemetry attribution
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON lines instead of text
    pub json_logs: bool,
}

impl ObservabilityConfig {
    /// Create a configuration for `service_name` at `info`.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Take level and format from the `[logging]` section.
    pub fn from_logging(logging: &LoggingConfig) -> Self {
        Self::default()
            .with_log_level(logging.level())
            .with_json_logs(*logging.json())
    }

    /// Set the service version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON-formatted logs.
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// `RUST_LOG` if set, otherwise the configured level.
    ///
    /// # Errors
    ///
    /// Fails when the configured level is not a valid directive.
    pub fn env_filter(&self) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&self.log_level))
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

/// Install the global subscriber.
///
/// Always installs an `EnvFilter` and a text or JSON `fmt` layer. With the
/// `observability` feature, spans are also exported to stdout through
/// OpenTelemetry.
///
/// # Errors
///
/// Fails on an invalid log level or when a global subscriber is already set.
pub fn init_observability_with_config(
    config: ObservabilityConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = config.env_filter()?;

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    #[cfg(feature = "observability")]
    registry.with(otel::layer(&config)).try_init()?;

    #[cfg(not(feature = "observability"))]
    registry.try_init()?;

    Ok(())
}

/// Flush exported spans.
///
/// A no-op unless the `observability` feature installed a tracer provider.
pub fn shutdown_observability() {
    #[cfg(feature = "observability")]
    otel::shutdown();
}

#[cfg(feature = "observability")]
mod otel {
    use super::ObservabilityConfig;
    use opentelemetry::{KeyValue, global, trace::TracerProvider};
    use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
    use opentelemetry_stdout::SpanExporter;
    use std::sync::OnceLock;
    use tracing::Subscriber;
    use tracing_subscriber::registry::LookupSpan;

    static PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

    pub(super) fn layer<S>(
        config: &ObservabilityConfig,
    ) -> tracing_opentelemetry::OpenTelemetryLayer<S, opentelemetry_sdk::trace::Tracer>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        let resource = Resource::builder()
            .with_service_name(config.service_name.clone())
            .with_attributes(vec![KeyValue::new(
                "service.version",
                config.service_version.clone(),
            )])
            .build();

        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(SpanExporter::default())
            .with_resource(resource)
            .build();

        global::set_tracer_provider(provider.clone());
        let tracer = provider.tracer(config.service_name.clone());
        let _ = PROVIDER.set(provider);

        tracing_opentelemetry::layer().with_tracer(tracer)
    }

    pub(super) fn shutdown() {
        if let Some(provider) = PROVIDER.get() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to flush spans: {}", e);
            }
        }
    }
}
