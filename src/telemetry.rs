//! Tracing subscriber setup.
//!
//! [`Telemetry::new`] installs a `tracing-subscriber` registry with an `EnvFilter`
//! (`RUST_LOG`, defaulting to `info`) and a fmt layer. Built with the `telemetry`
//! feature, and when any `OTEL_EXPORTER_OTLP_*` variable is set, spans are also exported
//! over OTLP. Keep the returned value alive for the lifetime of the process: dropping it
//! flushes and shuts the exporter down.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "telemetry")]
mod otlp {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{
        Resource,
        trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
    };
    use opentelemetry_semantic_conventions::{
        SCHEMA_URL,
        attribute::{DEPLOYMENT_ENVIRONMENT_NAME, SERVICE_VERSION},
    };
    use std::env;

    /// OTLP transport, from `OTEL_EXPORTER_OTLP_PROTOCOL`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Protocol {
        Http,
        Grpc,
    }

    impl Protocol {
        /// `None` unless OTLP export is configured in the environment.
        pub fn from_env() -> Option<Self> {
            let enabled = ["OTEL_EXPORTER_OTLP_ENDPOINT", "OTEL_EXPORTER_OTLP_HEADERS", "OTEL_EXPORTER_OTLP_PROTOCOL"]
                .iter()
                .any(|var| env::var(var).is_ok());
            if !enabled {
                return None;
            }
            let protocol = match env::var("OTEL_EXPORTER_OTLP_PROTOCOL").as_deref() {
                Ok("grpc") => Protocol::Grpc,
                _ => Protocol::Http,
            };
            Some(protocol)
        }
    }

    fn resource() -> Resource {
        let deployment_env = env::var("DEPLOYMENT_ENV").unwrap_or_else(|_| "develop".to_string());
        Resource::builder()
            .with_service_name(env!("CARGO_PKG_NAME"))
            .with_schema_url(
                [
                    KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
                    KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, deployment_env),
                ],
                SCHEMA_URL,
            )
            .build()
    }

    pub fn tracer_provider(
        protocol: Protocol,
    ) -> Result<SdkTracerProvider, opentelemetry_otlp::ExporterBuildError> {
        let exporter = opentelemetry_otlp::SpanExporter::builder();
        let exporter = match protocol {
            Protocol::Http => exporter.with_http().build()?,
            Protocol::Grpc => exporter.with_tonic().build()?,
        };
        Ok(SdkTracerProvider::builder()
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(resource())
            .with_batch_exporter(exporter)
            .build())
    }
}

/// Installed subscriber; shuts the span exporter down on drop.
pub struct Telemetry {
    #[cfg(feature = "telemetry")]
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

impl Telemetry {
    /// Installs the global subscriber. Does nothing if one is already installed.
    #[cfg(not(feature = "telemetry"))]
    pub fn new() -> Self {
        let _ = tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer())
            .try_init();
        Self {}
    }

    /// Installs the global subscriber. Does nothing if one is already installed.
    #[cfg(feature = "telemetry")]
    pub fn new() -> Self {
        use opentelemetry::trace::TracerProvider as _;
        use tracing_opentelemetry::OpenTelemetryLayer;

        let provider = match otlp::Protocol::from_env().map(otlp::tracer_provider) {
            None => None,
            Some(Ok(provider)) => Some(provider),
            Some(Err(err)) => {
                eprintln!("OTLP span exporter unavailable, logging locally only: {err}");
                None
            }
        };
        let otel_layer = provider
            .as_ref()
            .map(|provider| OpenTelemetryLayer::new(provider.tracer("reqnet")));
        let installed = tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer())
            .with(otel_layer)
            .try_init()
            .is_ok();
        if installed && provider.is_some() {
            tracing::info!("OpenTelemetry span export is enabled");
        }
        Self {
            tracer_provider: provider,
        }
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        #[cfg(feature = "telemetry")]
        if let Some(tracer_provider) = self.tracer_provider.as_ref() {
            if let Err(err) = tracer_provider.shutdown() {
                eprintln!("{err:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_install_is_harmless() {
        let first = Telemetry::new();
        let second = Telemetry::new();
        tracing::info!("subscriber installed");
        drop(second);
        drop(first);
    }
}
