//! Logging and Span Export
//!
//! Plain `fmt` logging by default; when an OTLP endpoint is configured the
//! same spans are also shipped to a collector.

use opentelemetry::{global, KeyValue};
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, runtime, trace as sdktrace, Resource};
use std::error::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const DEFAULT_FILTER: &str = "fauna_finder=info,tower_http=info";

/// Flushes exported spans when dropped
pub struct OtelGuard {
    exporting: bool,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if self.exporting {
            global::shutdown_tracer_provider();
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Keep the guard alive for the process lifetime.
pub fn init_telemetry(service_name: &str, otlp_endpoint: Option<&str>) -> Result<OtelGuard, Box<dyn Error>> {
    let Some(endpoint) = otlp_endpoint else {
        Registry::default()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
        return Ok(OtelGuard { exporting: false });
    };

    global::set_text_map_propagator(TraceContextPropagator::new());

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .build_span_exporter()?;

    let trace_config = sdktrace::Config::default().with_resource(Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
    ]));

    let provider = sdktrace::TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_config(trace_config)
        .build();

    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(service_name.to_string());
    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);

    Registry::default()
        .with(env_filter())
        .with(telemetry)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;

    Ok(OtelGuard { exporting: true })
}
