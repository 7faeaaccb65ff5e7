//! Exportação OTLP/HTTP de traces e métricas. Os instrumentos de hop vivem em
//! `obs::wrap` e passam a exportar assim que os providers globais existem.
use anyhow::Result;
use std::time::Duration;

use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    metrics::{PeriodicReader, SdkMeterProvider},
    resource::Resource,
    trace::SdkTracerProvider,
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, Registry};

use crate::obs::tracingx::filter_from_env;

pub const ENV_COMMIT_SHA: &str = "BND_COMMIT_SHA";
pub const ENV_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
pub(crate) const INSTRUMENTATION: &str = "bonding_router";
const DEFAULT_ENDPOINT: &str = "http://localhost:4318";
const METRIC_INTERVAL: Duration = Duration::from_secs(10);

/// Providers instalados por [`init`]; chame `shutdown` antes de sair.
pub struct Telemetry {
    pub tracer_provider: SdkTracerProvider,
    pub meter_provider: SdkMeterProvider,
}

impl Telemetry {
    pub fn shutdown(&self) {
        let _ = self.meter_provider.force_flush();
        let _ = self.tracer_provider.shutdown();
    }
}

fn commit_sha() -> String {
    std::env::var(ENV_COMMIT_SHA).unwrap_or_else(|_| "unknown".into())
}

fn resource(service_name: &str) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", service_name.to_string()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("git.commit.sha", commit_sha()),
        ])
        .build()
}

fn tracer_provider(endpoint: &str, resource: Resource) -> Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder().with_http().with_endpoint(endpoint).build()?;
    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build())
}

fn meter_provider(endpoint: &str, resource: Resource) -> Result<SdkMeterProvider> {
    let exporter = MetricExporter::builder().with_http().with_endpoint(endpoint).build()?;
    let reader = PeriodicReader::builder(exporter).with_interval(METRIC_INTERVAL).build();
    Ok(SdkMeterProvider::builder().with_resource(resource).with_reader(reader).build())
}

/// Instala providers globais e o subscriber `fmt + otel`.
/// Um subscriber global pré-existente é mantido.
pub fn init(service_name: &str) -> Result<Telemetry> {
    let endpoint = std::env::var(ENV_OTLP_ENDPOINT).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
    let resource = resource(service_name);

    let tracer_provider = tracer_provider(&endpoint, resource.clone())?;
    let meter_provider = meter_provider(&endpoint, resource)?;
    global::set_tracer_provider(tracer_provider.clone());
    global::set_meter_provider(meter_provider.clone());

    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer(INSTRUMENTATION));
    let subscriber = Registry::default()
        .with(filter_from_env())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(otel_layer);
    let _ = tracing::subscriber::set_global_default(subscriber);

    Ok(Telemetry { tracer_provider, meter_provider })
}

/// Span INFO de nome fixo `op`; o nome dinâmico vai em `span_name`
/// junto do `git_commit_sha`.
pub fn make_info_span(name: &str, op_id: u32, component: &str) -> tracing::Span {
    tracing::span!(
        target: "bonding_router",
        Level::INFO,
        "op",
        git_commit_sha = %commit_sha(),
        span_name = %name,
        op_id = op_id,
        component = component
    )
}

/// Contador de fumaça: prova que o pipeline de métricas exporta algo.
pub fn bump_test_metric() {
    let counter = global::meter(INSTRUMENTATION).u64_counter("telemetry_smoke_total").build();
    counter.add(1, &[KeyValue::new("source", "telemetry_smoke")]);
}
