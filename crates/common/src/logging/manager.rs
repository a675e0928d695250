//! Logging initialization and shutdown.

use std::sync::OnceLock;

use opentelemetry::{global, trace::TracerProvider};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    runtime::Tokio,
    trace::{Config, TracerProvider as SdkTracerProvider},
};
use thiserror::Error;
use tracing::*;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    filter::Directive, fmt::layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use super::types::LoggerConfig;

/// Noisy transport crates are capped at WARN unless RUST_LOG says otherwise.
const QUIET_TARGETS: &[&str] = &[
    "hyper=warn",
    "jsonrpsee=warn",
    "tungstenite=warn",
    "tokio_tungstenite=warn",
];

/// Kept so [`finalize`] can flush pending spans.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("otlp pipeline: {0}")]
    Otlp(#[from] opentelemetry::trace::TraceError),

    #[error("subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

fn env_filter() -> EnvFilter {
    QUIET_TARGETS.iter().fold(
        EnvFilter::builder()
            .with_default_directive(Level::INFO.into())
            .from_env_lossy(),
        |filt, d| match d.parse::<Directive>() {
            Ok(d) => filt.add_directive(d),
            Err(_) => filt,
        },
    )
}

/// Initializes the global subscriber. Must be called from within a tokio
/// runtime when an OTLP endpoint is configured.
pub fn init(config: LoggerConfig) -> Result<(), LoggingError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let filt = env_filter();

    let stdout_sub = if config.stdout_config.json_format {
        layer()
            .json()
            .with_span_events(config.stdout_config.fmt_span.clone())
            .with_filter(filt.clone())
            .boxed()
    } else {
        layer()
            .compact()
            .with_span_events(config.stdout_config.fmt_span.clone())
            .with_filter(filt.clone())
            .boxed()
    };

    let file_layer = config.file_logging_config.as_ref().map(|file_config| {
        let file_appender = RollingFileAppender::new(
            file_config.rotation.clone(),
            &file_config.directory,
            &file_config.file_name_prefix,
        );

        if file_config.json_format {
            layer()
                .json()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(filt.clone())
                .boxed()
        } else {
            layer()
                .compact()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(filt.clone())
                .boxed()
        }
    });

    let otel_layer = match &config.otel_url {
        Some(otel_url) => {
            let trace_config = Config::default().with_resource(config.resource.build_resource());

            let exporter = opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(otel_url)
                .with_timeout(config.otlp_timeout);

            let tp = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(exporter)
                .with_trace_config(trace_config)
                .install_batch(Tokio)?;

            let tt = tp.tracer("hubclient-tracer");
            let _ = TRACER_PROVIDER.set(tp);
            Some(tracing_opentelemetry::layer().with_tracer(tt))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_sub)
        .with(file_layer)
        .with(otel_layer)
        .try_init()?;

    info!(
        service_name = %config.resource.service_name,
        otlp = config.otel_url.is_some(),
        file = config.file_logging_config.is_some(),
        "logging initialized"
    );
    Ok(())
}

/// Flushes pending spans and tears down the tracer provider.
pub fn finalize() {
    info!("shutting down logging");

    match TRACER_PROVIDER.get() {
        Some(provider) => {
            if let Err(e) = provider.shutdown() {
                error!(%e, "failed to shut down tracer provider");
            }
        }
        None => debug!("no tracer provider to shut down"),
    }

    global::shutdown_tracer_provider();
}
