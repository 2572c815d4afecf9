use anyhow::{Context, Error, Result};
use once_cell::sync::OnceCell;
use opentelemetry::{KeyValue, global, trace::TracerProvider};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracer, SdkTracerProvider},
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "news-check";

static TRACING_INIT: OnceCell<()> = OnceCell::new();
static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var("LOG_FORMAT").ok().as_deref().map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Tracing サブスクライバを一度だけ初期化する。
///
/// `OTEL_EXPORTER_OTLP_ENDPOINT` が設定されていれば OTLP へスパンを送る。
/// エクスポーターの構築に失敗した場合はログ出力のみで続行する。
///
/// # Errors
/// サブスクライバの初期化に失敗した場合はエラーを返す。
pub fn init() -> Result<()> {
    TRACING_INIT.get_or_try_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let format = LogFormat::from_env();
        let json_layer =
            (format == LogFormat::Json).then(|| fmt::layer().with_target(false).json());
        let pretty_layer = (format == LogFormat::Pretty).then(|| fmt::layer());

        let otel_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty());
        let (tracer, otel_error) = match otel_endpoint.as_deref().map(init_tracer) {
            Some(Ok(tracer)) => (Some(tracer), None),
            Some(Err(error)) => (None, Some(error)),
            None => (None, None),
        };
        let otel_enabled = tracer.is_some();
        let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .with(pretty_layer)
            .with(otel_layer)
            .try_init()
            .map_err(|e: tracing_subscriber::util::TryInitError| Error::msg(e.to_string()))?;

        match (otel_endpoint, otel_error) {
            (Some(endpoint), None) => {
                info!(otel_enabled, endpoint = %endpoint, "Tracing initialized with OpenTelemetry");
            }
            (_, Some(error)) => {
                warn!(otel_enabled, error = %error, "Tracing initialized without OpenTelemetry (init failed)");
            }
            (None, None) => info!(otel_enabled, "Standard tracing initialized"),
        }

        Ok::<(), Error>(())
    })?;
    Ok(())
}

/// サンプリング比率は `OTEL_SAMPLING_RATIO`（既定 1.0）で制御する。
fn init_tracer(endpoint: &str) -> Result<SdkTracer> {
    let sampling_ratio = std::env::var("OTEL_SAMPLING_RATIO")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(1.0)
        .clamp(0.0, 1.0);

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("failed to build OTLP span exporter")?;

    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", SERVICE_NAME),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::TraceIdRatioBased(sampling_ratio))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build();

    let tracer = tracer_provider.tracer(SERVICE_NAME);
    global::set_tracer_provider(tracer_provider.clone());
    // init は OnceCell で一度きりなので set が失敗することはない
    let _ = TRACER_PROVIDER.set(tracer_provider);

    Ok(tracer)
}

/// 未送信のスパンをフラッシュしてエクスポーターを閉じる。OTLP 無効時は何もしない。
pub fn shutdown() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(error) = provider.shutdown() {
            eprintln!("failed to shut down tracer provider: {error}");
        }
    }
}
