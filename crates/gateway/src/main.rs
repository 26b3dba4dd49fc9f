use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};

use lumen_domain::config::{Config, ConfigSeverity};
use lumen_functions::FunctionRegistry;
use lumen_engine::cli::{Cli, Command, ConfigCommand};
use lumen_engine::event_sink::LoggingEventSink;
use lumen_engine::http::{self, AppState};
use lumen_engine::pipeline::Pipeline;
use lumen_providers::FlashProvider;
use lumen_sessions::SessionManager;
use lumen_store::FileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            let (config, _config_path) = lumen_engine::cli::load_config()?;
            let _otel = init_tracing();
            run_server(Arc::new(config)).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = lumen_engine::cli::load_config()?;
            let valid = lumen_engine::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = lumen_engine::cli::load_config()?;
            lumen_engine::cli::config::show(&config);
            Ok(())
        }
        Some(Command::Version) => {
            println!("lumen {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Install the process-wide tracing subscriber: structured JSON logs via
/// `tracing-subscriber`, honoring `RUST_LOG` through an `EnvFilter`, plus an
/// optional OpenTelemetry export layer. Export is enabled only when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set, so the binary runs on local logs
/// alone by default. Returns the tracer provider so the caller can keep it
/// alive for the process lifetime (dropping it stops the exporter).
fn init_tracing() -> Option<SdkTracerProvider> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lumen_engine=debug"));
    let fmt_layer = tracing_subscriber::fmt::layer().json();

    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        Registry::default()
            .with(filter)
            .with(fmt_layer)
            .init();
        return None;
    };

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("OTLP exporter init failed ({e}), falling back to local logs only");
            Registry::default().with(filter).with(fmt_layer).init();
            return None;
        }
    };

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();
    let tracer = provider.tracer("lumen");

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .with(OpenTelemetryLayer::new(tracer))
        .init();

    Some(provider)
}

/// Start the gateway server with the given configuration.
async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("lumen starting");

    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Persistence + turn source ────────────────────────────────────
    let data_dir = std::env::var("LUMEN_DATA_DIR").unwrap_or_else(|_| "./data".into());
    let store = Arc::new(FileStore::new(&data_dir).context("initializing file store")?);
    tracing::info!(path = %data_dir, "file store ready");

    // ── LLM provider ─────────────────────────────────────────────────
    let provider = Arc::new(
        FlashProvider::from_config(&config.llm).context("initializing LLM provider")?,
    );
    tracing::info!(model = %config.llm.model_name, "LLM provider ready");

    // ── Function registry ───────────────────────────────────────────
    let functions = Arc::new(FunctionRegistry::new());
    tracing::info!("function registry ready");

    // ── Session manager + pipeline ──────────────────────────────────
    let manager = Arc::new(SessionManager::new(
        store.clone(),
        store.clone(),
        &config.sessions,
        &config.persistence,
    ));
    let pipeline = Arc::new(Pipeline::new(
        provider,
        functions,
        config.classifier.clone(),
        config.llm.clone(),
    ));
    tracing::info!("session manager + pipeline ready");

    // ── Periodic TTL sweep ───────────────────────────────────────────
    {
        let manager = manager.clone();
        let sweep_interval = config.sessions.sweep_interval_seconds.max(1);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(sweep_interval));
            loop {
                interval.tick().await;
                manager.sweep().await;
            }
        });
    }
    tracing::info!(interval_secs = config.sessions.sweep_interval_seconds, "session sweep started");

    // ── Router ───────────────────────────────────────────────────────
    let state = Arc::new(AppState {
        manager,
        store,
        pipeline,
        event_sink: Arc::new(LoggingEventSink),
    });
    let app = http::router(state);

    // ── Bind ─────────────────────────────────────────────────────────
    let host = std::env::var("LUMEN_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("LUMEN_PORT").unwrap_or_else(|_| "8080".into());
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "lumen listening");

    axum::serve(listener, app).await.context("axum server error")?;

    Ok(())
}
