//! Churn Prediction Service - Main Entry Point
//!
//! Loads the churn model, then serves predictions over HTTP and appends
//! every scored request to the audit log.

use anyhow::Result;
use churn_prediction_service::{
    api,
    audit::AuditLogger,
    config::{AppConfig, LogFormat, LoggingConfig},
    metrics::{MetricsReporter, ServiceMetrics},
    models::{ModelHandle, ModelLoader},
    pipeline::PredictionService,
    state::AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!(
            "churn_prediction_service={level},tower_http={level}",
            level = config.level
        ))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Churn Prediction Service");
    info!(
        candidates = ?config.model.candidate_paths,
        audit_log = %config.audit_log_path().display(),
        "Configuration loaded"
    );

    let handle = ModelHandle::unloaded();
    let loader = ModelLoader::with_threads(config.model.onnx_threads);
    let candidates = config.model.candidate_paths.clone();

    // Fail-fast mode never accepts traffic without a model
    if config.model.fail_fast {
        let model = loader.load_first(&candidates)?;
        handle
            .install(model)
            .map_err(|e| anyhow::anyhow!("Model install failed: {}", e))?;
    }

    let metrics = Arc::new(ServiceMetrics::new());
    let audit = Arc::new(AuditLogger::new(&config.audit.log_dir, &config.audit.file_name));
    let service = PredictionService::new(handle.clone(), audit, metrics.clone());

    let reporter = MetricsReporter::new(metrics, config.server.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::new(service, config);
    let app = api::app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    // Otherwise load in the background; requests get 503 until ready
    if !handle.is_loaded() {
        let handle = handle.clone();
        tokio::task::spawn_blocking(move || match loader.load_first(&candidates) {
            Ok(model) => {
                let source = model.source().to_string();
                match handle.install(model) {
                    Ok(()) => info!(source = %source, "Model ready, accepting predictions"),
                    Err(e) => warn!(error = %e, "Model install skipped"),
                }
            }
            Err(e) => error!(
                error = %format!("{:#}", e),
                "No model loaded; prediction endpoints will return 503"
            ),
        });
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Service shutting down...");
    Ok(())
}
