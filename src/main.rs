//! Glycosense: diabetes risk prediction service
//!
//! Main entry point for the HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use glycosense::adapters::http;
use glycosense::adapters::loader::LoadedModels;
use glycosense::adapters::sanitize::SanitizingMakeWriter;
use glycosense::application::InferenceService;
use glycosense::config::{config_path_from_args, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    //
    // Default is stdout (container friendly); GLYCOSENSE_LOG_MODE=file appends
    // to GLYCOSENSE_LOG_FILE instead.
    let log_mode = std::env::var("GLYCOSENSE_LOG_MODE").unwrap_or_else(|_| "stdout".to_string());

    let (writer, _guard) = if log_mode == "file" {
        let log_file = std::env::var("GLYCOSENSE_LOG_FILE")
            .unwrap_or_else(|_| "glycosense.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: a missing directory surfaces as the open error below.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("failed to open log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting Glycosense...");

    let config_path = config_path_from_args();
    if config_path.is_none() {
        tracing::info!("No config file specified, using defaults and environment");
    }
    let config = Config::load(config_path.as_deref()).context("invalid configuration")?;
    let listen_addr = config.socket_addr()?;

    let models = LoadedModels::load(&config).context("failed to load models")?;
    let service = Arc::new(InferenceService::new(
        models.forest,
        models.network,
        config.tie_break,
    ));
    tracing::info!(tie_break = service.tie_break().as_str(), "Models ready");

    let app = http::router(service, config.body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    tracing::info!(%listen_addr, "Glycosense listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Glycosense shutdown complete.");
    Ok(())
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}
