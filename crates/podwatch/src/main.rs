//! podwatch - report Kubernetes pod restarts to Slack with a model-written analysis.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notify::Notifier;
use podwatch::{
    Analyzer, Config, DedupState, EvidenceCollector, IncidentPipeline, IncidentSupervisor,
    KubeProvider, LogFormat, OllamaAnalyzer, RestartDetector,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter()));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }

    info!(
        poll_interval_secs = config.poll_interval_secs,
        slack_channel = %config.slack_channel,
        ollama_url = %config.ollama_url,
        model = %config.model,
        "Starting podwatch"
    );

    let provider = Arc::new(
        KubeProvider::connect()
            .await
            .context("Failed to connect to the Kubernetes API")?,
    );

    let notifier = Arc::new(Notifier::from_env(&config.slack_channel));
    let analyzer: Arc<dyn Analyzer> =
        Arc::new(OllamaAnalyzer::new(&config.ollama_url, &config.model));
    let pipeline = Arc::new(IncidentPipeline::new(
        EvidenceCollector::new(Arc::clone(&provider), config.log_tail_lines),
        analyzer,
        notifier,
    ));

    let mut supervisor = IncidentSupervisor::new(pipeline, config.analysis_timeout());
    let mut detector = RestartDetector::new(
        provider,
        DedupState::new(config.dedup_idle_cycles, config.dedup_capacity()),
        config.poll_interval(),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    detector.run(&mut supervisor, shutdown).await;

    let report = supervisor.shutdown(config.shutdown_grace()).await;
    info!(
        completed = report.completed,
        cancelled = report.cancelled,
        "podwatch stopped"
    );
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C"),
        () = terminate => info!("Received SIGTERM"),
    }
    shutdown.cancel();
}
