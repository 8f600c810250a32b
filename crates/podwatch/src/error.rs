//! Error types for restart analysis.

use thiserror::Error;

/// Errors from the resource provider (listing pods, fetching logs/events).
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Kubernetes API request failed
    #[error("Kubernetes API request failed: {0}")]
    Kube(#[from] kube::Error),

    /// Other provider failure
    #[error("{0}")]
    Other(String),
}

/// Errors from the inference endpoint.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Transport failure talking to the model
    #[error("Inference request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Body was not JSON
    #[error("Inference response was not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Reasons an incident was abandoned before a notification was attempted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("evidence collection failed: {0}")]
    Evidence(#[from] CollectorError),

    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
}
