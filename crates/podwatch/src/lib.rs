//! Pod restart monitor for Kubernetes.
//!
//! This crate provides:
//! - Cluster-wide polling of pods with start-time based restart deduplication
//! - Log tail and correlated event collection for each restart
//! - Root-cause analysis through an Ollama-compatible endpoint
//! - Supervised per-incident tasks with deadlines and graceful shutdown
//!
//! Notifications are published through the `notify` crate.

pub mod analysis;
pub mod config;
pub mod dedup;
pub mod detector;
pub mod error;
pub mod evidence;
pub mod incident;
pub mod k8s;
pub mod pipeline;
pub mod supervisor;

// Re-export main types
pub use analysis::{Analyzer, OllamaAnalyzer};
pub use config::{Config, LogFormat};
pub use dedup::DedupState;
pub use detector::{Dispatch, RestartDetector};
pub use error::{AnalysisError, CollectorError, PipelineError};
pub use evidence::{EvidenceBundle, EvidenceCollector};
pub use incident::Incident;
pub use k8s::{ClusterEvent, KubeProvider, ResourceProvider, WorkloadInstance};
pub use pipeline::IncidentPipeline;
pub use supervisor::{IncidentSupervisor, ShutdownReport};
