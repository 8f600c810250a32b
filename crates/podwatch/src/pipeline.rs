//! Per-incident flow: evidence, analysis, notification.

use notify::{EventLine, Notifier, PublishOutcome, RestartReport};
use std::sync::Arc;
use tracing::{info, warn};

use crate::analysis::Analyzer;
use crate::error::PipelineError;
use crate::evidence::EvidenceCollector;
use crate::incident::Incident;
use crate::k8s::ResourceProvider;

/// Runs one incident from evidence gathering to the threaded notification.
pub struct IncidentPipeline<P> {
    collector: EvidenceCollector<P>,
    analyzer: Arc<dyn Analyzer>,
    notifier: Arc<Notifier>,
}

impl<P: ResourceProvider> IncidentPipeline<P> {
    pub fn new(
        collector: EvidenceCollector<P>,
        analyzer: Arc<dyn Analyzer>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            collector,
            analyzer,
            notifier,
        }
    }

    /// Process `incident`.
    ///
    /// Collector and inference failures abandon the incident before anything
    /// is posted. Publish failures are not errors; they show in the outcome.
    pub async fn process(&self, incident: Incident) -> Result<PublishOutcome, PipelineError> {
        let evidence = self.collector.collect(&incident).await?;
        let analysis = self.analyzer.analyze(&evidence).await?;

        let report = RestartReport {
            pod: incident.name,
            namespace: incident.namespace,
            restart_time: incident.start_time,
            events: evidence
                .events
                .into_iter()
                .map(|e| EventLine::new(e.reason, e.message))
                .collect(),
            logs: evidence.logs,
            analysis,
        };

        let outcome = self.notifier.publish(&report).await;
        match &outcome {
            PublishOutcome::Published {
                message_ref,
                replies_posted,
            } => info!(
                namespace = %report.namespace,
                pod = %report.pod,
                thread_ts = %message_ref,
                replies_posted,
                "Restart notification published"
            ),
            PublishOutcome::ParentFailed => warn!(
                namespace = %report.namespace,
                pod = %report.pod,
                "Restart notification not published"
            ),
        }

        Ok(outcome)
    }
}
