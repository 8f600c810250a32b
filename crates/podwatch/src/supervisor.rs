//! Supervised execution of incident analysis tasks.
//!
//! Every incident runs as its own Tokio task inside a [`JoinSet`] so the
//! detector loop never waits on one. Each task has a deadline, and all of
//! them share a cancellation token used at shutdown.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::detector::Dispatch;
use crate::incident::Incident;
use crate::k8s::ResourceProvider;
use crate::pipeline::IncidentPipeline;

/// Default per-incident deadline.
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(300);

/// Default time to let in-flight incidents finish on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// How in-flight tasks ended during [`IncidentSupervisor::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Tasks that finished within the grace period
    pub completed: usize,
    /// Tasks cancelled after the grace period
    pub cancelled: usize,
}

/// Spawns and tracks one analysis task per incident.
pub struct IncidentSupervisor<P> {
    pipeline: Arc<IncidentPipeline<P>>,
    tasks: JoinSet<()>,
    cancel: CancellationToken,
    deadline: Duration,
}

impl<P: ResourceProvider + 'static> IncidentSupervisor<P> {
    pub fn new(pipeline: Arc<IncidentPipeline<P>>, deadline: Duration) -> Self {
        Self {
            pipeline,
            tasks: JoinSet::new(),
            cancel: CancellationToken::new(),
            deadline,
        }
    }

    /// Number of tasks not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Spawn the analysis task for `incident` and return immediately.
    pub fn spawn(&mut self, incident: Incident) {
        let pipeline = Arc::clone(&self.pipeline);
        let cancel = self.cancel.clone();
        let deadline = self.deadline;

        self.tasks.spawn(async move {
            let key = incident.key();
            tokio::select! {
                () = cancel.cancelled() => {
                    warn!(key = %key, "Incident analysis cancelled");
                }
                result = tokio::time::timeout(deadline, pipeline.process(incident)) => {
                    match result {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => {
                            error!(key = %key, error = %e, "Incident analysis abandoned");
                        }
                        Err(_) => {
                            warn!(
                                key = %key,
                                timeout_secs = deadline.as_secs(),
                                "Incident analysis timed out"
                            );
                        }
                    }
                }
            }
        });
    }

    /// Collect finished tasks without waiting. Returns how many were reaped.
    pub fn reap_finished(&mut self) -> usize {
        let mut reaped = 0;
        while let Some(result) = self.tasks.try_join_next() {
            reaped += 1;
            if let Err(e) = result {
                if e.is_panic() {
                    error!(error = %e, "Incident analysis task panicked");
                }
            }
        }
        reaped
    }

    /// Wait up to `grace` for in-flight tasks, then cancel the rest.
    pub async fn shutdown(mut self, grace: Duration) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        let pending = self.tasks.len();
        if pending > 0 {
            info!(
                in_flight = pending,
                grace_secs = grace.as_secs(),
                "Waiting for in-flight incident analyses"
            );
        }

        let deadline = tokio::time::Instant::now() + grace;
        while !self.tasks.is_empty() {
            match tokio::time::timeout_at(deadline, self.tasks.join_next()).await {
                Ok(Some(_)) => report.completed += 1,
                Ok(None) | Err(_) => break,
            }
        }

        report.cancelled = self.tasks.len();
        if report.cancelled > 0 {
            warn!(
                cancelled = report.cancelled,
                "Cancelling incident analyses still running after grace period"
            );
            self.cancel.cancel();
            while self.tasks.join_next().await.is_some() {}
        }

        debug!(
            completed = report.completed,
            cancelled = report.cancelled,
            "Incident supervisor stopped"
        );
        report
    }
}

impl<P: ResourceProvider + 'static> Dispatch for IncidentSupervisor<P> {
    fn dispatch(&mut self, incident: Incident) {
        self.spawn(incident);
    }

    fn reap(&mut self) {
        let reaped = self.reap_finished();
        if reaped > 0 {
            debug!(reaped, in_flight = self.in_flight(), "Reaped finished incident tasks");
        }
    }
}
