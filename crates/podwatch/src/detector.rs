//! Restart detection loop.
//!
//! Each cycle lists every pod, compares restarted pods against
//! [`DedupState`] and hands new incidents to a [`Dispatch`] implementation.
//! The loop itself never awaits incident processing.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::dedup::DedupState;
use crate::error::CollectorError;
use crate::incident::Incident;
use crate::k8s::{ResourceProvider, WorkloadInstance};

/// Default time between pod listings.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Receives new incidents from the detector.
pub trait Dispatch {
    /// Take ownership of `incident`. Must not block.
    fn dispatch(&mut self, incident: Incident);

    /// Called at the start of every cycle.
    fn reap(&mut self) {}
}

/// Polls pods on a fixed interval and reports new restarts.
pub struct RestartDetector<P> {
    provider: Arc<P>,
    dedup: DedupState,
    interval: Duration,
}

impl<P: ResourceProvider> RestartDetector<P> {
    pub fn new(provider: Arc<P>, dedup: DedupState, interval: Duration) -> Self {
        Self {
            provider,
            dedup,
            interval,
        }
    }

    pub fn dedup(&self) -> &DedupState {
        &self.dedup
    }

    /// Run one detection cycle over an already fetched pod list.
    ///
    /// Dedup state is updated before the incidents are returned, so a slow
    /// or failing analysis can never cause a second notification for the
    /// same start time.
    pub fn observe(&mut self, workloads: &[WorkloadInstance]) -> Vec<Incident> {
        self.dedup.begin_cycle();
        let mut incidents = Vec::new();

        for pod in workloads {
            let Some(started_at) = pod.started_at else {
                continue;
            };
            let Some(restarted) = pod.containers.iter().find(|c| c.restart_count > 0) else {
                continue;
            };

            let key = pod.key();
            if self.dedup.observe(&key, started_at) {
                info!(
                    namespace = %pod.namespace,
                    pod = %pod.name,
                    container = %restarted.name,
                    restart_count = restarted.restart_count,
                    started_at = %started_at.to_rfc3339(),
                    "Detected pod restart"
                );
                incidents.push(Incident {
                    namespace: pod.namespace.clone(),
                    name: pod.name.clone(),
                    container: Some(restarted.name.clone()),
                    start_time: started_at,
                });
            }
        }

        let evicted = self.dedup.evict();
        if evicted > 0 {
            debug!(evicted, tracked = self.dedup.len(), "Evicted stale dedup entries");
        }

        incidents
    }

    /// List pods once and dispatch every new incident.
    ///
    /// A listing failure leaves dedup state untouched, including the cycle
    /// counter.
    pub async fn poll_once<D: Dispatch>(
        &mut self,
        dispatcher: &mut D,
    ) -> Result<usize, CollectorError> {
        let workloads = self.provider.list_workloads().await?;
        let incidents = self.observe(&workloads);
        let count = incidents.len();
        for incident in incidents {
            dispatcher.dispatch(incident);
        }
        Ok(count)
    }

    /// Poll until `shutdown` is cancelled.
    pub async fn run<D: Dispatch>(&mut self, dispatcher: &mut D, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.interval.as_secs(),
            "Monitoring pod restarts"
        );

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping restart detection");
                    break;
                }
                _ = ticker.tick() => {}
            }

            dispatcher.reap();
            match self.poll_once(dispatcher).await {
                Ok(count) => debug!(
                    new_incidents = count,
                    tracked = self.dedup.len(),
                    cycle = self.dedup.cycle(),
                    "Poll cycle complete"
                ),
                Err(e) => error!(error = %e, "Failed to list pods, retrying next interval"),
            }
        }
    }
}
