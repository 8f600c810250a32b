//! Evidence gathering for a restart incident.
//!
//! Collects the raw recent log tail of the pod and the namespace events that
//! refer to it around the restart. Both are required; if either fetch fails
//! the incident is abandoned.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::error::CollectorError;
use crate::incident::Incident;
use crate::k8s::{ClusterEvent, ResourceProvider};

/// Default number of log lines fetched per incident.
pub const DEFAULT_LOG_TAIL_LINES: i64 = 50;

/// How far before the restart (in seconds) an event may have been last seen.
pub const EVENT_LOOKBACK_SECS: i64 = 60;

/// Logs and correlated events for one incident.
#[derive(Debug, Clone, Default)]
pub struct EvidenceBundle {
    /// Raw log tail
    pub logs: String,
    pub events: Vec<ClusterEvent>,
}

/// Keep events about `pod_name` last seen after `start_time - lookback`.
///
/// There is no upper bound: events arriving any time after the restart are
/// kept. Events without a timestamp are dropped.
pub fn correlate_events(
    events: Vec<ClusterEvent>,
    pod_name: &str,
    start_time: DateTime<Utc>,
    lookback: Duration,
) -> Vec<ClusterEvent> {
    let not_before = start_time - lookback;
    events
        .into_iter()
        .filter(|e| e.involved_object == pod_name)
        .filter(|e| e.last_seen.is_some_and(|seen| seen > not_before))
        .collect()
}

/// Gathers [`EvidenceBundle`]s from a [`ResourceProvider`].
pub struct EvidenceCollector<P> {
    provider: Arc<P>,
    tail_lines: i64,
}

impl<P: ResourceProvider> EvidenceCollector<P> {
    pub fn new(provider: Arc<P>, tail_lines: i64) -> Self {
        Self {
            provider,
            tail_lines,
        }
    }

    /// Fetch logs, then events, for `incident`.
    pub async fn collect(&self, incident: &Incident) -> Result<EvidenceBundle, CollectorError> {
        let logs = self
            .provider
            .get_logs(
                &incident.namespace,
                &incident.name,
                incident.container.as_deref(),
                self.tail_lines,
            )
            .await?;

        let events = self.provider.list_events(&incident.namespace).await?;
        let total = events.len();
        let events = correlate_events(
            events,
            &incident.name,
            incident.start_time,
            Duration::seconds(EVENT_LOOKBACK_SECS),
        );

        debug!(
            namespace = %incident.namespace,
            pod = %incident.name,
            log_bytes = logs.len(),
            events = events.len(),
            namespace_events = total,
            "Collected evidence"
        );

        Ok(EvidenceBundle { logs, events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::WorkloadInstance;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn event(object: &str, reason: &str, seen: Option<DateTime<Utc>>) -> ClusterEvent {
        ClusterEvent {
            involved_object: object.to_string(),
            reason: reason.to_string(),
            message: format!("{reason} message"),
            last_seen: seen,
        }
    }

    #[test]
    fn test_correlate_filters_by_object_and_window() {
        let start = at(600);
        let events = vec![
            event("app-1", "TooOld", Some(at(540))),
            event("app-1", "JustInside", Some(at(541))),
            event("app-1", "Later", Some(at(100_000))),
            event("app-2", "OtherPod", Some(at(600))),
            event("app-1", "NoTimestamp", None),
        ];

        let kept = correlate_events(
            events,
            "app-1",
            start,
            Duration::seconds(EVENT_LOOKBACK_SECS),
        );
        let reasons: Vec<_> = kept.iter().map(|e| e.reason.as_str()).collect();
        assert_eq!(reasons, vec!["JustInside", "Later"]);
    }

    struct FakeProvider {
        logs: Result<String, String>,
        events: Result<Vec<ClusterEvent>, String>,
        log_requests: Mutex<Vec<(String, String, Option<String>, i64)>>,
        event_requests: Mutex<usize>,
    }

    #[async_trait]
    impl ResourceProvider for FakeProvider {
        async fn list_workloads(&self) -> Result<Vec<WorkloadInstance>, CollectorError> {
            Ok(vec![])
        }

        async fn get_logs(
            &self,
            namespace: &str,
            name: &str,
            container: Option<&str>,
            tail_lines: i64,
        ) -> Result<String, CollectorError> {
            self.log_requests.lock().unwrap().push((
                namespace.to_string(),
                name.to_string(),
                container.map(str::to_string),
                tail_lines,
            ));
            self.logs.clone().map_err(CollectorError::Other)
        }

        async fn list_events(&self, _namespace: &str) -> Result<Vec<ClusterEvent>, CollectorError> {
            *self.event_requests.lock().unwrap() += 1;
            self.events.clone().map_err(CollectorError::Other)
        }
    }

    fn incident() -> Incident {
        Incident {
            namespace: "ns".to_string(),
            name: "app-1".to_string(),
            container: Some("web".to_string()),
            start_time: at(600),
        }
    }

    #[tokio::test]
    async fn test_collect_returns_logs_and_correlated_events() {
        let provider = Arc::new(FakeProvider {
            logs: Ok("boot\nAuthorization: Bearer of bad news\npassword=hunter2\ncrash".to_string()),
            events: Ok(vec![
                event("app-1", "BackOff", Some(at(610))),
                event("app-9", "BackOff", Some(at(610))),
            ]),
            log_requests: Mutex::default(),
            event_requests: Mutex::default(),
        });
        let collector = EvidenceCollector::new(provider.clone(), DEFAULT_LOG_TAIL_LINES);

        let bundle = collector.collect(&incident()).await.unwrap();
        assert_eq!(
            bundle.logs,
            "boot\nAuthorization: Bearer of bad news\npassword=hunter2\ncrash"
        );
        assert_eq!(bundle.events.len(), 1);
        assert_eq!(
            provider.log_requests.lock().unwrap()[0],
            (
                "ns".to_string(),
                "app-1".to_string(),
                Some("web".to_string()),
                50
            )
        );
    }

    #[tokio::test]
    async fn test_log_failure_abandons_collection() {
        let provider = Arc::new(FakeProvider {
            logs: Err("container not found".to_string()),
            events: Ok(vec![]),
            log_requests: Mutex::default(),
            event_requests: Mutex::default(),
        });
        let collector = EvidenceCollector::new(provider.clone(), DEFAULT_LOG_TAIL_LINES);

        let err = collector.collect(&incident()).await.unwrap_err();
        assert!(matches!(err, CollectorError::Other(_)));
        assert_eq!(*provider.event_requests.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_event_failure_abandons_collection() {
        let provider = Arc::new(FakeProvider {
            logs: Ok("crash".to_string()),
            events: Err("events forbidden".to_string()),
            log_requests: Mutex::default(),
            event_requests: Mutex::default(),
        });
        let collector = EvidenceCollector::new(provider.clone(), DEFAULT_LOG_TAIL_LINES);

        let err = collector.collect(&incident()).await.unwrap_err();
        assert!(matches!(err, CollectorError::Other(msg) if msg == "events forbidden"));
        assert_eq!(*provider.event_requests.lock().unwrap(), 1);
    }
}
