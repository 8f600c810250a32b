//! Kubernetes access for the restart monitor.
//!
//! The rest of the crate sees only the simplified types below and the
//! [`ResourceProvider`] trait; [`KubeProvider`] is the `kube` implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Event, Pod};
use kube::api::{Api, ListParams, LogParams};
use kube::Client;
use tracing::debug;

use crate::error::CollectorError;

/// Simplified Pod representation
#[derive(Debug, Clone, Default)]
pub struct WorkloadInstance {
    pub name: String,
    pub namespace: String,
    pub started_at: Option<DateTime<Utc>>,
    pub containers: Vec<ContainerRestarts>,
}

/// Restart counter of one container within a pod
#[derive(Debug, Clone, Default)]
pub struct ContainerRestarts {
    pub name: String,
    pub restart_count: i32,
}

impl WorkloadInstance {
    /// Dedup key for this pod (`namespace/name`).
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Build from the API object.
    pub fn from_pod(pod: &Pod) -> Self {
        let status = pod.status.as_ref();
        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            started_at: status.and_then(|s| s.start_time.as_ref()).map(|t| t.0),
            containers: status
                .and_then(|s| s.container_statuses.as_ref())
                .map(|statuses| {
                    statuses
                        .iter()
                        .map(|c| ContainerRestarts {
                            name: c.name.clone(),
                            restart_count: c.restart_count,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Simplified core/v1 Event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterEvent {
    /// Name of the involved object
    pub involved_object: String,
    pub reason: String,
    pub message: String,
    /// `lastTimestamp`, falling back to `eventTime`
    pub last_seen: Option<DateTime<Utc>>,
}

impl ClusterEvent {
    /// Build from the API object.
    pub fn from_event(event: &Event) -> Self {
        Self {
            involved_object: event.involved_object.name.clone().unwrap_or_default(),
            reason: event.reason.clone().unwrap_or_default(),
            message: event.message.clone().unwrap_or_default(),
            last_seen: event
                .last_timestamp
                .as_ref()
                .map(|t| t.0)
                .or_else(|| event.event_time.as_ref().map(|t| t.0)),
        }
    }
}

/// Source of pods, logs and events.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// List pods in every namespace.
    async fn list_workloads(&self) -> Result<Vec<WorkloadInstance>, CollectorError>;

    /// Fetch the last `tail_lines` lines of a pod's log.
    async fn get_logs(
        &self,
        namespace: &str,
        name: &str,
        container: Option<&str>,
        tail_lines: i64,
    ) -> Result<String, CollectorError>;

    /// List all events in a namespace.
    async fn list_events(&self, namespace: &str) -> Result<Vec<ClusterEvent>, CollectorError>;
}

/// [`ResourceProvider`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeProvider {
    client: Client,
}

impl KubeProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from in-cluster config or the local kubeconfig and
    /// verify the API server answers.
    pub async fn connect() -> Result<Self, CollectorError> {
        let client = Client::try_default().await?;
        let version = client.apiserver_version().await?;
        debug!(
            major = %version.major,
            minor = %version.minor,
            "Connected to Kubernetes API server"
        );
        Ok(Self::new(client))
    }
}

#[async_trait]
impl ResourceProvider for KubeProvider {
    async fn list_workloads(&self) -> Result<Vec<WorkloadInstance>, CollectorError> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let pod_list = pods.list(&ListParams::default()).await?;
        Ok(pod_list.items.iter().map(WorkloadInstance::from_pod).collect())
    }

    async fn get_logs(
        &self,
        namespace: &str,
        name: &str,
        container: Option<&str>,
        tail_lines: i64,
    ) -> Result<String, CollectorError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: container.map(str::to_string),
            tail_lines: Some(tail_lines),
            ..LogParams::default()
        };
        Ok(pods.logs(name, &params).await?)
    }

    async fn list_events(&self, namespace: &str) -> Result<Vec<ClusterEvent>, CollectorError> {
        let events: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        let event_list = events.list(&ListParams::default()).await?;
        Ok(event_list.items.iter().map(ClusterEvent::from_event).collect())
    }
}
