//! Repository ports
//!
//! One trait per capability so front ends and use cases can depend on the
//! narrowest surface they need. [`KubernetesRepository`] bundles them all and
//! is implemented for anything that implements every port.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use kubedeck_types::{
    ConfigMapData, ConfigMapInfo, ContextInfo, EventInfo, ForceDeleteReport, HpaData, HpaInfo,
    LogLine, LogOptions, NamespaceInfo, NodeInfo, PodInfo, PodMetrics, RelatedResources,
    ResourceType, SecretData, SecretInfo, WorkloadInfo,
};

use crate::error::Result;

#[async_trait]
pub trait NamespaceRepository: Send + Sync {
    async fn list_namespaces(&self, cancel: &CancellationToken) -> Result<Vec<NamespaceInfo>>;

    /// Names of namespaces in phase `Active`
    async fn list_active_namespace_names(&self, cancel: &CancellationToken) -> Result<Vec<String>>;

    /// Delete every namespaced object in `namespace`, strip its finalizers and
    /// delete it. Only the initial namespace lookup can fail the call.
    async fn force_delete_namespace(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<ForceDeleteReport>;
}

#[async_trait]
pub trait WorkloadRepository: Send + Sync {
    async fn list_workloads(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        resource_type: ResourceType,
    ) -> Result<Vec<WorkloadInfo>>;

    /// Empty when rollouts are not installed
    async fn list_rollouts(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<WorkloadInfo>>;

    async fn get_deployment(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadInfo>;

    async fn get_stateful_set(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadInfo>;

    async fn get_daemon_set(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadInfo>;

    async fn get_job(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadInfo>;

    async fn get_workload_pods(
        &self,
        cancel: &CancellationToken,
        workload: &WorkloadInfo,
    ) -> Result<Vec<PodInfo>>;

    async fn get_workload_events(
        &self,
        cancel: &CancellationToken,
        workload: &WorkloadInfo,
    ) -> Result<Vec<EventInfo>>;
}

#[async_trait]
pub trait PodRepository: Send + Sync {
    async fn get_pod(&self, cancel: &CancellationToken, namespace: &str, name: &str)
    -> Result<PodInfo>;

    async fn list_all_pods(&self, cancel: &CancellationToken, namespace: &str)
    -> Result<Vec<PodInfo>>;

    async fn list_pods_by_node(
        &self,
        cancel: &CancellationToken,
        node: &str,
    ) -> Result<Vec<PodInfo>>;

    async fn delete_pod(&self, cancel: &CancellationToken, namespace: &str, name: &str)
    -> Result<()>;

    async fn get_pod_logs(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> Result<Vec<LogLine>>;

    /// Logs of every container merged by timestamp
    async fn get_all_container_logs(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        tail_lines: i64,
    ) -> Result<Vec<LogLine>>;

    /// Logs of the previous instance of `container`
    async fn get_previous_logs(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        container: &str,
        tail_lines: i64,
    ) -> Result<Vec<LogLine>>;

    async fn get_pod_events(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
    ) -> Result<Vec<EventInfo>>;

    /// Owner, services, ingresses, mesh routes and config references of a pod
    async fn get_related_resources(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
    ) -> Result<RelatedResources>;
}

#[async_trait]
pub trait MetricsRepository: Send + Sync {
    /// Fails with `Unavailable` when no metrics API is served
    async fn get_pod_metrics(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
    ) -> Result<PodMetrics>;

    async fn get_namespace_metrics(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<PodMetrics>>;
}

#[async_trait]
pub trait NodeRepository: Send + Sync {
    async fn list_nodes(&self, cancel: &CancellationToken) -> Result<Vec<NodeInfo>>;

    async fn get_node(&self, cancel: &CancellationToken, name: &str) -> Result<NodeInfo>;
}

#[async_trait]
pub trait ConfigRepository: Send + Sync {
    async fn list_config_maps(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<ConfigMapInfo>>;

    async fn get_config_map(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<ConfigMapData>;

    async fn list_secrets(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<SecretInfo>>;

    async fn get_secret(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<SecretData>;

    /// Create or overwrite `name` in `target_namespace` with the source's data
    async fn copy_config_map_to_namespace(
        &self,
        cancel: &CancellationToken,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> Result<()>;

    async fn copy_secret_to_namespace(
        &self,
        cancel: &CancellationToken,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> Result<()>;
}

#[async_trait]
pub trait AutoscalingRepository: Send + Sync {
    async fn list_hpas(&self, cancel: &CancellationToken, namespace: &str)
    -> Result<Vec<HpaInfo>>;

    async fn get_hpa(&self, cancel: &CancellationToken, namespace: &str, name: &str)
    -> Result<HpaData>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Most recent events first, at most `limit` (0 means all)
    async fn get_namespace_events(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        limit: usize,
    ) -> Result<Vec<EventInfo>>;

    /// Warning events last seen within `since`
    async fn get_recent_warnings(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        since: Duration,
    ) -> Result<Vec<EventInfo>>;
}

#[async_trait]
pub trait ActionRepository: Send + Sync {
    async fn scale_deployment(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<()>;

    async fn scale_stateful_set(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<()>;

    /// Fails with `Unavailable` when rollouts are not installed
    async fn scale_rollout(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<()>;

    async fn restart_deployment(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<()>;

    async fn restart_stateful_set(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<()>;

    async fn restart_daemon_set(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<()>;

    async fn restart_rollout(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<()>;
}

/// Kubeconfig contexts. Purely local, so neither async nor cancellable.
pub trait ContextRepository: Send + Sync {
    fn current_context(&self) -> Option<String>;

    /// All contexts plus the current one
    fn list_contexts(&self) -> (Vec<ContextInfo>, Option<String>);
}

/// Every port at once
pub trait KubernetesRepository:
    NamespaceRepository
    + WorkloadRepository
    + PodRepository
    + MetricsRepository
    + NodeRepository
    + ConfigRepository
    + AutoscalingRepository
    + EventRepository
    + ActionRepository
    + ContextRepository
    + Send
    + Sync
{
}

impl<T> KubernetesRepository for T where
    T: NamespaceRepository
        + WorkloadRepository
        + PodRepository
        + MetricsRepository
        + NodeRepository
        + ConfigRepository
        + AutoscalingRepository
        + EventRepository
        + ActionRepository
        + ContextRepository
        + Send
        + Sync
{
}
