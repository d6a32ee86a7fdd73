//! In-memory repository for use case tests

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use kubedeck_k8s::{
    ActionRepository, AutoscalingRepository, ConfigRepository, ContextRepository, Error,
    EventRepository, MetricsRepository, NamespaceRepository, NodeRepository, PodRepository,
    Result, WorkloadRepository,
};
use kubedeck_types::{
    ConfigMapData, ConfigMapInfo, ContextInfo, EventInfo, ForceDeleteReport, HpaData, HpaInfo,
    LogLine, LogOptions, NamespaceInfo, NodeInfo, PodInfo, PodMetrics, RelatedResources,
    ResourceType, SecretData, SecretInfo, WorkloadInfo,
};

#[derive(Default)]
pub struct FakeRepository {
    pub pods: Vec<PodInfo>,
    pub events: Vec<EventInfo>,
    pub logs: Vec<LogLine>,
    pub nodes: Vec<NodeInfo>,
    pub config_maps: Vec<ConfigMapInfo>,
    pub secrets: Vec<SecretInfo>,
    pub workloads: Vec<WorkloadInfo>,
    /// Operation names that fail with a transport-like error
    pub failing: HashSet<&'static str>,
    /// Operation names in call order
    pub calls: Mutex<Vec<String>>,
}

impl FakeRepository {
    pub fn failing(mut self, op: &'static str) -> Self {
        self.failing.insert(op);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, cancel: &CancellationToken, op: &'static str) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.calls.lock().unwrap().push(op.to_string());
        if self.failing.contains(op) {
            return Err(Error::Unavailable(op.to_string()));
        }
        Ok(())
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl NamespaceRepository for FakeRepository {
    async fn list_namespaces(&self, cancel: &CancellationToken) -> Result<Vec<NamespaceInfo>> {
        self.enter(cancel, "list_namespaces")?;
        Ok(vec![
            NamespaceInfo::new("default".into(), "Active".into()),
            NamespaceInfo::new("old".into(), "Terminating".into()),
        ])
    }

    async fn list_active_namespace_names(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        self.enter(cancel, "list_active_namespace_names")?;
        Ok(vec!["default".into()])
    }

    async fn force_delete_namespace(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<ForceDeleteReport> {
        self.enter(cancel, "force_delete_namespace")?;
        Ok(ForceDeleteReport::new(namespace))
    }
}

#[async_trait]
impl WorkloadRepository for FakeRepository {
    async fn list_workloads(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        resource_type: ResourceType,
    ) -> Result<Vec<WorkloadInfo>> {
        self.enter(cancel, "list_workloads")?;
        Ok(self
            .workloads
            .iter()
            .filter(|w| w.namespace == namespace && w.resource_type == resource_type)
            .cloned()
            .collect())
    }

    async fn list_rollouts(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<WorkloadInfo>> {
        self.list_workloads(cancel, namespace, ResourceType::Rollouts)
            .await
    }

    async fn get_deployment(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadInfo> {
        self.enter(cancel, "get_deployment")?;
        self.find_workload(namespace, ResourceType::Deployments, name)
    }

    async fn get_stateful_set(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadInfo> {
        self.enter(cancel, "get_stateful_set")?;
        self.find_workload(namespace, ResourceType::StatefulSets, name)
    }

    async fn get_daemon_set(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadInfo> {
        self.enter(cancel, "get_daemon_set")?;
        self.find_workload(namespace, ResourceType::DaemonSets, name)
    }

    async fn get_job(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadInfo> {
        self.enter(cancel, "get_job")?;
        self.find_workload(namespace, ResourceType::Jobs, name)
    }

    async fn get_workload_pods(
        &self,
        cancel: &CancellationToken,
        workload: &WorkloadInfo,
    ) -> Result<Vec<PodInfo>> {
        self.enter(cancel, "get_workload_pods")?;
        Ok(self
            .pods
            .iter()
            .filter(|p| p.namespace == workload.namespace)
            .cloned()
            .collect())
    }

    async fn get_workload_events(
        &self,
        cancel: &CancellationToken,
        _workload: &WorkloadInfo,
    ) -> Result<Vec<EventInfo>> {
        self.enter(cancel, "get_workload_events")?;
        Ok(self.events.clone())
    }
}

impl FakeRepository {
    fn find_workload(
        &self,
        namespace: &str,
        resource_type: ResourceType,
        name: &str,
    ) -> Result<WorkloadInfo> {
        self.workloads
            .iter()
            .find(|w| {
                w.namespace == namespace && w.resource_type == resource_type && w.name == name
            })
            .cloned()
            .ok_or_else(|| Error::not_found(resource_type.kind(), name))
    }
}

#[async_trait]
impl PodRepository for FakeRepository {
    async fn get_pod(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<PodInfo> {
        self.enter(cancel, "get_pod")?;
        self.pods
            .iter()
            .find(|p| p.namespace == namespace && p.name == name)
            .cloned()
            .ok_or_else(|| Error::not_found("Pod", name))
    }

    async fn list_all_pods(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<PodInfo>> {
        self.enter(cancel, "list_all_pods")?;
        Ok(self
            .pods
            .iter()
            .filter(|p| p.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn list_pods_by_node(
        &self,
        cancel: &CancellationToken,
        node: &str,
    ) -> Result<Vec<PodInfo>> {
        self.enter(cancel, "list_pods_by_node")?;
        Ok(self
            .pods
            .iter()
            .filter(|p| p.node_name == node)
            .cloned()
            .collect())
    }

    async fn delete_pod(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        _name: &str,
    ) -> Result<()> {
        self.enter(cancel, "delete_pod")
    }

    async fn get_pod_logs(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        _pod: &str,
        options: &LogOptions,
    ) -> Result<Vec<LogLine>> {
        self.enter(cancel, "get_pod_logs")?;
        Ok(self
            .logs
            .iter()
            .filter(|l| options.container.is_empty() || l.container == options.container)
            .cloned()
            .collect())
    }

    async fn get_all_container_logs(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        _pod: &str,
        _tail_lines: i64,
    ) -> Result<Vec<LogLine>> {
        self.enter(cancel, "get_all_container_logs")?;
        Ok(self.logs.clone())
    }

    async fn get_previous_logs(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        _pod: &str,
        _container: &str,
        _tail_lines: i64,
    ) -> Result<Vec<LogLine>> {
        self.enter(cancel, "get_previous_logs")?;
        Ok(Vec::new())
    }

    async fn get_pod_events(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        _pod: &str,
    ) -> Result<Vec<EventInfo>> {
        self.enter(cancel, "get_pod_events")?;
        Ok(self.events.clone())
    }

    async fn get_related_resources(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        _pod: &str,
    ) -> Result<RelatedResources> {
        self.enter(cancel, "get_related_resources")?;
        Ok(RelatedResources::default())
    }
}

#[async_trait]
impl MetricsRepository for FakeRepository {
    async fn get_pod_metrics(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
    ) -> Result<PodMetrics> {
        self.enter(cancel, "get_pod_metrics")?;
        Ok(PodMetrics {
            name: pod.to_string(),
            namespace: namespace.to_string(),
            ..Default::default()
        })
    }

    async fn get_namespace_metrics(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
    ) -> Result<Vec<PodMetrics>> {
        self.enter(cancel, "get_namespace_metrics")?;
        Ok(Vec::new())
    }
}

#[async_trait]
impl NodeRepository for FakeRepository {
    async fn list_nodes(&self, cancel: &CancellationToken) -> Result<Vec<NodeInfo>> {
        self.enter(cancel, "list_nodes")?;
        Ok(self.nodes.clone())
    }

    async fn get_node(&self, cancel: &CancellationToken, name: &str) -> Result<NodeInfo> {
        self.enter(cancel, "get_node")?;
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .cloned()
            .ok_or_else(|| Error::not_found("Node", name))
    }
}

#[async_trait]
impl ConfigRepository for FakeRepository {
    async fn list_config_maps(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
    ) -> Result<Vec<ConfigMapInfo>> {
        self.enter(cancel, "list_config_maps")?;
        Ok(self.config_maps.clone())
    }

    async fn get_config_map(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        name: &str,
    ) -> Result<ConfigMapData> {
        self.enter(cancel, "get_config_map")?;
        Err(Error::not_found("ConfigMap", name))
    }

    async fn list_secrets(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
    ) -> Result<Vec<SecretInfo>> {
        self.enter(cancel, "list_secrets")?;
        Ok(self.secrets.clone())
    }

    async fn get_secret(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        name: &str,
    ) -> Result<SecretData> {
        self.enter(cancel, "get_secret")?;
        Err(Error::not_found("Secret", name))
    }

    async fn copy_config_map_to_namespace(
        &self,
        cancel: &CancellationToken,
        _source_namespace: &str,
        _name: &str,
        _target_namespace: &str,
    ) -> Result<()> {
        self.enter(cancel, "copy_config_map_to_namespace")
    }

    async fn copy_secret_to_namespace(
        &self,
        cancel: &CancellationToken,
        _source_namespace: &str,
        _name: &str,
        _target_namespace: &str,
    ) -> Result<()> {
        self.enter(cancel, "copy_secret_to_namespace")
    }
}

#[async_trait]
impl AutoscalingRepository for FakeRepository {
    async fn list_hpas(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
    ) -> Result<Vec<HpaInfo>> {
        self.enter(cancel, "list_hpas")?;
        Ok(Vec::new())
    }

    async fn get_hpa(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        name: &str,
    ) -> Result<HpaData> {
        self.enter(cancel, "get_hpa")?;
        Err(Error::not_found("HorizontalPodAutoscaler", name))
    }
}

#[async_trait]
impl EventRepository for FakeRepository {
    async fn get_namespace_events(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        limit: usize,
    ) -> Result<Vec<EventInfo>> {
        self.enter(cancel, "get_namespace_events")?;
        let mut events = self.events.clone();
        if limit > 0 {
            events.truncate(limit);
        }
        Ok(events)
    }

    async fn get_recent_warnings(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        _since: Duration,
    ) -> Result<Vec<EventInfo>> {
        self.enter(cancel, "get_recent_warnings")?;
        Ok(self.events.iter().filter(|e| e.is_warning()).cloned().collect())
    }
}

#[async_trait]
impl ActionRepository for FakeRepository {
    async fn scale_deployment(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<()> {
        self.enter(cancel, "scale_deployment")?;
        self.record(format!("deployment/{name}={replicas}"));
        Ok(())
    }

    async fn scale_stateful_set(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<()> {
        self.enter(cancel, "scale_stateful_set")?;
        self.record(format!("statefulset/{name}={replicas}"));
        Ok(())
    }

    async fn scale_rollout(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<()> {
        self.enter(cancel, "scale_rollout")?;
        self.record(format!("rollout/{name}={replicas}"));
        Ok(())
    }

    async fn restart_deployment(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        _name: &str,
    ) -> Result<()> {
        self.enter(cancel, "restart_deployment")
    }

    async fn restart_stateful_set(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        _name: &str,
    ) -> Result<()> {
        self.enter(cancel, "restart_stateful_set")
    }

    async fn restart_daemon_set(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        _name: &str,
    ) -> Result<()> {
        self.enter(cancel, "restart_daemon_set")
    }

    async fn restart_rollout(
        &self,
        cancel: &CancellationToken,
        _namespace: &str,
        _name: &str,
    ) -> Result<()> {
        self.enter(cancel, "restart_rollout")
    }
}

impl ContextRepository for FakeRepository {
    fn current_context(&self) -> Option<String> {
        Some("kind-dev".to_string())
    }

    fn list_contexts(&self) -> (Vec<ContextInfo>, Option<String>) {
        let ctx = ContextInfo::new(
            "kind-dev".into(),
            "kind-dev".into(),
            "kind-dev".into(),
            None,
            true,
        );
        (vec![ctx], self.current_context())
    }
}
