use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use kubedeck_k8s::{KubernetesRepository, Result};
use kubedeck_types::{ContextInfo, EventInfo, NodeInfo, PodInfo};

/// Contexts, nodes and namespace-wide events
#[derive(Clone)]
pub struct ClusterUseCase {
    repo: Arc<dyn KubernetesRepository>,
}

impl ClusterUseCase {
    pub fn new(repo: Arc<dyn KubernetesRepository>) -> Self {
        Self { repo }
    }

    pub fn current_context(&self) -> Option<String> {
        self.repo.current_context()
    }

    pub fn list_contexts(&self) -> (Vec<ContextInfo>, Option<String>) {
        self.repo.list_contexts()
    }

    pub async fn list_nodes(&self, cancel: &CancellationToken) -> Result<Vec<NodeInfo>> {
        self.repo.list_nodes(cancel).await
    }

    pub async fn get_node(&self, cancel: &CancellationToken, name: &str) -> Result<NodeInfo> {
        self.repo.get_node(cancel, name).await
    }

    pub async fn list_pods_by_node(
        &self,
        cancel: &CancellationToken,
        node: &str,
    ) -> Result<Vec<PodInfo>> {
        self.repo.list_pods_by_node(cancel, node).await
    }

    pub async fn get_namespace_events(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        limit: usize,
    ) -> Result<Vec<EventInfo>> {
        self.repo.get_namespace_events(cancel, namespace, limit).await
    }

    pub async fn get_recent_warnings(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        since: Duration,
    ) -> Result<Vec<EventInfo>> {
        self.repo.get_recent_warnings(cancel, namespace, since).await
    }
}
