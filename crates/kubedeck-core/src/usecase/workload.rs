use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use kubedeck_k8s::{Error, KubernetesRepository, Result};
use kubedeck_types::{EventInfo, HpaData, HpaInfo, PodInfo, ResourceType, WorkloadInfo};

/// Workload listings, autoscalers and the scale/restart actions
#[derive(Clone)]
pub struct WorkloadUseCase {
    repo: Arc<dyn KubernetesRepository>,
}

impl WorkloadUseCase {
    pub fn new(repo: Arc<dyn KubernetesRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_workloads(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        resource_type: ResourceType,
    ) -> Result<Vec<WorkloadInfo>> {
        match resource_type {
            ResourceType::Rollouts => self.repo.list_rollouts(cancel, namespace).await,
            other => self.repo.list_workloads(cancel, namespace, other).await,
        }
    }

    /// Look up one workload by kind. Pods are shown as single-pod workloads.
    pub async fn get_workload(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        resource_type: ResourceType,
        name: &str,
    ) -> Result<WorkloadInfo> {
        match resource_type {
            ResourceType::Deployments => self.repo.get_deployment(cancel, namespace, name).await,
            ResourceType::StatefulSets => {
                self.repo.get_stateful_set(cancel, namespace, name).await
            }
            ResourceType::DaemonSets => self.repo.get_daemon_set(cancel, namespace, name).await,
            ResourceType::Jobs => self.repo.get_job(cancel, namespace, name).await,
            other => self
                .list_workloads(cancel, namespace, other)
                .await?
                .into_iter()
                .find(|w| w.name == name)
                .ok_or_else(|| Error::not_found(other.kind(), name)),
        }
    }

    pub async fn get_workload_pods(
        &self,
        cancel: &CancellationToken,
        workload: &WorkloadInfo,
    ) -> Result<Vec<PodInfo>> {
        self.repo.get_workload_pods(cancel, workload).await
    }

    pub async fn get_workload_events(
        &self,
        cancel: &CancellationToken,
        workload: &WorkloadInfo,
    ) -> Result<Vec<EventInfo>> {
        self.repo.get_workload_events(cancel, workload).await
    }

    /// Set the replica count. Kinds without a replica count are left alone.
    pub async fn scale(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        resource_type: ResourceType,
        name: &str,
        replicas: i32,
    ) -> Result<()> {
        if replicas < 0 {
            return Err(Error::Unsupported(format!(
                "replica count must not be negative, got {replicas}"
            )));
        }

        match resource_type {
            ResourceType::Deployments => {
                self.repo
                    .scale_deployment(cancel, namespace, name, replicas)
                    .await?
            }
            ResourceType::StatefulSets => {
                self.repo
                    .scale_stateful_set(cancel, namespace, name, replicas)
                    .await?
            }
            ResourceType::Rollouts => {
                self.repo
                    .scale_rollout(cancel, namespace, name, replicas)
                    .await?
            }
            other => {
                debug!(kind = %other.scale_resource_type(), name = %name, "scale not applicable");
                return Ok(());
            }
        }

        info!(
            namespace = %namespace,
            kind = %resource_type.scale_resource_type(),
            name = %name,
            replicas,
            "Scaled workload"
        );
        Ok(())
    }

    /// Trigger a rolling restart. Kinds without a pod template controller are left alone.
    pub async fn restart(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        resource_type: ResourceType,
        name: &str,
    ) -> Result<()> {
        match resource_type {
            ResourceType::Deployments => {
                self.repo.restart_deployment(cancel, namespace, name).await?
            }
            ResourceType::StatefulSets => {
                self.repo.restart_stateful_set(cancel, namespace, name).await?
            }
            ResourceType::DaemonSets => {
                self.repo.restart_daemon_set(cancel, namespace, name).await?
            }
            ResourceType::Rollouts => self.repo.restart_rollout(cancel, namespace, name).await?,
            other => {
                debug!(kind = %other, name = %name, "restart not applicable");
                return Ok(());
            }
        }

        info!(namespace = %namespace, kind = %resource_type, name = %name, "Restarted workload");
        Ok(())
    }

    pub async fn list_hpas(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<HpaInfo>> {
        self.repo.list_hpas(cancel, namespace).await
    }

    pub async fn get_hpa(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<HpaData> {
        self.repo.get_hpa(cancel, namespace, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRepository;

    fn workload(name: &str, resource_type: ResourceType) -> WorkloadInfo {
        WorkloadInfo::new(name.into(), "default".into(), resource_type)
    }

    fn fake() -> FakeRepository {
        FakeRepository {
            workloads: vec![
                workload("web", ResourceType::Deployments),
                workload("db", ResourceType::StatefulSets),
                workload("canary", ResourceType::Rollouts),
                workload("nightly", ResourceType::CronJobs),
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn scale_dispatches_by_kind() {
        let repo = Arc::new(fake());
        let workloads = WorkloadUseCase::new(repo.clone());
        let cancel = CancellationToken::new();

        workloads
            .scale(&cancel, "default", ResourceType::Deployments, "web", 3)
            .await
            .unwrap();
        workloads
            .scale(&cancel, "default", ResourceType::StatefulSets, "db", 0)
            .await
            .unwrap();
        workloads
            .scale(&cancel, "default", ResourceType::Rollouts, "canary", 5)
            .await
            .unwrap();

        let calls = repo.calls();
        assert!(calls.contains(&"deployment/web=3".to_string()));
        assert!(calls.contains(&"statefulset/db=0".to_string()));
        assert!(calls.contains(&"rollout/canary=5".to_string()));
    }

    #[tokio::test]
    async fn scale_ignores_kinds_without_replicas() {
        let repo = Arc::new(fake());
        let workloads = WorkloadUseCase::new(repo.clone());
        let cancel = CancellationToken::new();

        for kind in [
            ResourceType::DaemonSets,
            ResourceType::Jobs,
            ResourceType::CronJobs,
            ResourceType::Pods,
        ] {
            workloads
                .scale(&cancel, "default", kind, "x", 2)
                .await
                .unwrap();
        }
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn scale_rejects_negative_replicas() {
        let workloads = WorkloadUseCase::new(Arc::new(fake()));
        let cancel = CancellationToken::new();

        let err = workloads
            .scale(&cancel, "default", ResourceType::Deployments, "web", -1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[tokio::test]
    async fn restart_dispatches_by_kind() {
        let repo = Arc::new(fake());
        let workloads = WorkloadUseCase::new(repo.clone());
        let cancel = CancellationToken::new();

        for kind in ResourceType::ALL {
            workloads
                .restart(&cancel, "default", kind, "x")
                .await
                .unwrap();
        }
        assert_eq!(
            repo.calls(),
            vec![
                "restart_deployment",
                "restart_stateful_set",
                "restart_daemon_set",
                "restart_rollout"
            ]
        );
    }

    #[tokio::test]
    async fn rollout_scale_surfaces_missing_controller() {
        let workloads = WorkloadUseCase::new(Arc::new(fake().failing("scale_rollout")));
        let cancel = CancellationToken::new();

        let err = workloads
            .scale(&cancel, "default", ResourceType::Rollouts, "canary", 1)
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn get_workload_by_kind() {
        let workloads = WorkloadUseCase::new(Arc::new(fake()));
        let cancel = CancellationToken::new();

        let web = workloads
            .get_workload(&cancel, "default", ResourceType::Deployments, "web")
            .await
            .unwrap();
        assert_eq!(web.object_ref(), "Deployment/web");

        let nightly = workloads
            .get_workload(&cancel, "default", ResourceType::CronJobs, "nightly")
            .await
            .unwrap();
        assert_eq!(nightly.resource_type, ResourceType::CronJobs);

        let err = workloads
            .get_workload(&cancel, "default", ResourceType::Rollouts, "missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
