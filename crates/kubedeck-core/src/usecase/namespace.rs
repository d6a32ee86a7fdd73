use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use kubedeck_k8s::{KubernetesRepository, Result, best_effort};
use kubedeck_types::{ForceDeleteReport, NamespaceInfo, NamespaceResources};

#[derive(Clone)]
pub struct NamespaceUseCase {
    repo: Arc<dyn KubernetesRepository>,
}

impl NamespaceUseCase {
    pub fn new(repo: Arc<dyn KubernetesRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_namespaces(&self, cancel: &CancellationToken) -> Result<Vec<NamespaceInfo>> {
        self.repo.list_namespaces(cancel).await
    }

    pub async fn list_active_namespace_names(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        self.repo.list_active_namespace_names(cancel).await
    }

    /// Pods, ConfigMaps and Secrets of `namespace`, fetched concurrently.
    /// A failed pod listing fails the call; the config objects are optional.
    pub async fn get_namespace_resources(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<NamespaceResources> {
        let (pods, config_maps, secrets) = tokio::join!(
            self.repo.list_all_pods(cancel, namespace),
            self.repo.list_config_maps(cancel, namespace),
            self.repo.list_secrets(cancel, namespace),
        );

        Ok(NamespaceResources {
            namespace: namespace.to_string(),
            pods: pods?,
            config_maps: best_effort(config_maps, "config maps")?.unwrap_or_default(),
            secrets: best_effort(secrets, "secrets")?.unwrap_or_default(),
        })
    }

    pub async fn force_delete_namespace(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<ForceDeleteReport> {
        let report = self.repo.force_delete_namespace(cancel, namespace).await?;
        if !report.failures.is_empty() {
            warn!(
                namespace = %namespace,
                failures = report.failures.len(),
                "Force delete finished with failures"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRepository;
    use kubedeck_types::{ConfigMapInfo, PodInfo, SecretInfo};

    fn fake() -> FakeRepository {
        FakeRepository {
            pods: vec![
                PodInfo::new("web-0".into(), "default".into()),
                PodInfo::new("other".into(), "kube-system".into()),
            ],
            config_maps: vec![ConfigMapInfo {
                name: "app-config".into(),
                ..Default::default()
            }],
            secrets: vec![SecretInfo {
                name: "db-creds".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn resources_of_a_namespace() {
        let namespaces = NamespaceUseCase::new(Arc::new(fake()));
        let cancel = CancellationToken::new();

        let resources = namespaces
            .get_namespace_resources(&cancel, "default")
            .await
            .unwrap();
        assert_eq!(resources.namespace, "default");
        assert_eq!(resources.pods.len(), 1);
        assert_eq!(resources.config_maps[0].name, "app-config");
        assert_eq!(resources.secrets[0].name, "db-creds");
    }

    #[tokio::test]
    async fn config_objects_are_optional() {
        let repo = fake().failing("list_config_maps").failing("list_secrets");
        let namespaces = NamespaceUseCase::new(Arc::new(repo));
        let cancel = CancellationToken::new();

        let resources = namespaces
            .get_namespace_resources(&cancel, "default")
            .await
            .unwrap();
        assert_eq!(resources.pods.len(), 1);
        assert!(resources.config_maps.is_empty());
        assert!(resources.secrets.is_empty());
    }

    #[tokio::test]
    async fn pod_listing_failure_fails_the_call() {
        let namespaces = NamespaceUseCase::new(Arc::new(fake().failing("list_all_pods")));
        let cancel = CancellationToken::new();

        assert!(
            namespaces
                .get_namespace_resources(&cancel, "default")
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn listings_pass_through() {
        let namespaces = NamespaceUseCase::new(Arc::new(fake()));
        let cancel = CancellationToken::new();

        let all = namespaces.list_namespaces(&cancel).await.unwrap();
        assert_eq!(all.len(), 2);
        let active = namespaces.list_active_namespace_names(&cancel).await.unwrap();
        assert_eq!(active, vec!["default"]);

        let report = namespaces
            .force_delete_namespace(&cancel, "old")
            .await
            .unwrap();
        assert_eq!(report.namespace, "old");
        assert!(report.failures.is_empty());
    }
}
