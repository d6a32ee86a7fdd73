use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use kubedeck_k8s::{Error, KubernetesRepository, Result};
use kubedeck_types::{ConfigMapData, ConfigMapInfo, SecretData, SecretInfo};

/// ConfigMaps and Secrets, including copying them between namespaces
#[derive(Clone)]
pub struct ConfigUseCase {
    repo: Arc<dyn KubernetesRepository>,
}

impl ConfigUseCase {
    pub fn new(repo: Arc<dyn KubernetesRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_config_maps(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<ConfigMapInfo>> {
        self.repo.list_config_maps(cancel, namespace).await
    }

    pub async fn get_config_map(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<ConfigMapData> {
        self.repo.get_config_map(cancel, namespace, name).await
    }

    pub async fn list_secrets(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<SecretInfo>> {
        self.repo.list_secrets(cancel, namespace).await
    }

    pub async fn get_secret(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<SecretData> {
        self.repo.get_secret(cancel, namespace, name).await
    }

    pub async fn copy_config_map(
        &self,
        cancel: &CancellationToken,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> Result<()> {
        check_copy_target(source_namespace, target_namespace)?;
        self.repo
            .copy_config_map_to_namespace(cancel, source_namespace, name, target_namespace)
            .await?;
        info!(name = %name, from = %source_namespace, to = %target_namespace, "Copied ConfigMap");
        Ok(())
    }

    pub async fn copy_secret(
        &self,
        cancel: &CancellationToken,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> Result<()> {
        check_copy_target(source_namespace, target_namespace)?;
        self.repo
            .copy_secret_to_namespace(cancel, source_namespace, name, target_namespace)
            .await?;
        info!(name = %name, from = %source_namespace, to = %target_namespace, "Copied Secret");
        Ok(())
    }
}

fn check_copy_target(source: &str, target: &str) -> Result<()> {
    if target.is_empty() {
        return Err(Error::Unsupported("target namespace is required".to_string()));
    }
    if source == target {
        return Err(Error::Unsupported(format!(
            "source and target namespace are both {source}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRepository;

    #[tokio::test]
    async fn copies_between_namespaces() {
        let repo = Arc::new(FakeRepository::default());
        let configs = ConfigUseCase::new(repo.clone());
        let cancel = CancellationToken::new();

        configs
            .copy_config_map(&cancel, "default", "app-config", "staging")
            .await
            .unwrap();
        configs
            .copy_secret(&cancel, "default", "db-creds", "staging")
            .await
            .unwrap();
        assert_eq!(
            repo.calls(),
            vec!["copy_config_map_to_namespace", "copy_secret_to_namespace"]
        );
    }

    #[tokio::test]
    async fn refuses_copy_onto_itself() {
        let repo = Arc::new(FakeRepository::default());
        let configs = ConfigUseCase::new(repo.clone());
        let cancel = CancellationToken::new();

        let err = configs
            .copy_secret(&cancel, "default", "db-creds", "default")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
        assert!(
            configs
                .copy_config_map(&cancel, "default", "app-config", "")
                .await
                .is_err()
        );
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_objects_surface_not_found() {
        let configs = ConfigUseCase::new(Arc::new(FakeRepository::default()));
        let cancel = CancellationToken::new();

        let err = configs
            .get_config_map(&cancel, "default", "nope")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
