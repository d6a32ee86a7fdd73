//! Namespaces

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, ListParams};
use tokio_util::sync::CancellationToken;

use kubedeck_types::{ForceDeleteReport, NamespaceInfo};

use crate::client::{KubeRepository, list_all};
use crate::error::Result;
use crate::format::age_since;
use crate::repository::NamespaceRepository;

pub fn namespace_to_info(ns: &Namespace, now: DateTime<Utc>) -> NamespaceInfo {
    let meta = &ns.metadata;
    let status = ns
        .status
        .as_ref()
        .and_then(|s| s.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let mut info = NamespaceInfo::new(meta.name.clone().unwrap_or_default(), status);
    info.age = age_since(meta.creation_timestamp.as_ref().map(|t| t.0), now);
    info.labels = meta.labels.clone().unwrap_or_default();
    info
}

/// Names of active namespaces, in input order
pub fn active_names(namespaces: &[NamespaceInfo]) -> Vec<String> {
    namespaces
        .iter()
        .filter(|ns| ns.is_active())
        .map(|ns| ns.name.clone())
        .collect()
}

#[async_trait]
impl NamespaceRepository for KubeRepository {
    async fn list_namespaces(&self, cancel: &CancellationToken) -> Result<Vec<NamespaceInfo>> {
        let api: Api<Namespace> = self.cluster();
        let items = list_all(cancel, &api, &ListParams::default()).await?;
        let now = Utc::now();
        let mut rows: Vec<NamespaceInfo> =
            items.iter().map(|ns| namespace_to_info(ns, now)).collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn list_active_namespace_names(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        let namespaces = self.list_namespaces(cancel).await?;
        Ok(active_names(&namespaces))
    }

    async fn force_delete_namespace(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<ForceDeleteReport> {
        self.sweep_namespace(cancel, namespace).await
    }
}
