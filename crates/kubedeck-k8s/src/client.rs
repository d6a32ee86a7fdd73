//! Kube-backed repository
//!
//! [`KubeRepository`] implements every repository port against a live
//! cluster. Each request is raced against the caller's cancellation token.

use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{Api, ListParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::capabilities::Capabilities;
use crate::error::{Error, Result};
use crate::kubeconfig::KubeContexts;

/// Cluster access backed by a `kube::Client`
#[derive(Clone)]
pub struct KubeRepository {
    client: Client,
    capabilities: Arc<Capabilities>,
    contexts: Arc<KubeContexts>,
}

impl KubeRepository {
    pub fn new(client: Client, capabilities: Capabilities, contexts: KubeContexts) -> Self {
        Self {
            client,
            capabilities: Arc::new(capabilities),
            contexts: Arc::new(contexts),
        }
    }

    /// Connect using the kubeconfig (optionally a specific context), falling
    /// back to in-cluster configuration, then discover optional API groups.
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        let mut contexts = KubeContexts::load();
        let client = contexts.client_for(context).await?;
        let capabilities = Capabilities::discover(&client).await;
        tracing::info!(
            context = ?contexts.current_context(),
            rollouts = capabilities.rollouts.is_some(),
            istio = capabilities.virtual_services.is_some(),
            metrics = capabilities.pod_metrics.is_some(),
            "connected to cluster"
        );
        Ok(Self::new(client, capabilities, contexts))
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub(crate) fn contexts(&self) -> &KubeContexts {
        &self.contexts
    }

    pub(crate) fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    pub(crate) fn cluster<K>(&self) -> Api<K>
    where
        K: Resource<Scope = ClusterResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::all(self.client.clone())
    }

    /// Namespaced objects across every namespace
    pub(crate) fn all_namespaces<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::all(self.client.clone())
    }
}

/// Run `fut` unless `cancel` fires first
pub(crate) async fn guard<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

/// List every object matching `lp`
pub(crate) async fn list_all<K>(
    cancel: &CancellationToken,
    api: &Api<K>,
    lp: &ListParams,
) -> Result<Vec<K>>
where
    K: Clone + DeserializeOwned + Debug,
{
    guard(cancel, async {
        api.list(lp)
            .await
            .map(|list| list.items)
            .map_err(Error::Transport)
    })
    .await
}

/// Get a named object, mapping absence to `NotFound`
pub(crate) async fn get_named<K>(
    cancel: &CancellationToken,
    api: &Api<K>,
    kind: &str,
    name: &str,
) -> Result<K>
where
    K: Clone + DeserializeOwned + Debug,
{
    guard(cancel, async {
        api.get_opt(name)
            .await
            .map_err(|e| Error::from_kube(e, kind, name))?
            .ok_or_else(|| Error::not_found(kind, name))
    })
    .await
}

/// Turn a best-effort result into an optional value. Cancellation still propagates.
pub fn best_effort<T>(result: Result<T>, what: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(e) => {
            tracing::debug!(what = %what, error = %e, "best-effort fetch failed");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_returns_cancelled_when_token_fired() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<()> = guard(&cancel, std::future::pending()).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn guard_passes_through_results() {
        let cancel = CancellationToken::new();
        let result = guard(&cancel, async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn best_effort_swallows_all_but_cancellation() {
        assert_eq!(best_effort(Ok(1), "x").unwrap(), Some(1));
        let missing: Result<i32> = Err(Error::not_found("Pod", "p"));
        assert_eq!(best_effort(missing, "x").unwrap(), None);
        let cancelled: Result<i32> = Err(Error::Cancelled);
        assert!(best_effort(cancelled, "x").is_err());
    }
}
