//! Scale and restart

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::autoscaling::v1::{Scale, ScaleSpec};
use kube::Resource;
use kube::api::{Api, DynamicObject, Patch, PatchParams, PostParams};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

use crate::client::{KubeRepository, get_named, guard};
use crate::error::{Error, Result};
use crate::repository::ActionRepository;

/// Pod template annotation whose change makes the controller roll its pods
pub const RESTARTED_AT_ANNOTATION: &str = "kubernetes.io/restartedAt";

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Merge patch stamping the pod template with a restart time
pub fn restart_patch(now: DateTime<Utc>) -> Value {
    json!({
        "spec": {
            "template": {
                "metadata": {
                    "annotations": { RESTARTED_AT_ANNOTATION: timestamp(now) }
                }
            }
        }
    })
}

/// Merge patch setting a rollout's `spec.restartAt`
pub fn rollout_restart_patch(now: DateTime<Utc>) -> Value {
    json!({ "spec": { "restartAt": timestamp(now) } })
}

pub fn with_replicas(mut scale: Scale, replicas: i32) -> Scale {
    scale
        .spec
        .get_or_insert_with(ScaleSpec::default)
        .replicas = Some(replicas);
    scale
}

/// Set `spec.replicas` on an untyped object, creating `spec` if needed
pub fn set_dynamic_replicas(object: &mut DynamicObject, replicas: i32) {
    let replicas = Value::from(i64::from(replicas));
    match object.data.get_mut("spec").and_then(Value::as_object_mut) {
        Some(spec) => {
            spec.insert("replicas".to_string(), replicas);
        }
        None => {
            object.data["spec"] = json!({ "replicas": replicas });
        }
    }
}

impl KubeRepository {
    async fn scale_via_subresource<K>(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let kind = K::kind(&Default::default()).to_string();
        let api: Api<K> = self.namespaced(namespace);
        let scale = guard(cancel, async {
            api.get_scale(name)
                .await
                .map_err(|e| Error::from_kube(e, &kind, name))
        })
        .await?;

        let body = serde_json::to_vec(&with_replicas(scale, replicas))
            .map_err(|e| Error::Transport(kube::Error::SerdeError(e)))?;
        guard(cancel, async {
            Ok(api.replace_scale(name, &PostParams::default(), body).await?)
        })
        .await?;
        tracing::info!(kind = %kind, namespace = %namespace, name = %name, replicas, "scaled");
        Ok(())
    }

    async fn patch_restart<K>(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let kind = K::kind(&Default::default()).to_string();
        let api: Api<K> = self.namespaced(namespace);
        let patch = restart_patch(Utc::now());
        guard(cancel, async {
            api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await
                .map_err(|e| Error::from_kube(e, &kind, name))
        })
        .await?;
        tracing::info!(kind = %kind, namespace = %namespace, name = %name, "restarted");
        Ok(())
    }

    fn rollouts_api(&self, namespace: &str) -> Result<Api<DynamicObject>> {
        let ar = self
            .capabilities()
            .rollouts
            .as_ref()
            .ok_or_else(|| Error::Unavailable("Argo Rollouts".to_string()))?;
        Ok(Api::namespaced_with(self.client(), namespace, ar))
    }
}

#[async_trait]
impl ActionRepository for KubeRepository {
    async fn scale_deployment(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<()> {
        self.scale_via_subresource::<Deployment>(cancel, namespace, name, replicas)
            .await
    }

    async fn scale_stateful_set(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<()> {
        self.scale_via_subresource::<StatefulSet>(cancel, namespace, name, replicas)
            .await
    }

    async fn scale_rollout(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<()> {
        let api = self.rollouts_api(namespace)?;
        let mut rollout = get_named(cancel, &api, "Rollout", name).await?;
        set_dynamic_replicas(&mut rollout, replicas);
        guard(cancel, async {
            Ok(api.replace(name, &PostParams::default(), &rollout).await?)
        })
        .await?;
        tracing::info!(namespace = %namespace, name = %name, replicas, "scaled rollout");
        Ok(())
    }

    async fn restart_deployment(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        self.patch_restart::<Deployment>(cancel, namespace, name).await
    }

    async fn restart_stateful_set(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        self.patch_restart::<StatefulSet>(cancel, namespace, name)
            .await
    }

    async fn restart_daemon_set(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        self.patch_restart::<DaemonSet>(cancel, namespace, name).await
    }

    async fn restart_rollout(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        let api = self.rollouts_api(namespace)?;
        let patch = rollout_restart_patch(Utc::now());
        guard(cancel, async {
            api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await
                .map_err(|e| Error::from_kube(e, "Rollout", name))
        })
        .await?;
        tracing::info!(namespace = %namespace, name = %name, "restarted rollout");
        Ok(())
    }
}
