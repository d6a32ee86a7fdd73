//! ConfigMaps and Secrets

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams, PostParams};
use kube::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

use kubedeck_types::{ConfigMapData, ConfigMapInfo, SecretData, SecretInfo};

use crate::client::{KubeRepository, get_named, guard, list_all};
use crate::error::{Error, Result, is_already_exists};
use crate::format::age_since;
use crate::repository::ConfigRepository;

/// Server-populated annotation that must not follow a copy
const LAST_APPLIED: &str = "kubectl.kubernetes.io/last-applied-configuration";

fn created(meta: &ObjectMeta) -> Option<DateTime<Utc>> {
    meta.creation_timestamp.as_ref().map(|t| t.0)
}

pub fn config_map_to_info(cm: &ConfigMap, now: DateTime<Utc>) -> ConfigMapInfo {
    let keys = cm.data.as_ref().map(BTreeMap::len).unwrap_or(0)
        + cm.binary_data.as_ref().map(BTreeMap::len).unwrap_or(0);
    ConfigMapInfo {
        name: cm.metadata.name.clone().unwrap_or_default(),
        namespace: cm.metadata.namespace.clone().unwrap_or_default(),
        age: age_since(created(&cm.metadata), now),
        key_count: keys,
    }
}

/// Full contents. Binary entries are summarised by size.
pub fn config_map_to_data(cm: &ConfigMap, now: DateTime<Utc>) -> ConfigMapData {
    let mut data = cm.data.clone().unwrap_or_default();
    for (key, bytes) in cm.binary_data.iter().flatten() {
        data.insert(key.clone(), format!("<binary: {} bytes>", bytes.0.len()));
    }
    ConfigMapData {
        name: cm.metadata.name.clone().unwrap_or_default(),
        namespace: cm.metadata.namespace.clone().unwrap_or_default(),
        age: age_since(created(&cm.metadata), now),
        labels: cm.metadata.labels.clone().unwrap_or_default(),
        data,
    }
}

fn secret_type(secret: &Secret) -> String {
    secret.type_.clone().unwrap_or_else(|| "Opaque".to_string())
}

pub fn secret_to_info(secret: &Secret, now: DateTime<Utc>) -> SecretInfo {
    SecretInfo {
        name: secret.metadata.name.clone().unwrap_or_default(),
        namespace: secret.metadata.namespace.clone().unwrap_or_default(),
        secret_type: secret_type(secret),
        age: age_since(created(&secret.metadata), now),
        key_count: secret.data.as_ref().map(BTreeMap::len).unwrap_or(0),
    }
}

/// Full contents with values decoded to (lossy) UTF-8 strings
pub fn secret_to_data(secret: &Secret, now: DateTime<Utc>) -> SecretData {
    let data = secret
        .data
        .iter()
        .flatten()
        .map(|(k, v)| (k.clone(), String::from_utf8_lossy(&v.0).into_owned()))
        .collect();
    SecretData {
        name: secret.metadata.name.clone().unwrap_or_default(),
        namespace: secret.metadata.namespace.clone().unwrap_or_default(),
        secret_type: secret_type(secret),
        age: age_since(created(&secret.metadata), now),
        labels: secret.metadata.labels.clone().unwrap_or_default(),
        data,
    }
}

/// Metadata for a fresh copy in `namespace`: name, labels and annotations only
fn copied_meta(source: &ObjectMeta, namespace: &str) -> ObjectMeta {
    let annotations = source.annotations.clone().map(|mut a| {
        a.remove(LAST_APPLIED);
        a
    });
    ObjectMeta {
        name: source.name.clone(),
        namespace: Some(namespace.to_string()),
        labels: source.labels.clone(),
        annotations: annotations.filter(|a| !a.is_empty()),
        ..Default::default()
    }
}

pub fn config_map_copy(source: &ConfigMap, namespace: &str) -> ConfigMap {
    ConfigMap {
        metadata: copied_meta(&source.metadata, namespace),
        data: source.data.clone(),
        binary_data: source.binary_data.clone(),
        immutable: source.immutable,
    }
}

pub fn secret_copy(source: &Secret, namespace: &str) -> Secret {
    Secret {
        metadata: copied_meta(&source.metadata, namespace),
        data: source.data.clone(),
        string_data: None,
        type_: source.type_.clone(),
        immutable: source.immutable,
    }
}

fn overwrite_config_map(existing: &mut ConfigMap, source: &ConfigMap) {
    existing.data = source.data.clone();
    existing.binary_data = source.binary_data.clone();
}

fn overwrite_secret(existing: &mut Secret, source: &Secret) {
    existing.data = source.data.clone();
    existing.string_data = None;
    existing.type_ = source.type_.clone();
}

impl KubeRepository {
    /// Create `name` in the target namespace from the source object, or
    /// overwrite the existing one's contents when it is already there.
    async fn copy_object<K>(
        &self,
        cancel: &CancellationToken,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
        build: fn(&K, &str) -> K,
        overwrite: fn(&mut K, &K),
    ) -> Result<()>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + Debug
            + Serialize
            + DeserializeOwned
            + Send
            + Sync,
        <K as Resource>::DynamicType: Default,
    {
        let kind = K::kind(&Default::default()).to_string();
        let kind = kind.as_str();
        let source_api: Api<K> = self.namespaced(source_namespace);
        let target_api: Api<K> = self.namespaced(target_namespace);
        let source = get_named(cancel, &source_api, kind, name).await?;

        let copy = build(&source, target_namespace);
        let created = guard(cancel, async {
            Ok(target_api.create(&PostParams::default(), &copy).await?)
        })
        .await;

        match created {
            Ok(_) => {
                tracing::info!(
                    kind = %kind,
                    name = %name,
                    from = %source_namespace,
                    to = %target_namespace,
                    "copied",
                );
                Ok(())
            }
            Err(Error::Transport(e)) if is_already_exists(&e) => {
                let mut existing = get_named(cancel, &target_api, kind, name).await?;
                overwrite(&mut existing, &source);
                guard(cancel, async {
                    Ok(target_api
                        .replace(name, &PostParams::default(), &existing)
                        .await?)
                })
                .await?;
                tracing::info!(
                    kind = %kind,
                    name = %name,
                    to = %target_namespace,
                    "overwrote existing copy",
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ConfigRepository for KubeRepository {
    async fn list_config_maps(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<ConfigMapInfo>> {
        let api: Api<ConfigMap> = self.namespaced(namespace);
        let items = list_all(cancel, &api, &ListParams::default()).await?;
        let now = Utc::now();
        let mut rows: Vec<ConfigMapInfo> =
            items.iter().map(|cm| config_map_to_info(cm, now)).collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn get_config_map(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<ConfigMapData> {
        let api: Api<ConfigMap> = self.namespaced(namespace);
        let cm = get_named(cancel, &api, "ConfigMap", name).await?;
        Ok(config_map_to_data(&cm, Utc::now()))
    }

    async fn list_secrets(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<SecretInfo>> {
        let api: Api<Secret> = self.namespaced(namespace);
        let items = list_all(cancel, &api, &ListParams::default()).await?;
        let now = Utc::now();
        let mut rows: Vec<SecretInfo> = items.iter().map(|s| secret_to_info(s, now)).collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn get_secret(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<SecretData> {
        let api: Api<Secret> = self.namespaced(namespace);
        let secret = get_named(cancel, &api, "Secret", name).await?;
        Ok(secret_to_data(&secret, Utc::now()))
    }

    async fn copy_config_map_to_namespace(
        &self,
        cancel: &CancellationToken,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> Result<()> {
        self.copy_object(
            cancel,
            source_namespace,
            name,
            target_namespace,
            config_map_copy,
            overwrite_config_map,
        )
        .await
    }

    async fn copy_secret_to_namespace(
        &self,
        cancel: &CancellationToken,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> Result<()> {
        self.copy_object(
            cancel,
            source_namespace,
            name,
            target_namespace,
            secret_copy,
            overwrite_secret,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn config_map_rows_count_binary_keys() {
        let cm: ConfigMap = serde_json::from_value(json!({
            "metadata": {"name": "app", "namespace": "default",
                         "creationTimestamp": "2024-01-15T11:00:00Z"},
            "data": {"a.yaml": "x: 1", "b": "2"},
            "binaryData": {"logo.png": "iVBORw0K"}
        }))
        .unwrap();
        let info = config_map_to_info(&cm, now());
        assert_eq!(info.key_count, 3);
        assert_eq!(info.age, "1h");

        let data = config_map_to_data(&cm, now());
        assert_eq!(data.data["a.yaml"], "x: 1");
        assert_eq!(data.data["logo.png"], "<binary: 6 bytes>");
    }

    #[test]
    fn secret_values_are_decoded() {
        let secret: Secret = serde_json::from_value(json!({
            "metadata": {"name": "db", "namespace": "default"},
            "type": "kubernetes.io/basic-auth",
            "data": {"username": "YWRtaW4=", "password": "czNjcjN0"}
        }))
        .unwrap();
        let info = secret_to_info(&secret, now());
        assert_eq!(info.secret_type, "kubernetes.io/basic-auth");
        assert_eq!(info.key_count, 2);
        let data = secret_to_data(&secret, now());
        assert_eq!(data.data["username"], "admin");
        assert_eq!(data.data["password"], "s3cr3t");
    }

    #[test]
    fn secret_type_defaults_to_opaque() {
        let secret: Secret =
            serde_json::from_value(json!({"metadata": {"name": "s", "namespace": "x"}})).unwrap();
        assert_eq!(secret_to_info(&secret, now()).secret_type, "Opaque");
    }

    #[test]
    fn copy_drops_server_fields() {
        let cm: ConfigMap = serde_json::from_value(json!({
            "metadata": {
                "name": "app", "namespace": "default", "resourceVersion": "42", "uid": "abc",
                "labels": {"app": "web"},
                "annotations": {"kubectl.kubernetes.io/last-applied-configuration": "{}"}
            },
            "data": {"k": "v"}
        }))
        .unwrap();
        let copy = config_map_copy(&cm, "staging");
        assert_eq!(copy.metadata.namespace.as_deref(), Some("staging"));
        assert_eq!(copy.metadata.name.as_deref(), Some("app"));
        assert!(copy.metadata.resource_version.is_none());
        assert!(copy.metadata.uid.is_none());
        assert!(copy.metadata.annotations.is_none());
        assert_eq!(copy.metadata.labels.unwrap()["app"], "web");
        assert_eq!(copy.data.unwrap()["k"], "v");
    }

    #[test]
    fn overwrite_replaces_data_and_type() {
        let source: Secret = serde_json::from_value(json!({
            "metadata": {"name": "tls", "namespace": "a"},
            "type": "kubernetes.io/tls",
            "data": {"tls.crt": "Y2VydA=="}
        }))
        .unwrap();
        let mut existing: Secret = serde_json::from_value(json!({
            "metadata": {"name": "tls", "namespace": "b", "resourceVersion": "7"},
            "type": "Opaque",
            "data": {"old": "eA=="}
        }))
        .unwrap();
        overwrite_secret(&mut existing, &source);
        assert_eq!(existing.type_.as_deref(), Some("kubernetes.io/tls"));
        assert!(existing.data.as_ref().unwrap().contains_key("tls.crt"));
        assert!(!existing.data.as_ref().unwrap().contains_key("old"));
        assert_eq!(existing.metadata.resource_version.as_deref(), Some("7"));
    }
}
