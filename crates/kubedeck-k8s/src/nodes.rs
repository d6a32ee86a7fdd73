//! Nodes

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::{Api, ListParams};
use std::collections::{BTreeMap, HashMap};
use tokio_util::sync::CancellationToken;

use kubedeck_types::NodeInfo;

use crate::client::{KubeRepository, best_effort, get_named, list_all};
use crate::error::Result;
use crate::format::{age_since, cpu_millis, format_cpu, format_memory, memory_bytes};
use crate::repository::NodeRepository;

const ROLE_LABEL_PREFIX: &str = "node-role.";

/// Roles from `node-role.<domain>/<role>` labels, comma separated, or `<none>`
pub fn node_roles(labels: &BTreeMap<String, String>) -> String {
    let mut roles: Vec<&str> = labels
        .keys()
        .filter(|k| k.starts_with(ROLE_LABEL_PREFIX))
        .filter_map(|k| k.split_once('/').map(|(_, role)| role))
        .filter(|role| !role.is_empty())
        .collect();
    roles.sort_unstable();
    roles.dedup();
    if roles.is_empty() {
        "<none>".to_string()
    } else {
        roles.join(",")
    }
}

/// Node row. `pod_count` is filled in by the caller.
pub fn node_to_info(node: &Node, now: DateTime<Utc>) -> NodeInfo {
    let meta = &node.metadata;
    let labels = meta.labels.clone().unwrap_or_default();
    let mut info = NodeInfo {
        name: meta.name.clone().unwrap_or_default(),
        roles: node_roles(&labels),
        age: age_since(meta.creation_timestamp.as_ref().map(|t| t.0), now),
        labels,
        status: "NotReady".to_string(),
        ..Default::default()
    };

    if let Some(spec) = &node.spec {
        info.unschedulable = spec.unschedulable.unwrap_or(false);
        info.taints = spec
            .taints
            .iter()
            .flatten()
            .map(|t| match t.value.as_deref().filter(|v| !v.is_empty()) {
                Some(value) => format!("{}={value}:{}", t.key, t.effect),
                None => format!("{}:{}", t.key, t.effect),
            })
            .collect();
    }

    let Some(status) = &node.status else {
        return info;
    };
    let ready = status
        .conditions
        .iter()
        .flatten()
        .any(|c| c.type_ == "Ready" && c.status == "True");
    if ready {
        info.status = "Ready".to_string();
    }
    if let Some(system) = &status.node_info {
        info.kubelet_version = system.kubelet_version.clone();
        info.os_image = system.os_image.clone();
        info.container_runtime = system.container_runtime_version.clone();
    }
    info.internal_ip = status
        .addresses
        .iter()
        .flatten()
        .find(|a| a.type_ == "InternalIP")
        .map(|a| a.address.clone())
        .unwrap_or_default();

    let quantity = |map: Option<&BTreeMap<String, Quantity>>, key: &str| -> String {
        map.and_then(|m| m.get(key))
            .map(|q| q.0.clone())
            .unwrap_or_default()
    };
    info.cpu = format_cpu(cpu_millis(&quantity(status.capacity.as_ref(), "cpu")));
    info.memory = format_memory(memory_bytes(&quantity(status.capacity.as_ref(), "memory")));
    info.allocatable_cpu = format_cpu(cpu_millis(&quantity(status.allocatable.as_ref(), "cpu")));
    info.allocatable_memory =
        format_memory(memory_bytes(&quantity(status.allocatable.as_ref(), "memory")));
    info
}

/// Pods per node name
fn count_by_node(pods: &[Pod]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for node in pods
        .iter()
        .filter_map(|p| p.spec.as_ref().and_then(|s| s.node_name.clone()))
    {
        *counts.entry(node).or_insert(0) += 1;
    }
    counts
}

#[async_trait]
impl NodeRepository for KubeRepository {
    async fn list_nodes(&self, cancel: &CancellationToken) -> Result<Vec<NodeInfo>> {
        let api: Api<Node> = self.cluster();
        let nodes = list_all(cancel, &api, &ListParams::default()).await?;

        let pods: Api<Pod> = self.all_namespaces();
        let counts = best_effort(
            list_all(cancel, &pods, &ListParams::default()).await,
            "pods for node counts",
        )?
        .map(|pods| count_by_node(&pods))
        .unwrap_or_default();

        let now = Utc::now();
        let mut rows: Vec<NodeInfo> = nodes
            .iter()
            .map(|n| {
                let mut info = node_to_info(n, now);
                info.pod_count = counts.get(&info.name).copied().unwrap_or(0);
                info
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn get_node(&self, cancel: &CancellationToken, name: &str) -> Result<NodeInfo> {
        let api: Api<Node> = self.cluster();
        let node = get_named(cancel, &api, "Node", name).await?;
        let mut info = node_to_info(&node, Utc::now());

        let pods: Api<Pod> = self.all_namespaces();
        let lp = ListParams::default().fields(&format!("spec.nodeName={name}"));
        if let Some(pods) = best_effort(list_all(cancel, &pods, &lp).await, "pods on node")? {
            info.pod_count = pods.len();
        }
        Ok(info)
    }
}
