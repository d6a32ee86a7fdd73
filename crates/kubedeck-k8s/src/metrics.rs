//! Pod usage from the metrics API

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DynamicObject, ListParams};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use kubedeck_types::{ContainerMetrics, PodMetrics};

use crate::client::{KubeRepository, best_effort, get_named, list_all};
use crate::dynamic;
use crate::error::{Error, Result};
use crate::format::{cpu_millis, format_cpu, format_memory, memory_bytes, percent_of};
use crate::repository::MetricsRepository;

/// CPU (millicores) and memory (bytes) limits per container name
pub type ContainerLimits = HashMap<String, (i64, i64)>;

pub fn container_limits(pod: &Pod) -> ContainerLimits {
    pod.spec
        .iter()
        .flat_map(|s| s.containers.iter())
        .map(|c| {
            let limits = c.resources.as_ref().and_then(|r| r.limits.as_ref());
            let cpu = limits
                .and_then(|l| l.get("cpu"))
                .map(|q| cpu_millis(&q.0))
                .unwrap_or(0);
            let memory = limits
                .and_then(|l| l.get("memory"))
                .map(|q| memory_bytes(&q.0))
                .unwrap_or(0);
            (c.name.clone(), (cpu, memory))
        })
        .collect()
}

/// Convert a `PodMetrics` object. Percentages are only set for containers
/// with a limit.
pub fn pod_metrics_from(object: &DynamicObject, limits: &ContainerLimits) -> PodMetrics {
    let data = &object.data;
    let timestamp = dynamic::str_at(data, &["timestamp"])
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc));

    let containers = dynamic::array_at(data, &["containers"])
        .iter()
        .map(|c| {
            let name = dynamic::str_at(c, &["name"]).unwrap_or_default().to_string();
            let cpu = cpu_millis(dynamic::str_at(c, &["usage", "cpu"]).unwrap_or("0"));
            let memory = memory_bytes(dynamic::str_at(c, &["usage", "memory"]).unwrap_or("0"));
            let (cpu_limit, mem_limit) = limits.get(&name).copied().unwrap_or((0, 0));
            ContainerMetrics {
                cpu_usage: format_cpu(cpu),
                memory_usage: format_memory(memory),
                cpu_millis: cpu,
                memory_bytes: memory,
                cpu_percent: percent_of(cpu, cpu_limit),
                mem_percent: percent_of(memory, mem_limit),
                name,
            }
        })
        .collect();

    PodMetrics {
        name: object.metadata.name.clone().unwrap_or_default(),
        namespace: object.metadata.namespace.clone().unwrap_or_default(),
        timestamp,
        containers,
    }
}

impl KubeRepository {
    fn metrics_api(&self, namespace: &str) -> Result<Api<DynamicObject>> {
        let ar = self
            .capabilities()
            .pod_metrics
            .as_ref()
            .ok_or_else(|| Error::Unavailable("metrics API".to_string()))?;
        Ok(Api::namespaced_with(self.client(), namespace, ar))
    }
}

#[async_trait]
impl MetricsRepository for KubeRepository {
    async fn get_pod_metrics(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
    ) -> Result<PodMetrics> {
        let api = self.metrics_api(namespace)?;
        let object = get_named(cancel, &api, "PodMetrics", pod).await?;

        let pods: Api<Pod> = self.namespaced(namespace);
        let limits = best_effort(get_named(cancel, &pods, "Pod", pod).await, "pod limits")?
            .map(|p| container_limits(&p))
            .unwrap_or_default();
        Ok(pod_metrics_from(&object, &limits))
    }

    async fn get_namespace_metrics(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<PodMetrics>> {
        let api = self.metrics_api(namespace)?;
        let objects = list_all(cancel, &api, &ListParams::default()).await?;

        let pods: Api<Pod> = self.namespaced(namespace);
        let limits: HashMap<String, ContainerLimits> = best_effort(
            list_all(cancel, &pods, &ListParams::default()).await,
            "pod limits",
        )?
        .unwrap_or_default()
        .iter()
        .map(|p| (p.metadata.name.clone().unwrap_or_default(), container_limits(p)))
        .collect();

        let empty = ContainerLimits::new();
        let mut rows: Vec<PodMetrics> = objects
            .iter()
            .map(|o| {
                let name = o.metadata.name.as_deref().unwrap_or_default();
                pod_metrics_from(o, limits.get(name).unwrap_or(&empty))
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}
