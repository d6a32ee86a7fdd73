//! Horizontal pod autoscalers
//!
//! Metric specs and statuses are rendered into `(type, name, target, current)`
//! rows. Quantities are shown in canonical form, utilization as a percentage,
//! and a current value the controller has not reported yet as `<unknown>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::autoscaling::v2::{
    HorizontalPodAutoscaler, MetricSpec, MetricStatus, MetricTarget, MetricValueStatus,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::{Api, ListParams};
use tokio_util::sync::CancellationToken;

use kubedeck_types::{HpaCondition, HpaData, HpaInfo, HpaMetric, HpaMetricType};

use crate::client::{KubeRepository, get_named, list_all};
use crate::error::Result;
use crate::format::{age_since, canonical_quantity};
use crate::repository::AutoscalingRepository;

const UNKNOWN: &str = "<unknown>";

fn quantity(q: Option<&Quantity>) -> Option<String> {
    q.map(|q| canonical_quantity(&q.0))
}

fn percent(p: Option<i32>) -> Option<String> {
    p.map(|p| format!("{p}%"))
}

/// Value, falling back to average value
fn value_or_average(value: Option<&Quantity>, average: Option<&Quantity>) -> Option<String> {
    quantity(value).or_else(|| quantity(average))
}

/// Target and current for a resource metric. Utilization targets compare
/// against current utilization, value targets against current average value.
fn resource_pair(target: &MetricTarget, current: Option<&MetricValueStatus>) -> (String, String) {
    match target.average_utilization {
        Some(pct) => (
            format!("{pct}%"),
            percent(current.and_then(|c| c.average_utilization)).unwrap_or_else(|| UNKNOWN.into()),
        ),
        None => (
            quantity(target.average_value.as_ref()).unwrap_or_else(|| UNKNOWN.into()),
            quantity(current.and_then(|c| c.average_value.as_ref()))
                .unwrap_or_else(|| UNKNOWN.into()),
        ),
    }
}

fn value_pair(target: &MetricTarget, current: Option<&MetricValueStatus>) -> (String, String) {
    (
        value_or_average(target.value.as_ref(), target.average_value.as_ref())
            .unwrap_or_else(|| UNKNOWN.into()),
        current
            .and_then(|c| value_or_average(c.value.as_ref(), c.average_value.as_ref()))
            .unwrap_or_else(|| UNKNOWN.into()),
    )
}

/// Status entry reported for the same metric as `spec`
fn matching_status<'a>(
    spec: &MetricSpec,
    statuses: &'a [MetricStatus],
) -> Option<&'a MetricStatus> {
    statuses.iter().find(|s| {
        if s.type_ != spec.type_ {
            return false;
        }
        match (spec, s) {
            (MetricSpec { resource: Some(a), .. }, MetricStatus { resource: Some(b), .. }) => {
                a.name == b.name
            }
            (
                MetricSpec { container_resource: Some(a), .. },
                MetricStatus { container_resource: Some(b), .. },
            ) => a.name == b.name && a.container == b.container,
            (MetricSpec { pods: Some(a), .. }, MetricStatus { pods: Some(b), .. }) => {
                a.metric.name == b.metric.name
            }
            (MetricSpec { object: Some(a), .. }, MetricStatus { object: Some(b), .. }) => {
                a.metric.name == b.metric.name
            }
            (MetricSpec { external: Some(a), .. }, MetricStatus { external: Some(b), .. }) => {
                a.metric.name == b.metric.name
            }
            _ => false,
        }
    })
}

/// Render one metric spec. Unrecognised metric types yield `None`.
pub fn render_metric(spec: &MetricSpec, statuses: &[MetricStatus]) -> Option<HpaMetric> {
    let status = matching_status(spec, statuses);

    let (metric_type, name, (target, current)) = if let Some(r) = &spec.resource {
        let current = status.and_then(|s| s.resource.as_ref()).map(|s| &s.current);
        (HpaMetricType::Resource, r.name.clone(), resource_pair(&r.target, current))
    } else if let Some(r) = &spec.container_resource {
        let current = status
            .and_then(|s| s.container_resource.as_ref())
            .map(|s| &s.current);
        (HpaMetricType::Resource, r.name.clone(), resource_pair(&r.target, current))
    } else if let Some(p) = &spec.pods {
        let current = status.and_then(|s| s.pods.as_ref()).map(|s| &s.current);
        let target = quantity(p.target.average_value.as_ref()).unwrap_or_else(|| UNKNOWN.into());
        let current = quantity(current.and_then(|c| c.average_value.as_ref()))
            .unwrap_or_else(|| UNKNOWN.into());
        (HpaMetricType::Pods, p.metric.name.clone(), (target, current))
    } else if let Some(o) = &spec.object {
        let current = status.and_then(|s| s.object.as_ref()).map(|s| &s.current);
        (HpaMetricType::Object, o.metric.name.clone(), value_pair(&o.target, current))
    } else if let Some(e) = &spec.external {
        let current = status.and_then(|s| s.external.as_ref()).map(|s| &s.current);
        (HpaMetricType::External, e.metric.name.clone(), value_pair(&e.target, current))
    } else {
        return None;
    };

    Some(HpaMetric {
        metric_type,
        name,
        target,
        current,
    })
}

/// `name: current/target` entries, comma separated, or `<none>`
pub fn format_hpa_targets(metrics: &[HpaMetric]) -> String {
    if metrics.is_empty() {
        return "<none>".to_string();
    }
    metrics
        .iter()
        .map(|m| format!("{}: {}/{}", m.name, m.current, m.target))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn hpa_to_data(hpa: &HorizontalPodAutoscaler, now: DateTime<Utc>) -> HpaData {
    let meta = &hpa.metadata;
    let mut data = HpaData {
        name: meta.name.clone().unwrap_or_default(),
        namespace: meta.namespace.clone().unwrap_or_default(),
        age: age_since(meta.creation_timestamp.as_ref().map(|t| t.0), now),
        ..Default::default()
    };

    let status = hpa.status.as_ref();
    let statuses = status
        .and_then(|s| s.current_metrics.as_deref())
        .unwrap_or(&[]);

    if let Some(spec) = &hpa.spec {
        let target = &spec.scale_target_ref;
        data.reference = format!("{}/{}", target.kind, target.name);
        data.min_replicas = spec.min_replicas.unwrap_or(1);
        data.max_replicas = spec.max_replicas;
        data.metrics = spec
            .metrics
            .iter()
            .flatten()
            .filter_map(|m| render_metric(m, statuses))
            .collect();
    }

    if let Some(status) = status {
        data.current_replicas = status.current_replicas.unwrap_or(0);
        data.desired_replicas = status.desired_replicas;
        data.last_scale_time = status.last_scale_time.as_ref().map(|t| t.0);
        data.conditions = status
            .conditions
            .iter()
            .flatten()
            .map(|c| HpaCondition {
                condition_type: c.type_.clone(),
                status: c.status.clone(),
                reason: c.reason.clone().unwrap_or_default(),
                message: c.message.clone().unwrap_or_default(),
            })
            .collect();
    }
    data
}

pub fn hpa_to_info(data: &HpaData) -> HpaInfo {
    HpaInfo {
        name: data.name.clone(),
        namespace: data.namespace.clone(),
        reference: data.reference.clone(),
        targets: format_hpa_targets(&data.metrics),
        min_replicas: data.min_replicas,
        max_replicas: data.max_replicas,
        current_replicas: data.current_replicas,
        age: data.age.clone(),
    }
}

#[async_trait]
impl AutoscalingRepository for KubeRepository {
    async fn list_hpas(&self, cancel: &CancellationToken, namespace: &str) -> Result<Vec<HpaInfo>> {
        let api: Api<HorizontalPodAutoscaler> = self.namespaced(namespace);
        let items = list_all(cancel, &api, &ListParams::default()).await?;
        let now = Utc::now();
        let mut rows: Vec<HpaInfo> = items
            .iter()
            .map(|h| hpa_to_info(&hpa_to_data(h, now)))
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn get_hpa(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<HpaData> {
        let api: Api<HorizontalPodAutoscaler> = self.namespaced(namespace);
        let hpa = get_named(cancel, &api, "HorizontalPodAutoscaler", name).await?;
        Ok(hpa_to_data(&hpa, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hpa(value: serde_json::Value) -> HorizontalPodAutoscaler {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn cpu_utilization_target_and_current() {
        let h = hpa(json!({
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {
                "scaleTargetRef": {"kind": "Deployment", "name": "web", "apiVersion": "apps/v1"},
                "minReplicas": 2, "maxReplicas": 10,
                "metrics": [{"type": "Resource", "resource": {"name": "cpu",
                    "target": {"type": "Utilization", "averageUtilization": 80}}}]
            },
            "status": {
                "currentReplicas": 3, "desiredReplicas": 3,
                "currentMetrics": [{"type": "Resource", "resource": {"name": "cpu",
                    "current": {"averageUtilization": 75, "averageValue": "120m"}}}]
            }
        }));
        let data = hpa_to_data(&h, Utc::now());
        assert_eq!(data.reference, "Deployment/web");
        assert_eq!(data.min_replicas, 2);
        assert_eq!(data.metrics.len(), 1);
        let m = &data.metrics[0];
        assert_eq!(m.metric_type, HpaMetricType::Resource);
        assert_eq!(m.name, "cpu");
        assert_eq!(m.target, "80%");
        assert_eq!(m.current, "75%");
        assert_eq!(hpa_to_info(&data).targets, "cpu: 75%/80%");
    }

    #[test]
    fn external_value_in_canonical_form() {
        let h = hpa(json!({
            "metadata": {"name": "worker", "namespace": "default"},
            "spec": {
                "scaleTargetRef": {"kind": "Deployment", "name": "worker"},
                "maxReplicas": 20,
                "metrics": [{"type": "External", "external": {
                    "metric": {"name": "sqs_queue_messages"},
                    "target": {"type": "Value", "value": "1000"}}}]
            }
        }));
        let data = hpa_to_data(&h, Utc::now());
        let m = &data.metrics[0];
        assert_eq!(m.metric_type, HpaMetricType::External);
        assert_eq!(m.name, "sqs_queue_messages");
        assert_eq!(m.target, "1k");
        assert_eq!(m.current, "<unknown>");
        assert_eq!(data.min_replicas, 1);
    }

    #[test]
    fn memory_average_value_and_pods_metric() {
        let h = hpa(json!({
            "metadata": {"name": "api", "namespace": "default"},
            "spec": {
                "scaleTargetRef": {"kind": "Rollout", "name": "api"},
                "maxReplicas": 5,
                "metrics": [
                    {"type": "Resource", "resource": {"name": "memory",
                        "target": {"type": "AverageValue", "averageValue": "128Mi"}}},
                    {"type": "Pods", "pods": {"metric": {"name": "rps"},
                        "target": {"type": "AverageValue", "averageValue": "500m"}}}
                ]
            },
            "status": {
                "desiredReplicas": 2,
                "currentMetrics": [
                    {"type": "Pods", "pods": {"metric": {"name": "rps"},
                        "current": {"averageValue": "0.25"}}},
                    {"type": "Resource", "resource": {"name": "memory",
                        "current": {"averageValue": "131072Ki"}}}
                ]
            }
        }));
        let data = hpa_to_data(&h, Utc::now());
        assert_eq!(data.metrics[0].target, "128Mi");
        assert_eq!(data.metrics[0].current, "128Mi");
        assert_eq!(data.metrics[1].metric_type, HpaMetricType::Pods);
        assert_eq!(data.metrics[1].target, "500m");
        assert_eq!(data.metrics[1].current, "250m");
        assert_eq!(
            format_hpa_targets(&data.metrics),
            "memory: 128Mi/128Mi, rps: 250m/500m"
        );
    }

    #[test]
    fn container_resource_renders_as_resource() {
        let h = hpa(json!({
            "metadata": {"name": "c", "namespace": "default"},
            "spec": {
                "scaleTargetRef": {"kind": "Deployment", "name": "c"},
                "maxReplicas": 3,
                "metrics": [{"type": "ContainerResource", "containerResource": {
                    "name": "cpu", "container": "app",
                    "target": {"type": "Utilization", "averageUtilization": 60}}}]
            }
        }));
        let data = hpa_to_data(&h, Utc::now());
        assert_eq!(data.metrics[0].metric_type, HpaMetricType::Resource);
        assert_eq!(data.metrics[0].target, "60%");
        assert_eq!(data.metrics[0].current, "<unknown>");
    }

    #[test]
    fn no_metrics_renders_none() {
        assert_eq!(format_hpa_targets(&[]), "<none>");
    }
}
