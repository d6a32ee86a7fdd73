use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

// ============================================================================
// Namespaces and nodes
// ============================================================================

/// Namespace information
#[derive(Clone, Debug, Default, Serialize)]
pub struct NamespaceInfo {
    pub name: String,
    pub status: String,
    pub age: String,
    pub labels: BTreeMap<String, String>,
}

impl NamespaceInfo {
    pub fn new(name: String, status: String) -> Self {
        Self {
            name,
            status,
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == "Active"
    }
}

/// Node row and detail view
#[derive(Clone, Debug, Default, Serialize)]
pub struct NodeInfo {
    pub name: String,
    /// "Ready" or "NotReady"
    pub status: String,
    /// Comma separated roles, or "<none>"
    pub roles: String,
    pub age: String,
    pub kubelet_version: String,
    pub internal_ip: String,
    pub os_image: String,
    pub container_runtime: String,
    pub pod_count: usize,
    pub cpu: String,
    pub memory: String,
    pub allocatable_cpu: String,
    pub allocatable_memory: String,
    pub unschedulable: bool,
    pub taints: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

// ============================================================================
// Events
// ============================================================================

/// One event row
#[derive(Clone, Debug, Default, Serialize)]
pub struct EventInfo {
    /// "Normal" or "Warning"
    pub event_type: String,
    pub reason: String,
    pub message: String,
    pub source: String,
    pub age: String,
    pub count: i32,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    /// "Kind/Name"
    pub object: String,
}

impl EventInfo {
    pub fn is_warning(&self) -> bool {
        self.event_type == "Warning"
    }

    /// Name part of `object`
    pub fn object_name(&self) -> &str {
        self.object
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.object)
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Usage snapshot of one container
#[derive(Clone, Debug, Default, Serialize)]
pub struct ContainerMetrics {
    pub name: String,
    /// Formatted CPU usage, e.g. "250m" or "1.50"
    pub cpu_usage: String,
    /// Formatted memory usage, e.g. "128.0Mi"
    pub memory_usage: String,
    pub cpu_millis: i64,
    pub memory_bytes: i64,
    /// Usage relative to the container's limit, when one is set
    pub cpu_percent: Option<f64>,
    pub mem_percent: Option<f64>,
}

/// Usage snapshot of one pod
#[derive(Clone, Debug, Default, Serialize)]
pub struct PodMetrics {
    pub name: String,
    pub namespace: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub containers: Vec<ContainerMetrics>,
}

impl PodMetrics {
    pub fn total_cpu_millis(&self) -> i64 {
        self.containers.iter().map(|c| c.cpu_millis).sum()
    }

    pub fn total_memory_bytes(&self) -> i64 {
        self.containers.iter().map(|c| c.memory_bytes).sum()
    }
}

// ============================================================================
// Autoscalers
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum HpaMetricType {
    Resource,
    Pods,
    Object,
    External,
}

impl HpaMetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "Resource",
            Self::Pods => "Pods",
            Self::Object => "Object",
            Self::External => "External",
        }
    }
}

impl std::fmt::Display for HpaMetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rendered autoscaler metric
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HpaMetric {
    pub metric_type: HpaMetricType,
    pub name: String,
    pub target: String,
    pub current: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HpaCondition {
    pub condition_type: String,
    pub status: String,
    pub reason: String,
    pub message: String,
}

/// Autoscaler detail
#[derive(Clone, Debug, Default, Serialize)]
pub struct HpaData {
    pub name: String,
    pub namespace: String,
    /// "Kind/Name" of the scale target
    pub reference: String,
    pub min_replicas: i32,
    pub max_replicas: i32,
    pub current_replicas: i32,
    pub desired_replicas: i32,
    pub metrics: Vec<HpaMetric>,
    pub conditions: Vec<HpaCondition>,
    pub last_scale_time: Option<DateTime<Utc>>,
    pub age: String,
}

/// Autoscaler list row
#[derive(Clone, Debug, Default, Serialize)]
pub struct HpaInfo {
    pub name: String,
    pub namespace: String,
    pub reference: String,
    /// "name: current/target" entries, or "<none>"
    pub targets: String,
    pub min_replicas: i32,
    pub max_replicas: i32,
    pub current_replicas: i32,
    pub age: String,
}

// ============================================================================
// Config objects
// ============================================================================

#[derive(Clone, Debug, Default, Serialize)]
pub struct ConfigMapInfo {
    pub name: String,
    pub namespace: String,
    pub age: String,
    pub key_count: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ConfigMapData {
    pub name: String,
    pub namespace: String,
    pub age: String,
    pub labels: BTreeMap<String, String>,
    pub data: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SecretInfo {
    pub name: String,
    pub namespace: String,
    pub secret_type: String,
    pub age: String,
    pub key_count: usize,
}

/// Secret with its values decoded to strings
#[derive(Clone, Debug, Default, Serialize)]
pub struct SecretData {
    pub name: String,
    pub namespace: String,
    pub secret_type: String,
    pub age: String,
    pub labels: BTreeMap<String, String>,
    pub data: BTreeMap<String, String>,
}
