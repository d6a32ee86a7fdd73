//! Shared types for kubedeck
//!
//! This crate contains the value types produced by the cluster access layer and
//! consumed by the use cases and the terminal front end. Every value is built per
//! request and owned by its caller.

mod cluster;
mod logs;
mod pod;
mod related;
mod workload;

pub use cluster::{
    ConfigMapData, ConfigMapInfo, ContainerMetrics, EventInfo, HpaCondition, HpaData, HpaInfo,
    HpaMetric, HpaMetricType, NamespaceInfo, NodeInfo, PodMetrics, SecretData, SecretInfo,
};
pub use logs::{LogLine, LogOptions};
pub use pod::{
    ConditionInfo, ContainerInfo, ContainerState, MountInfo, OwnerRef, PodInfo, PortInfo,
    ProbeInfo, ProbeSet, ResourceRequirements, SecurityInfo, TolerationInfo, VolumeInfo,
};
pub use related::{
    GatewayInfo, GatewayServer, IngressInfo, OwnerInfo, RelatedResources, ServiceInfo,
    VirtualServiceInfo,
};
pub use workload::{ResourceType, UnknownResourceType, WorkloadInfo};

use serde::Serialize;

// ============================================================================
// Kubeconfig
// ============================================================================

/// Kubernetes context information
#[derive(Clone, Debug, Serialize)]
pub struct ContextInfo {
    pub name: String,
    pub cluster: String,
    pub user: String,
    pub namespace: Option<String>,
    pub is_current: bool,
}

impl ContextInfo {
    pub fn new(
        name: String,
        cluster: String,
        user: String,
        namespace: Option<String>,
        is_current: bool,
    ) -> Self {
        Self {
            name,
            cluster,
            user,
            namespace,
            is_current,
        }
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// How urgent a diagnostic hint is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    High,
    Medium,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Warning => "Warning",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A diagnostic hint about a pod, with things to try
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DebugHelper {
    pub issue: String,
    pub severity: Severity,
    pub suggestions: Vec<String>,
}

impl DebugHelper {
    pub fn new(issue: impl Into<String>, severity: Severity, suggestions: &[&str]) -> Self {
        Self {
            issue: issue.into(),
            severity,
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Everything the pod detail view shows, fetched in one pass
#[derive(Clone, Debug, Serialize)]
pub struct PodDetails {
    pub pod: PodInfo,
    pub logs: Vec<LogLine>,
    pub events: Vec<EventInfo>,
    pub metrics: Option<PodMetrics>,
    pub related: Option<RelatedResources>,
    pub node: Option<NodeInfo>,
    pub debug_helpers: Vec<DebugHelper>,
}

/// Pods and config objects of a single namespace
#[derive(Clone, Debug, Default, Serialize)]
pub struct NamespaceResources {
    pub namespace: String,
    pub pods: Vec<PodInfo>,
    pub config_maps: Vec<ConfigMapInfo>,
    pub secrets: Vec<SecretInfo>,
}

/// Outcome of a force namespace deletion sweep
///
/// `failures` holds one line per resource kind or item that could not be
/// listed or deleted. They never fail the operation itself.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ForceDeleteReport {
    pub namespace: String,
    pub deleted: usize,
    pub finalizers_removed: bool,
    pub failures: Vec<String>,
}

impl ForceDeleteReport {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }
}
