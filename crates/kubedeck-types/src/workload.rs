use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Workload kinds that can be listed, scaled or restarted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Pods,
    Deployments,
    StatefulSets,
    DaemonSets,
    Jobs,
    CronJobs,
    Rollouts,
}

/// Returned when a string does not name a known workload kind
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource type: {0}")]
pub struct UnknownResourceType(pub String);

impl ResourceType {
    pub const ALL: [ResourceType; 7] = [
        Self::Pods,
        Self::Deployments,
        Self::StatefulSets,
        Self::DaemonSets,
        Self::Jobs,
        Self::CronJobs,
        Self::Rollouts,
    ];

    /// Plural resource name, as used in URLs and the UI
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pods => "pods",
            Self::Deployments => "deployments",
            Self::StatefulSets => "statefulsets",
            Self::DaemonSets => "daemonsets",
            Self::Jobs => "jobs",
            Self::CronJobs => "cronjobs",
            Self::Rollouts => "rollouts",
        }
    }

    /// Object kind as it appears in owner references and events
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pods => "Pod",
            Self::Deployments => "Deployment",
            Self::StatefulSets => "StatefulSet",
            Self::DaemonSets => "DaemonSet",
            Self::Jobs => "Job",
            Self::CronJobs => "CronJob",
            Self::Rollouts => "Rollout",
        }
    }

    /// Name used when reporting scale operations.
    ///
    /// DaemonSets keep their plural form; they are never scaled so nothing
    /// downstream reads this value for them.
    pub fn scale_resource_type(&self) -> &'static str {
        match self {
            Self::Deployments => "deployment",
            Self::StatefulSets => "statefulset",
            Self::Rollouts => "rollout",
            other => other.as_str(),
        }
    }

    pub fn is_scalable(&self) -> bool {
        matches!(self, Self::Deployments | Self::StatefulSets | Self::Rollouts)
    }

    pub fn is_restartable(&self) -> bool {
        matches!(
            self,
            Self::Deployments | Self::StatefulSets | Self::DaemonSets | Self::Rollouts
        )
    }
}

impl FromStr for ResourceType {
    type Err = UnknownResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pods" | "pod" | "po" => Ok(Self::Pods),
            "deployments" | "deployment" | "deploy" => Ok(Self::Deployments),
            "statefulsets" | "statefulset" | "sts" => Ok(Self::StatefulSets),
            "daemonsets" | "daemonset" | "ds" => Ok(Self::DaemonSets),
            "jobs" | "job" => Ok(Self::Jobs),
            "cronjobs" | "cronjob" | "cj" => Ok(Self::CronJobs),
            "rollouts" | "rollout" | "ro" => Ok(Self::Rollouts),
            _ => Err(UnknownResourceType(s.to_string())),
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a workload listing
#[derive(Clone, Debug, Serialize)]
pub struct WorkloadInfo {
    pub name: String,
    pub namespace: String,
    pub resource_type: ResourceType,
    /// "ready/desired"
    pub ready: String,
    pub replicas: i32,
    pub age: String,
    pub status: String,
    pub labels: BTreeMap<String, String>,
    /// Label selector used to find the workload's pods
    pub selector: BTreeMap<String, String>,
    pub restart_count: i32,
    pub created: Option<DateTime<Utc>>,
}

impl WorkloadInfo {
    pub fn new(name: String, namespace: String, resource_type: ResourceType) -> Self {
        Self {
            name,
            namespace,
            resource_type,
            ready: "0/0".to_string(),
            replicas: 0,
            age: String::new(),
            status: String::new(),
            labels: BTreeMap::new(),
            selector: BTreeMap::new(),
            restart_count: 0,
            created: None,
        }
    }

    /// "Kind/Name", as used for event objects
    pub fn object_ref(&self) -> String {
        format!("{}/{}", self.resource_type.kind(), self.name)
    }
}
