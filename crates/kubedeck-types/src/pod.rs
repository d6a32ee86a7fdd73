use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// First owner reference of an object
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
}

impl OwnerRef {
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty() && self.name.is_empty()
    }
}

/// Detail view of a pod
#[derive(Clone, Debug, Default, Serialize)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub node_name: String,
    pub pod_ip: String,
    pub host_ip: String,
    pub phase: String,
    pub status: String,
    pub ready: String,
    pub restarts: i32,
    pub age: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub containers: Vec<ContainerInfo>,
    pub init_containers: Vec<ContainerInfo>,
    pub conditions: Vec<ConditionInfo>,
    pub owner: OwnerRef,
    pub qos_class: String,
    pub service_account: String,
    pub volumes: Vec<VolumeInfo>,
    pub tolerations: Vec<TolerationInfo>,
    pub node_selector: BTreeMap<String, String>,
    pub termination_grace_period: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
}

impl PodInfo {
    pub fn new(name: String, namespace: String) -> Self {
        Self {
            name,
            namespace,
            ..Default::default()
        }
    }

    /// Names of regular containers, in spec order
    pub fn container_names(&self) -> Vec<String> {
        self.containers.iter().map(|c| c.name.clone()).collect()
    }
}

/// Lifecycle state of a container
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ContainerState {
    Running,
    #[default]
    Waiting,
    Terminated,
}

impl ContainerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Waiting => "Waiting",
            Self::Terminated => "Terminated",
        }
    }
}

/// Requests and limits, rendered as quantity strings (empty when unset)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResourceRequirements {
    pub cpu_request: String,
    pub cpu_limit: String,
    pub memory_request: String,
    pub memory_limit: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    pub name: String,
    pub container_port: i32,
    pub protocol: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProbeInfo {
    /// Human readable handler, e.g. "HTTP GET /healthz :8080"
    pub handler: String,
    pub initial_delay: i32,
    pub period: i32,
    pub timeout: i32,
    pub success_threshold: i32,
    pub failure_threshold: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProbeSet {
    pub liveness: Option<ProbeInfo>,
    pub readiness: Option<ProbeInfo>,
    pub startup: Option<ProbeInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SecurityInfo {
    pub run_as_user: Option<i64>,
    pub run_as_non_root: Option<bool>,
    pub privileged: Option<bool>,
    pub read_only_root_filesystem: Option<bool>,
    pub allow_privilege_escalation: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MountInfo {
    pub name: String,
    pub mount_path: String,
    pub read_only: bool,
}

/// Per-container view of a pod
#[derive(Clone, Debug, Default, Serialize)]
pub struct ContainerInfo {
    pub name: String,
    pub image: String,
    pub image_pull_policy: String,
    pub ready: bool,
    pub started: bool,
    pub restart_count: i32,
    pub state: ContainerState,
    pub reason: String,
    pub message: String,
    /// Only set when `state` is `Terminated`
    pub exit_code: Option<i32>,
    pub last_termination_reason: String,
    pub resources: ResourceRequirements,
    pub ports: Vec<PortInfo>,
    pub probes: ProbeSet,
    pub security_context: Option<SecurityInfo>,
    pub env_count: usize,
    pub volume_mounts: Vec<MountInfo>,
}

impl ContainerInfo {
    pub fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// True when the container runs without an effective memory limit
    pub fn lacks_memory_limit(&self) -> bool {
        let limit = self.resources.memory_limit.trim();
        limit.is_empty() || limit == "0"
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConditionInfo {
    pub condition_type: String,
    pub status: String,
    pub reason: String,
    pub message: String,
    pub last_transition: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VolumeInfo {
    pub name: String,
    /// Source kind, e.g. "ConfigMap", "Secret", "PersistentVolumeClaim"
    pub kind: String,
    /// Referenced object or path, if any
    pub source: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TolerationInfo {
    pub key: String,
    pub operator: String,
    pub value: String,
    pub effect: String,
    pub toleration_seconds: Option<i64>,
}
