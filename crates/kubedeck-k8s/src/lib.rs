//! Kubernetes access layer for kubedeck
//!
//! Turns cluster objects into the compact views of `kubedeck-types`. The pure
//! conversion, correlation and rendering functions are public so they can be
//! used and tested without a cluster; [`KubeRepository`] wires them to a live
//! `kube::Client` behind the repository port traits.

mod actions;
mod capabilities;
mod client;
mod configs;
pub mod dynamic;
mod error;
mod events;
mod force_delete;
pub mod format;
mod hpa;
mod kubeconfig;
mod logs;
mod metrics;
mod namespaces;
mod nodes;
mod pods;
mod related;
mod repository;
pub mod status;
mod workloads;

pub use actions::{
    RESTARTED_AT_ANNOTATION, restart_patch, rollout_restart_patch, set_dynamic_replicas,
    with_replicas,
};
pub use capabilities::{
    Capabilities, gateway_resource, pod_metrics_resource, rollout_resource,
    virtual_service_resource,
};
pub use client::{KubeRepository, best_effort};
pub use configs::{
    config_map_copy, config_map_to_data, config_map_to_info, secret_copy, secret_to_data,
    secret_to_info,
};
pub use error::{Error, Result};
pub use events::{event_to_info, recent_warnings, sort_events};
pub use force_delete::sweep_targets;
pub use hpa::{format_hpa_targets, hpa_to_data, hpa_to_info, render_metric};
pub use kubeconfig::KubeContexts;
pub use logs::log_params;
pub use metrics::{ContainerLimits, container_limits, pod_metrics_from};
pub use namespaces::{active_names, namespace_to_info};
pub use nodes::{node_roles, node_to_info};
pub use pods::{container_info, pod_to_info, probe_info, volume_info};
pub use related::{
    config_refs, count_ready_endpoints, gateway_refs, gateway_to_info, host_targets_service,
    ingress_references_service, ingress_to_info, service_to_info, services_for_pod,
    virtual_service_matches, virtual_service_to_info,
};
pub use repository::{
    ActionRepository, AutoscalingRepository, ConfigRepository, ContextRepository,
    EventRepository, KubernetesRepository, MetricsRepository, NamespaceRepository,
    NodeRepository, PodRepository, WorkloadRepository,
};
pub use workloads::{
    cronjob_to_workload, daemonset_to_workload, deployment_to_workload, job_to_workload,
    pod_to_workload, rollout_to_workload, statefulset_to_workload,
};

// Re-export so callers can build a repository without naming kube directly
pub use kube::Client;
