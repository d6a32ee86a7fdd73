//! Pod detail conversion and pod operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Container, ContainerStatus, Pod, Probe, Toleration, Volume};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{Api, DeleteParams, ListParams};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

use kubedeck_types::{
    ConditionInfo, ContainerInfo, ContainerState, EventInfo, LogLine, LogOptions, MountInfo,
    PodInfo, PortInfo, ProbeInfo, ProbeSet, RelatedResources, ResourceRequirements, SecurityInfo,
    TolerationInfo, VolumeInfo,
};

use crate::client::{KubeRepository, get_named, guard, list_all};
use crate::error::{Error, Result};
use crate::format::age_since;
use crate::repository::PodRepository;
use crate::status::{owner_of, pod_ready, pod_restarts, pod_status};

/// Name of a referenced object, whether the field is optional or not.
/// Empty names count as absent.
pub(crate) fn ref_name(name: impl Into<Option<String>>) -> Option<String> {
    name.into().filter(|n| !n.is_empty())
}

fn port_string(port: &IntOrString) -> String {
    match port {
        IntOrString::Int(n) => n.to_string(),
        IntOrString::String(s) => s.clone(),
    }
}

fn probe_handler(probe: &Probe) -> String {
    if let Some(http) = &probe.http_get {
        let path = http.path.as_deref().unwrap_or("/");
        format!("HTTP GET {path} :{}", port_string(&http.port))
    } else if let Some(tcp) = &probe.tcp_socket {
        format!("TCP :{}", port_string(&tcp.port))
    } else if let Some(exec) = &probe.exec {
        format!("Exec {}", exec.command.as_deref().unwrap_or(&[]).join(" "))
    } else if let Some(grpc) = &probe.grpc {
        format!("gRPC :{}", grpc.port)
    } else {
        "<unknown>".to_string()
    }
}

/// Probe settings with the API server's defaults filled in
pub fn probe_info(probe: &Probe) -> ProbeInfo {
    ProbeInfo {
        handler: probe_handler(probe),
        initial_delay: probe.initial_delay_seconds.unwrap_or(0),
        period: probe.period_seconds.unwrap_or(10),
        timeout: probe.timeout_seconds.unwrap_or(1),
        success_threshold: probe.success_threshold.unwrap_or(1),
        failure_threshold: probe.failure_threshold.unwrap_or(3),
    }
}

fn resources_of(container: &Container) -> ResourceRequirements {
    let Some(resources) = &container.resources else {
        return ResourceRequirements::default();
    };
    let pick = |map: Option<&BTreeMap<String, Quantity>>, key: &str| {
        map.and_then(|m| m.get(key))
            .map(|q| q.0.clone())
            .unwrap_or_default()
    };
    ResourceRequirements {
        cpu_request: pick(resources.requests.as_ref(), "cpu"),
        cpu_limit: pick(resources.limits.as_ref(), "cpu"),
        memory_request: pick(resources.requests.as_ref(), "memory"),
        memory_limit: pick(resources.limits.as_ref(), "memory"),
    }
}

/// Merge a container's spec with its runtime status
pub fn container_info(container: &Container, status: Option<&ContainerStatus>) -> ContainerInfo {
    let mut info = ContainerInfo::new(container.name.clone());
    info.image = container.image.clone().unwrap_or_default();
    info.image_pull_policy = container.image_pull_policy.clone().unwrap_or_default();
    info.resources = resources_of(container);
    info.ports = container
        .ports
        .iter()
        .flatten()
        .map(|p| PortInfo {
            name: p.name.clone().unwrap_or_default(),
            container_port: p.container_port,
            protocol: p.protocol.clone().unwrap_or_else(|| "TCP".to_string()),
        })
        .collect();
    info.probes = ProbeSet {
        liveness: container.liveness_probe.as_ref().map(probe_info),
        readiness: container.readiness_probe.as_ref().map(probe_info),
        startup: container.startup_probe.as_ref().map(probe_info),
    };
    info.security_context = container.security_context.as_ref().map(|sc| SecurityInfo {
        run_as_user: sc.run_as_user,
        run_as_non_root: sc.run_as_non_root,
        privileged: sc.privileged,
        read_only_root_filesystem: sc.read_only_root_filesystem,
        allow_privilege_escalation: sc.allow_privilege_escalation,
    });
    info.env_count = container.env.as_ref().map(Vec::len).unwrap_or(0);
    info.volume_mounts = container
        .volume_mounts
        .iter()
        .flatten()
        .map(|m| MountInfo {
            name: m.name.clone(),
            mount_path: m.mount_path.clone(),
            read_only: m.read_only.unwrap_or(false),
        })
        .collect();

    let Some(status) = status else {
        return info;
    };
    info.ready = status.ready;
    info.started = status.started.unwrap_or(false);
    info.restart_count = status.restart_count;
    if !status.image.is_empty() {
        info.image = status.image.clone();
    }
    if let Some(state) = &status.state {
        if state.running.is_some() {
            info.state = ContainerState::Running;
        } else if let Some(terminated) = &state.terminated {
            info.state = ContainerState::Terminated;
            info.reason = terminated.reason.clone().unwrap_or_default();
            info.message = terminated.message.clone().unwrap_or_default();
            info.exit_code = Some(terminated.exit_code);
        } else if let Some(waiting) = &state.waiting {
            info.state = ContainerState::Waiting;
            info.reason = waiting.reason.clone().unwrap_or_default();
            info.message = waiting.message.clone().unwrap_or_default();
        }
    }
    info.last_termination_reason = status
        .last_state
        .as_ref()
        .and_then(|s| s.terminated.as_ref())
        .and_then(|t| t.reason.clone())
        .unwrap_or_default();
    info
}

fn containers_with_status(
    containers: &[Container],
    statuses: Option<&Vec<ContainerStatus>>,
) -> Vec<ContainerInfo> {
    containers
        .iter()
        .map(|c| {
            let status = statuses.and_then(|all| all.iter().find(|s| s.name == c.name));
            container_info(c, status)
        })
        .collect()
}

pub fn volume_info(volume: &Volume) -> VolumeInfo {
    let (kind, source) = if let Some(cm) = &volume.config_map {
        ("ConfigMap", ref_name(cm.name.clone()).unwrap_or_default())
    } else if let Some(secret) = &volume.secret {
        ("Secret", secret.secret_name.clone().unwrap_or_default())
    } else if let Some(pvc) = &volume.persistent_volume_claim {
        ("PersistentVolumeClaim", pvc.claim_name.clone())
    } else if volume.empty_dir.is_some() {
        ("EmptyDir", String::new())
    } else if let Some(host) = &volume.host_path {
        ("HostPath", host.path.clone())
    } else if volume.projected.is_some() {
        ("Projected", String::new())
    } else if volume.downward_api.is_some() {
        ("DownwardAPI", String::new())
    } else {
        ("Other", String::new())
    };
    VolumeInfo {
        name: volume.name.clone(),
        kind: kind.to_string(),
        source,
    }
}

fn toleration_info(t: &Toleration) -> TolerationInfo {
    TolerationInfo {
        key: t.key.clone().unwrap_or_default(),
        operator: t.operator.clone().unwrap_or_else(|| "Equal".to_string()),
        value: t.value.clone().unwrap_or_default(),
        effect: t.effect.clone().unwrap_or_default(),
        toleration_seconds: t.toleration_seconds,
    }
}

/// Detail view of a pod
pub fn pod_to_info(pod: &Pod, now: DateTime<Utc>) -> PodInfo {
    let meta = &pod.metadata;
    let mut info = PodInfo::new(
        meta.name.clone().unwrap_or_default(),
        meta.namespace.clone().unwrap_or_default(),
    );
    info.labels = meta.labels.clone().unwrap_or_default();
    info.annotations = meta.annotations.clone().unwrap_or_default();
    info.created = meta.creation_timestamp.as_ref().map(|t| t.0);
    info.age = age_since(info.created, now);
    info.owner = owner_of(meta);
    info.status = pod_status(pod);
    info.ready = pod_ready(pod);
    info.restarts = pod_restarts(pod);

    let status = pod.status.as_ref();
    if let Some(spec) = &pod.spec {
        info.node_name = spec.node_name.clone().unwrap_or_default();
        info.service_account = spec.service_account_name.clone().unwrap_or_default();
        info.node_selector = spec.node_selector.clone().unwrap_or_default();
        info.termination_grace_period = spec.termination_grace_period_seconds;
        info.containers = containers_with_status(
            &spec.containers,
            status.and_then(|s| s.container_statuses.as_ref()),
        );
        info.init_containers = containers_with_status(
            spec.init_containers.as_deref().unwrap_or(&[]),
            status.and_then(|s| s.init_container_statuses.as_ref()),
        );
        info.volumes = spec.volumes.iter().flatten().map(volume_info).collect();
        info.tolerations = spec
            .tolerations
            .iter()
            .flatten()
            .map(toleration_info)
            .collect();
    }

    if let Some(status) = status {
        info.phase = status.phase.clone().unwrap_or_default();
        info.pod_ip = status.pod_ip.clone().unwrap_or_default();
        info.host_ip = status.host_ip.clone().unwrap_or_default();
        info.qos_class = status.qos_class.clone().unwrap_or_default();
        info.start_time = status.start_time.as_ref().map(|t| t.0);
        info.conditions = status
            .conditions
            .iter()
            .flatten()
            .map(|c| ConditionInfo {
                condition_type: c.type_.clone(),
                status: c.status.clone(),
                reason: c.reason.clone().unwrap_or_default(),
                message: c.message.clone().unwrap_or_default(),
                last_transition: c.last_transition_time.as_ref().map(|t| t.0),
            })
            .collect();
    }
    info
}

/// Pods sorted by name, then namespace
pub(crate) fn pod_rows(pods: &[Pod], now: DateTime<Utc>) -> Vec<PodInfo> {
    let mut rows: Vec<PodInfo> = pods.iter().map(|p| pod_to_info(p, now)).collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.namespace.cmp(&b.namespace)));
    rows
}

#[async_trait]
impl PodRepository for KubeRepository {
    async fn get_pod(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<PodInfo> {
        let api: Api<Pod> = self.namespaced(namespace);
        let pod = get_named(cancel, &api, "Pod", name).await?;
        Ok(pod_to_info(&pod, Utc::now()))
    }

    async fn list_all_pods(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<PodInfo>> {
        let api: Api<Pod> = self.namespaced(namespace);
        let pods = list_all(cancel, &api, &ListParams::default()).await?;
        Ok(pod_rows(&pods, Utc::now()))
    }

    async fn list_pods_by_node(
        &self,
        cancel: &CancellationToken,
        node: &str,
    ) -> Result<Vec<PodInfo>> {
        let api: Api<Pod> = self.all_namespaces();
        let lp = ListParams::default().fields(&format!("spec.nodeName={node}"));
        let pods = list_all(cancel, &api, &lp).await?;
        Ok(pod_rows(&pods, Utc::now()))
    }

    async fn delete_pod(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        let api: Api<Pod> = self.namespaced(namespace);
        guard(cancel, async {
            api.delete(name, &DeleteParams::default())
                .await
                .map_err(|e| Error::from_kube(e, "Pod", name))
        })
        .await?;
        tracing::info!(namespace = %namespace, pod = %name, "deleted pod");
        Ok(())
    }

    async fn get_pod_logs(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> Result<Vec<LogLine>> {
        self.fetch_logs(cancel, namespace, pod, options).await
    }

    async fn get_all_container_logs(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        tail_lines: i64,
    ) -> Result<Vec<LogLine>> {
        let api: Api<Pod> = self.namespaced(namespace);
        let found = get_named(cancel, &api, "Pod", pod).await?;
        let containers: Vec<String> = found
            .spec
            .as_ref()
            .map(|s| s.containers.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default();
        self.fetch_merged_logs(cancel, namespace, pod, &containers, tail_lines)
            .await
    }

    async fn get_previous_logs(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
        container: &str,
        tail_lines: i64,
    ) -> Result<Vec<LogLine>> {
        let options = LogOptions::for_container(container, tail_lines).previous();
        self.fetch_logs(cancel, namespace, pod, &options).await
    }

    async fn get_pod_events(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
    ) -> Result<Vec<EventInfo>> {
        self.object_events(cancel, namespace, "Pod", pod).await
    }

    async fn get_related_resources(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        pod: &str,
    ) -> Result<RelatedResources> {
        let api: Api<Pod> = self.namespaced(namespace);
        let found = get_named(cancel, &api, "Pod", pod).await?;
        self.related_for_pod(cancel, &found).await
    }
}
