//! Workload listing and status rows

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::api::{Api, DynamicObject, ListParams};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

use kubedeck_types::{EventInfo, PodInfo, ResourceType, WorkloadInfo};

use crate::client::{KubeRepository, get_named, list_all};
use crate::dynamic;
use crate::error::{Error, Result};
use crate::events::{event_to_info, sort_events};
use crate::format::age_since;
use crate::pods::pod_to_info;
use crate::repository::WorkloadRepository;
use crate::status::{
    cronjob_status, job_status, pod_ready, pod_restarts, pod_status, replica_status,
    selector_string,
};

fn base_info(meta: &ObjectMeta, resource_type: ResourceType, now: DateTime<Utc>) -> WorkloadInfo {
    let mut info = WorkloadInfo::new(
        meta.name.clone().unwrap_or_default(),
        meta.namespace.clone().unwrap_or_default(),
        resource_type,
    );
    info.labels = meta.labels.clone().unwrap_or_default();
    info.created = meta.creation_timestamp.as_ref().map(|t| t.0);
    info.age = age_since(info.created, now);
    info
}

fn match_labels(selector: Option<&LabelSelector>) -> BTreeMap<String, String> {
    selector
        .and_then(|s| s.match_labels.clone())
        .unwrap_or_default()
}

fn with_replicas(mut info: WorkloadInfo, ready: i32, desired: i32) -> WorkloadInfo {
    info.ready = format!("{ready}/{desired}");
    info.status = replica_status(ready, desired).to_string();
    info
}

pub fn deployment_to_workload(deploy: &Deployment, now: DateTime<Utc>) -> WorkloadInfo {
    let mut info = base_info(&deploy.metadata, ResourceType::Deployments, now);
    let status = deploy.status.as_ref();
    let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
    let desired = status.and_then(|s| s.replicas).unwrap_or(0);
    if let Some(spec) = &deploy.spec {
        info.replicas = spec.replicas.unwrap_or(desired);
        info.selector = match_labels(Some(&spec.selector));
    }
    with_replicas(info, ready, desired)
}

pub fn statefulset_to_workload(sts: &StatefulSet, now: DateTime<Utc>) -> WorkloadInfo {
    let mut info = base_info(&sts.metadata, ResourceType::StatefulSets, now);
    let status = sts.status.as_ref();
    let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
    let desired = status.map(|s| s.replicas).unwrap_or(0);
    if let Some(spec) = &sts.spec {
        info.replicas = spec.replicas.unwrap_or(desired);
        info.selector = match_labels(Some(&spec.selector));
    }
    with_replicas(info, ready, desired)
}

pub fn daemonset_to_workload(ds: &DaemonSet, now: DateTime<Utc>) -> WorkloadInfo {
    let mut info = base_info(&ds.metadata, ResourceType::DaemonSets, now);
    let status = ds.status.as_ref();
    let ready = status.map(|s| s.number_ready).unwrap_or(0);
    let desired = status.map(|s| s.desired_number_scheduled).unwrap_or(0);
    info.replicas = desired;
    if let Some(spec) = &ds.spec {
        info.selector = match_labels(Some(&spec.selector));
    }
    with_replicas(info, ready, desired)
}

pub fn job_to_workload(job: &Job, now: DateTime<Utc>) -> WorkloadInfo {
    let mut info = base_info(&job.metadata, ResourceType::Jobs, now);
    let completions = job.spec.as_ref().and_then(|s| s.completions).unwrap_or(1);
    let succeeded = job.status.as_ref().and_then(|s| s.succeeded).unwrap_or(0);
    info.replicas = completions;
    info.ready = format!("{succeeded}/{completions}");
    info.status = job_status(job).to_string();
    info.selector = job
        .spec
        .as_ref()
        .map(|s| match_labels(s.selector.as_ref()))
        .unwrap_or_default();
    info
}

pub fn cronjob_to_workload(cronjob: &CronJob, now: DateTime<Utc>) -> WorkloadInfo {
    let mut info = base_info(&cronjob.metadata, ResourceType::CronJobs, now);
    let active = cronjob
        .status
        .as_ref()
        .and_then(|s| s.active.as_ref())
        .map(|a| a.len() as i32)
        .unwrap_or(0);
    // Every active job counts as running; a cron job has no desired count
    info.replicas = active;
    info.ready = format!("{active}/{active}");
    info.status = cronjob_status(cronjob).to_string();
    info
}

pub fn pod_to_workload(pod: &Pod, now: DateTime<Utc>) -> WorkloadInfo {
    let mut info = base_info(&pod.metadata, ResourceType::Pods, now);
    info.replicas = 1;
    info.ready = pod_ready(pod);
    info.status = pod_status(pod);
    info.restart_count = pod_restarts(pod);
    info.selector = info.labels.clone();
    info
}

/// Rollout row from an untyped object.
///
/// `spec.replicas` defaults to 1; readiness prefers `status.readyReplicas`
/// and falls back to `status.availableReplicas`.
pub fn rollout_to_workload(rollout: &DynamicObject, now: DateTime<Utc>) -> WorkloadInfo {
    let mut info = base_info(&rollout.metadata, ResourceType::Rollouts, now);
    let data = &rollout.data;
    let desired = dynamic::i32_at(data, &["spec", "replicas"]).unwrap_or(1);
    let ready = dynamic::i32_at(data, &["status", "readyReplicas"])
        .or_else(|| dynamic::i32_at(data, &["status", "availableReplicas"]))
        .unwrap_or(0);
    info.replicas = desired;
    info.ready = format!("{ready}/{desired}");
    info.status = dynamic::str_at(data, &["status", "phase"])
        .filter(|p| !p.is_empty())
        .unwrap_or("Unknown")
        .to_string();
    info.selector = dynamic::string_map_at(data, &["spec", "selector", "matchLabels"]);
    info
}

fn sorted(mut rows: Vec<WorkloadInfo>) -> Vec<WorkloadInfo> {
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

impl KubeRepository {
    async fn list_typed<K, F>(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        convert: F,
    ) -> Result<Vec<WorkloadInfo>>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + serde::de::DeserializeOwned
            + std::fmt::Debug,
        <K as kube::Resource>::DynamicType: Default,
        F: Fn(&K, DateTime<Utc>) -> WorkloadInfo,
    {
        let api: Api<K> = self.namespaced(namespace);
        let items = list_all(cancel, &api, &ListParams::default()).await?;
        let now = Utc::now();
        Ok(sorted(items.iter().map(|item| convert(item, now)).collect()))
    }

    /// Pods of the jobs a cron job currently owns
    async fn cronjob_pods(
        &self,
        cancel: &CancellationToken,
        workload: &WorkloadInfo,
    ) -> Result<Vec<PodInfo>> {
        let jobs: Api<Job> = self.namespaced(&workload.namespace);
        let owned: Vec<Job> = list_all(cancel, &jobs, &ListParams::default())
            .await?
            .into_iter()
            .filter(|j| {
                j.metadata
                    .owner_references
                    .as_ref()
                    .is_some_and(|refs| {
                        refs.iter()
                            .any(|r| r.kind == "CronJob" && r.name == workload.name)
                    })
            })
            .collect();

        let pods: Api<Pod> = self.namespaced(&workload.namespace);
        let now = Utc::now();
        let mut out = Vec::new();
        for job in owned {
            let job_name = job.metadata.name.clone().unwrap_or_default();
            let lp = ListParams::default().labels(&format!("job-name={job_name}"));
            let items = list_all(cancel, &pods, &lp).await?;
            out.extend(items.iter().map(|p| pod_to_info(p, now)));
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

#[async_trait]
impl WorkloadRepository for KubeRepository {
    async fn list_workloads(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        resource_type: ResourceType,
    ) -> Result<Vec<WorkloadInfo>> {
        tracing::debug!(namespace = %namespace, kind = %resource_type, "listing workloads");
        match resource_type {
            ResourceType::Pods => {
                self.list_typed::<Pod, _>(cancel, namespace, pod_to_workload)
                    .await
            }
            ResourceType::Deployments => {
                self.list_typed::<Deployment, _>(cancel, namespace, deployment_to_workload)
                    .await
            }
            ResourceType::StatefulSets => {
                self.list_typed::<StatefulSet, _>(cancel, namespace, statefulset_to_workload)
                    .await
            }
            ResourceType::DaemonSets => {
                self.list_typed::<DaemonSet, _>(cancel, namespace, daemonset_to_workload)
                    .await
            }
            ResourceType::Jobs => {
                self.list_typed::<Job, _>(cancel, namespace, job_to_workload)
                    .await
            }
            ResourceType::CronJobs => {
                self.list_typed::<CronJob, _>(cancel, namespace, cronjob_to_workload)
                    .await
            }
            ResourceType::Rollouts => self.list_rollouts(cancel, namespace).await,
        }
    }

    async fn list_rollouts(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
    ) -> Result<Vec<WorkloadInfo>> {
        let Some(ar) = self.capabilities().rollouts.as_ref() else {
            return Ok(Vec::new());
        };
        let api: Api<DynamicObject> = Api::namespaced_with(self.client(), namespace, ar);
        let items = list_all(cancel, &api, &ListParams::default()).await?;
        let now = Utc::now();
        Ok(sorted(
            items.iter().map(|r| rollout_to_workload(r, now)).collect(),
        ))
    }

    async fn get_deployment(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadInfo> {
        let api: Api<Deployment> = self.namespaced(namespace);
        let deploy = get_named(cancel, &api, "Deployment", name).await?;
        Ok(deployment_to_workload(&deploy, Utc::now()))
    }

    async fn get_stateful_set(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadInfo> {
        let api: Api<StatefulSet> = self.namespaced(namespace);
        let sts = get_named(cancel, &api, "StatefulSet", name).await?;
        Ok(statefulset_to_workload(&sts, Utc::now()))
    }

    async fn get_daemon_set(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadInfo> {
        let api: Api<DaemonSet> = self.namespaced(namespace);
        let ds = get_named(cancel, &api, "DaemonSet", name).await?;
        Ok(daemonset_to_workload(&ds, Utc::now()))
    }

    async fn get_job(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadInfo> {
        let api: Api<Job> = self.namespaced(namespace);
        let job = get_named(cancel, &api, "Job", name).await?;
        Ok(job_to_workload(&job, Utc::now()))
    }

    async fn get_workload_pods(
        &self,
        cancel: &CancellationToken,
        workload: &WorkloadInfo,
    ) -> Result<Vec<PodInfo>> {
        let pods: Api<Pod> = self.namespaced(&workload.namespace);
        let now = Utc::now();
        match workload.resource_type {
            ResourceType::Pods => {
                let pod = get_named(cancel, &pods, "Pod", &workload.name).await?;
                Ok(vec![pod_to_info(&pod, now)])
            }
            ResourceType::CronJobs => self.cronjob_pods(cancel, workload).await,
            _ if workload.selector.is_empty() => Err(Error::Unsupported(format!(
                "{} has no label selector",
                workload.object_ref()
            ))),
            _ => {
                let lp = ListParams::default().labels(&selector_string(&workload.selector));
                let items = list_all(cancel, &pods, &lp).await?;
                let mut out: Vec<PodInfo> = items.iter().map(|p| pod_to_info(p, now)).collect();
                out.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(out)
            }
        }
    }

    async fn get_workload_events(
        &self,
        cancel: &CancellationToken,
        workload: &WorkloadInfo,
    ) -> Result<Vec<EventInfo>> {
        let pod_names: Vec<String> = match self.get_workload_pods(cancel, workload).await {
            Ok(pods) => pods.into_iter().map(|p| p.name).collect(),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                tracing::debug!(
                    workload = %workload.object_ref(),
                    error = %e,
                    "no pods for workload events",
                );
                Vec::new()
            }
        };

        let api: Api<k8s_openapi::api::core::v1::Event> = self.namespaced(&workload.namespace);
        let items = list_all(cancel, &api, &ListParams::default()).await?;
        let now = Utc::now();
        let mut events: Vec<EventInfo> = items
            .iter()
            .filter(|e| {
                let name = e.involved_object.name.as_deref().unwrap_or_default();
                let kind = e.involved_object.kind.as_deref().unwrap_or_default();
                (kind == workload.resource_type.kind() && name == workload.name)
                    || (kind == "Pod" && pod_names.iter().any(|p| p == name))
            })
            .map(|e| event_to_info(e, now))
            .collect();
        sort_events(&mut events);
        Ok(events)
    }
}
